//! Measuring how much storage a tree occupies.

use std::collections::HashSet;
use std::path::Path;

use walkdir::WalkDir;

use crate::platform::{FilesystemPlatform, Platform};

/// Storage used by a file or directory tree.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiskUsage {
    /// Allocated bytes, i.e. blocks not apparent size, with hard links counted once.
    pub bytes: u64,
    /// Number of entries, the root included.
    pub entries: u64,
    /// Entries we couldn't read, their size is missing from `bytes`.
    pub unreadable: u64,
}

/// Measure the storage used by `path` in the way `du -s` would.
///
/// Symlinks are never followed, `path` itself included, so a link costs only its own inode.
///
/// A missing `path` uses nothing. Anything below `path` that can't be read is counted in
/// [`DiskUsage::unreadable`] rather than failing the whole measurement.
pub fn disk_usage(path: &Path) -> Result<DiskUsage, crate::Error> {
    match path.symlink_metadata() {
        Ok(_) => (),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(DiskUsage::default())
        }
        Err(err) => return Err(crate::Error::io("stat", path)(err)),
    }

    let mut usage = DiskUsage::default();
    let mut seen_links = HashSet::new();

    let walk = WalkDir::new(path).follow_links(false).follow_root_links(false);
    for entry in walk {
        let metadata = match entry.and_then(|entry| entry.metadata()) {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::debug!(?err, "skipping unreadable entry");
                usage.unreadable += 1;
                continue;
            }
        };

        let (device, inode, links) = FilesystemPlatform::file_id(&metadata);
        if !metadata.is_dir() && links > 1 && !seen_links.insert((device, inode)) {
            continue;
        }
        usage.bytes = usage
            .bytes
            .saturating_add(FilesystemPlatform::allocated_bytes(&metadata));
        usage.entries += 1;
    }

    Ok(usage)
}
