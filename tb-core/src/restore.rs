//! Looking inside a trash root and putting things back.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tb_filesystem::{disk_usage, move_path};
use tb_types::TimestampKey;

use crate::interceptor::prune_empty_dirs;
use crate::PathMapper;

/// A single entry of a trash root, see [`list_entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub key: TimestampKey,
    /// Location of the entry, `<trash root>/<key>`.
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
    /// Allocated size in bytes.
    pub size: u64,
    /// Best guess at where the trashed item came from.
    pub original: Option<PathBuf>,
}

/// Every entry in `trash_root`, oldest first.
pub fn list_entries(trash_root: &Path, mapper: &PathMapper) -> Result<Vec<ListedEntry>, crate::Error> {
    let children = fs::read_dir(trash_root).map_err(tb_filesystem::Error::io("list", trash_root))?;

    let mut entries = Vec::new();
    for child in children {
        let child = child.map_err(tb_filesystem::Error::io("list", trash_root))?;
        let Some(key) = child.file_name().to_str().and_then(TimestampKey::from_name) else {
            continue;
        };
        let Ok(metadata) = child.metadata() else {
            continue;
        };
        if !metadata.is_dir() {
            continue;
        }

        let path = child.path();
        let size = disk_usage(&path).map(|usage| usage.bytes).unwrap_or_default();
        let original = trashed_path(&path).map(|relative| mapper.to_original(&relative));
        entries.push(ListedEntry {
            key,
            path,
            modified: metadata.modified().ok(),
            size,
            original,
        });
    }

    entries.sort_by_key(|entry| entry.key);
    Ok(entries)
}

/// Follow sole children down from `entry` until something other than a directory with
/// exactly one child is reached, returning the path relative to `entry`.
fn trashed_path(entry: &Path) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    let mut current = entry.to_path_buf();
    loop {
        let Ok(mut children) = fs::read_dir(&current) else {
            break;
        };
        let (Some(Ok(only)), None) = (children.next(), children.next()) else {
            break;
        };
        relative.push(only.file_name());
        current = only.path();
        if !only.file_type().map(|kind| kind.is_dir()).unwrap_or(false) {
            break;
        }
    }
    (!relative.as_os_str().is_empty()).then_some(relative)
}

/// Move `original`, as it was stored in entry `key`, back to where it came from.
///
/// Never overwrites anything at `original`. Directories of the entry that end up empty are
/// removed, the entry itself included.
pub fn restore(
    trash_root: &Path,
    mapper: &PathMapper,
    key: TimestampKey,
    original: &Path,
) -> Result<PathBuf, crate::Error> {
    let entry = trash_root.join(key.to_string());
    if !fs::metadata(&entry).map(|m| m.is_dir()).unwrap_or(false) {
        return Err(crate::Error::EntryNotFound { key });
    }

    let Some(name) = original.file_name() else {
        return Err(crate::Error::NotInEntry {
            key,
            path: original.to_path_buf(),
        });
    };
    let parent = match original.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let parent = fs::canonicalize(parent).map_err(tb_filesystem::Error::io("resolve", parent))?;
    let destination = parent.join(name);

    let source = entry.join(mapper.to_relative(&destination));
    match fs::symlink_metadata(&source) {
        Ok(_) => (),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(crate::Error::NotInEntry {
                key,
                path: original.to_path_buf(),
            });
        }
        Err(err) => return Err(tb_filesystem::Error::io("stat", &source)(err).into()),
    }

    move_path(&source, &destination)?;
    tracing::debug!(
        source = %source.display(),
        destination = %destination.display(),
        "restored"
    );
    if let Some(parent) = source.parent() {
        prune_empty_dirs(parent, &entry);
    }

    Ok(destination)
}
