//! Staging for moves that can't be done with a single `rename(2)`.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::platform::{FilesystemPlatform, Platform};

/// Prefix of the name every staged copy gets while it's being written.
pub static STAGING_PREFIX: &str = ".tb-partial-";

/// A copy of a file or directory tree that is not visible at its final location yet.
///
/// Copying across filesystems isn't atomic, so we copy into a uniquely named sibling of
/// the destination and only once the copy is complete rename it into place. If the copy
/// fails part way through, the partial copy is removed when the [`StagedCopy`] is dropped.
#[derive(Debug)]
pub struct StagedCopy {
    /// Where the copy is being written.
    path: PathBuf,
    /// Set once the copy has been renamed to its final location.
    persisted: bool,
}

impl StagedCopy {
    /// Copy `src` into a new staging location next to `dst`.
    pub fn create(src: &Path, dst: &Path) -> Result<Self, crate::Error> {
        let parent = dst.parent().unwrap_or_else(|| Path::new("/"));
        let name = format!("{STAGING_PREFIX}{}", uuid::Uuid::new_v4());
        let staged = StagedCopy {
            path: parent.join(name),
            persisted: false,
        };
        tracing::debug!(src = %src.display(), staged = %staged.path.display(), "staging copy");

        copy_tree(src, &staged.path)?;
        Ok(staged)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically move the staged copy to `dst`.
    pub fn persist(mut self, dst: &Path) -> Result<(), crate::Error> {
        fs::rename(&self.path, dst).map_err(crate::Error::io("move staged copy to", dst))?;
        self.persisted = true;
        Ok(())
    }
}

impl Drop for StagedCopy {
    fn drop(&mut self) {
        if self.persisted {
            return;
        }
        let result = match fs::symlink_metadata(&self.path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&self.path),
            Ok(_) => fs::remove_file(&self.path),
            Err(_) => Ok(()),
        };
        if let Err(err) = result {
            tracing::warn!(path = %self.path.display(), ?err, "failed to clean up staged copy");
        }
    }
}

/// Recursively copy `src` to `dst`, preserving permissions, symlinks and modification times.
///
/// `dst` must not exist.
fn copy_tree(src: &Path, dst: &Path) -> Result<(), crate::Error> {
    // Directory permissions and times are applied last, a read-only directory would
    // otherwise stop us from filling it and creating children bumps its mtime.
    let mut directories: Vec<(PathBuf, u32, Option<SystemTime>)> = Vec::new();

    for entry in WalkDir::new(src).follow_links(false).follow_root_links(false) {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(src).to_path_buf();
            crate::Error::Io {
                op: "read",
                path,
                source: err.into(),
            }
        })?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .expect("walkdir yields children of the root");
        let target = if relative.as_os_str().is_empty() {
            dst.to_path_buf()
        } else {
            dst.join(relative)
        };
        let metadata = entry
            .path()
            .symlink_metadata()
            .map_err(crate::Error::io("stat", entry.path()))?;
        let file_type = metadata.file_type();

        if file_type.is_dir() {
            fs::create_dir(&target).map_err(crate::Error::io("create directory", &target))?;
            directories.push((target, permission_bits(&metadata), metadata.modified().ok()));
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target).map_err(crate::Error::io("copy", entry.path()))?;
            if let Ok(mtime) = metadata.modified() {
                set_mtime(&target, mtime);
            }
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path()).map_err(crate::Error::io("read link", entry.path()))?;
            FilesystemPlatform::symlink(&link, &target)
                .map_err(crate::Error::io("create symlink", &target))?;
        } else {
            return Err(crate::Error::Unsupported {
                path: entry.path().to_path_buf(),
            });
        }
    }

    for (path, mode, mtime) in directories.into_iter().rev() {
        FilesystemPlatform::set_mode(&path, mode).map_err(crate::Error::io("chmod", &path))?;
        if let Some(mtime) = mtime {
            set_mtime(&path, mtime);
        }
    }

    Ok(())
}

#[cfg(unix)]
fn permission_bits(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o555
    } else {
        0o755
    }
}

/// Best effort, a copy with a fresh modification time is still a faithful copy.
fn set_mtime(path: &Path, mtime: SystemTime) {
    let result = File::open(path).and_then(|file| file.set_modified(mtime));
    if let Err(err) = result {
        tracing::debug!(path = %path.display(), ?err, "failed to preserve modification time");
    }
}
