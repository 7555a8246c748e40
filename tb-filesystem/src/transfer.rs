//! Moving files and directory trees.

use std::fs;
use std::path::Path;

use crate::platform::{FilesystemPlatform, Platform};
use crate::staging::StagedCopy;

/// How a [`move_path`] was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    /// A single atomic `rename(2)` on the same filesystem.
    Renamed,
    /// Copied across filesystems, then the original was removed.
    ///
    /// This is not atomic: a crash after the copy lands but before the original is
    /// removed leaves the data in both places.
    Copied,
}

/// Move `src`, which may be a file, symlink, or directory tree, to `dst`.
///
/// `dst` must not exist and its parent must. Same filesystem moves are a single rename.
/// Otherwise the tree is copied to a staging name next to `dst`, renamed into place once
/// complete, and only then is `src` removed. The original is left intact if anything
/// fails before that point.
pub fn move_path(src: &Path, dst: &Path) -> Result<MoveKind, crate::Error> {
    if fs::symlink_metadata(dst).is_ok() {
        return Err(crate::Error::Exists {
            path: dst.to_path_buf(),
        });
    }

    match fs::rename(src, dst) {
        Ok(()) => return Ok(MoveKind::Renamed),
        Err(err) if FilesystemPlatform::is_cross_device(&err) => {
            tracing::debug!(src = %src.display(), dst = %dst.display(), "cross device move");
        }
        Err(err) => return Err(crate::Error::io("move", src)(err)),
    }

    let staged = StagedCopy::create(src, dst)?;
    staged.persist(dst)?;

    let metadata = fs::symlink_metadata(src).map_err(crate::Error::io("stat", src))?;
    let removed = if metadata.is_dir() {
        fs::remove_dir_all(src)
    } else {
        fs::remove_file(src)
    };
    removed.map_err(crate::Error::io("remove original of", src))?;

    Ok(MoveKind::Copied)
}

/// Remove `path` recursively, treating an already missing path as success.
///
/// Returns true if something was removed by this call.
pub fn remove_tree(path: &Path) -> Result<bool, crate::Error> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(crate::Error::io("stat", path)(err)),
    };
    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Ok(()) => Ok(true),
        // Somebody else got there first.
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(crate::Error::io("remove", path)(err)),
    }
}
