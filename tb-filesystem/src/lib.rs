//! Filesystem primitives for `tb`.
//!
//! Everything that needs to know about the host platform, e.g. switching the effective
//! user, looking up passwd entries, or telling a cross-device rename apart from other
//! failures, goes through [`platform::Platform`]. The rest of the crate is built on top.

use std::io;
use std::path::{Path, PathBuf};

pub mod identity;
pub mod platform;
pub mod staging;
pub mod transfer;
pub mod usage;
pub mod users;

#[cfg(all(test, unix))]
mod tests;

pub use identity::{ActingAs, Identity};
pub use transfer::{move_path, remove_tree, MoveKind};
pub use usage::{disk_usage, DiskUsage};
pub use users::PasswdEntry;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot {op} '{}': {}", path.display(), reason(source))]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("'{}' already exists", path.display())]
    Exists { path: PathBuf },
    #[error(
        "'{}' is owned by uid {owner}, which uid {current} cannot act as",
        path.display()
    )]
    RequiresIdentity {
        path: PathBuf,
        owner: u32,
        current: u32,
    },
    #[error("cannot switch effective identity to uid {uid}: {}", reason(source))]
    SwitchIdentity {
        uid: u32,
        #[source]
        source: io::Error,
    },
    #[error("cannot look up user {who}: {}", reason(source))]
    UserLookup {
        who: String,
        #[source]
        source: io::Error,
    },
    #[error("'{}' is not a regular file, directory, or symlink", path.display())]
    Unsupported { path: PathBuf },
}

impl Error {
    /// Returns a closure that wraps an [`io::Error`] for the operation `op` on `path`.
    ///
    /// Meant for `map_err`, e.g. `fs::read_dir(path).map_err(Error::io("read", path))?`.
    pub fn io<'a>(op: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> Error + 'a {
        move |source| Error::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Human readable reason of an [`io::Error`], without the trailing `(os error N)`.
pub fn reason(err: &io::Error) -> String {
    let rendered = err.to_string();
    match rendered.find(" (os error") {
        Some(idx) => rendered[..idx].to_string(),
        None => rendered,
    }
}
