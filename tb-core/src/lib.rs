//! Core of `tb`, a recoverable replacement for `rm` on shared multi-user hosts.
//!
//! Two stateless programs cooperate through the filesystem:
//!
//! 1. The [`Interceptor`] runs as the invoking user and moves each removal target into a
//!    fresh, timestamp keyed entry of that user's trash root instead of unlinking it.
//! 2. The [`Sweeper`] runs on a schedule as a privileged user, permanently deletes entries
//!    older than a retention threshold, drains legacy trash directories, and reports how
//!    much space is in use.
//!
//! Neither holds locks. The sweeper only ever touches entries older than its threshold and
//! the interceptor only ever creates brand new entries, so they never race on the same
//! object.
//!
//! [`Interceptor`]: crate::interceptor::Interceptor
//! [`Sweeper`]: crate::sweeper::Sweeper

use std::path::PathBuf;

use tb_types::{TimestampKey, UserName};

pub mod alias;
pub mod cleanup_log;
pub mod defs;
pub mod interceptor;
pub mod layout;
pub mod legacy;
pub mod report;
pub mod restore;
pub mod sweeper;


pub use layout::{HostLayout, PathMapper, User};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No such file or directory")]
    NotFound { path: PathBuf },
    #[error("Is a directory")]
    IsDirectory { path: PathBuf },
    #[error("Directory not empty")]
    DirectoryNotEmpty { path: PathBuf },
    #[error("refusing to remove {what}")]
    Refused { path: PathBuf, what: &'static str },
    #[error("trash entry '{}' already exists", entry.display())]
    KeyCollision { entry: PathBuf },
    #[error(
        "trash directory '{}' is unavailable: {source}\n\
         ask an administrator to run the trash setup for this host",
        path.display()
    )]
    TrashRootUnavailable {
        path: PathBuf,
        #[source]
        source: tb_filesystem::Error,
    },
    #[error("user '{user}' not found: no trash directory at '{}'", path.display())]
    UserNotFound { user: UserName, path: PathBuf },
    #[error(
        "cannot open cleanup log '{}': {source}\n\
         create the log directory or pass a writable one with --log-dir",
        path.display()
    )]
    LogUnavailable {
        path: PathBuf,
        #[source]
        source: tb_filesystem::Error,
    },
    #[error("no trash entry {key}")]
    EntryNotFound { key: TimestampKey },
    #[error("'{}' is not part of trash entry {key}", path.display())]
    NotInEntry { key: TimestampKey, path: PathBuf },
    #[error("invalid config '{name}': {reason}")]
    InvalidConfig { name: &'static str, reason: String },
    #[error(transparent)]
    Filesystem(#[from] tb_filesystem::Error),
}

impl Error {
    /// Short cause of a per item failure, e.g. `Permission denied`, without the path
    /// which the caller reports alongside it.
    pub fn reason(&self) -> String {
        match self {
            Error::Filesystem(tb_filesystem::Error::Io { source, .. }) => {
                tb_filesystem::reason(source)
            }
            other => other.to_string(),
        }
    }
}
