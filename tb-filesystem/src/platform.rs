//! Abstract interface for a specific platform, e.g. `unix`.

use std::fs::Metadata;
use std::io;
use std::path::Path;

use crate::identity::Identity;
use crate::users::PasswdEntry;

mod todo;

/// Platform specific operations.
///
/// Everything here is a thin wrapper around a syscall or a platform specific extension
/// trait; policy lives in the rest of the crate.
pub trait Platform {
    /// The effective user and group of this process.
    fn effective_identity() -> Identity;
    /// Switch the effective user and group of this process.
    ///
    /// Only a process whose real user is privileged can switch back afterwards.
    fn set_effective_identity(identity: Identity) -> Result<(), io::Error>;

    fn user_by_uid(uid: u32) -> Result<Option<PasswdEntry>, io::Error>;

    /// Owner of the file described by `metadata`.
    fn owner(metadata: &Metadata) -> Identity;
    /// Storage actually allocated for the file, in bytes.
    fn allocated_bytes(metadata: &Metadata) -> u64;
    /// `(device, inode, link count)` of the file.
    fn file_id(metadata: &Metadata) -> (u64, u64, u64);

    fn symlink(target: &Path, link: &Path) -> Result<(), io::Error>;
    /// Apply the permission bits in `mode` to `path`.
    fn set_mode(path: &Path, mode: u32) -> Result<(), io::Error>;

    /// Returns true if `err` came from renaming across filesystems.
    fn is_cross_device(err: &io::Error) -> bool;
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub use unix::UnixPlatform as FilesystemPlatform;
    } else {
        pub use todo::TodoPlatform as FilesystemPlatform;
    }
}
