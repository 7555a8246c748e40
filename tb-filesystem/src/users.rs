//! Passwd database lookups.

use std::path::PathBuf;

use crate::identity::Identity;
use crate::platform::{FilesystemPlatform, Platform};

/// The parts of a passwd entry we care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswdEntry {
    /// Login name.
    pub name: String,
    /// Home directory.
    pub home: PathBuf,
    /// Primary user and group.
    pub identity: Identity,
}

/// Look up the passwd entry for the effective user of this process.
pub fn current_user() -> Result<Option<PasswdEntry>, crate::Error> {
    let identity = FilesystemPlatform::effective_identity();
    FilesystemPlatform::user_by_uid(identity.uid).map_err(|source| crate::Error::UserLookup {
        who: format!("uid {}", identity.uid),
        source,
    })
}
