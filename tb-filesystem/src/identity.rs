//! Acting on behalf of another user.
//!
//! Some locations, e.g. a legacy trash directory inside a private home directory, can only
//! be touched by the user who owns them. Rather than shelling out to `su` or `sudo` we
//! model this as a capability: [`Identity::assume`] hands back an [`ActingAs`] guard while
//! the process is acting as that user, and a typed [`Error::RequiresIdentity`] when it
//! can't.
//!
//! The effective identity is process wide, so this is only sound for single threaded
//! callers, which every `tb` binary is.
//!
//! [`Error::RequiresIdentity`]: crate::Error::RequiresIdentity

use std::path::Path;

use crate::platform::{FilesystemPlatform, Platform};

/// A user and primary group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity {
    pub uid: u32,
    pub gid: u32,
}

impl Identity {
    /// The effective identity of this process.
    pub fn current() -> Identity {
        FilesystemPlatform::effective_identity()
    }

    /// The identity that owns `path`, following symlinks.
    pub fn owner_of(path: &Path) -> Result<Identity, crate::Error> {
        let metadata = std::fs::metadata(path).map_err(crate::Error::io("stat", path))?;
        Ok(FilesystemPlatform::owner(&metadata))
    }

    /// Start acting as this identity in order to operate on `path`.
    ///
    /// If we're already running as this user nothing changes. Otherwise we need to be
    /// privileged so we can switch back when the returned guard is dropped.
    pub fn assume(self, path: &Path) -> Result<ActingAs, crate::Error> {
        let current = Identity::current();
        if current.uid == self.uid {
            return Ok(ActingAs { restore: None });
        }
        if current.uid != 0 {
            return Err(crate::Error::RequiresIdentity {
                path: path.to_path_buf(),
                owner: self.uid,
                current: current.uid,
            });
        }

        FilesystemPlatform::set_effective_identity(self).map_err(|source| {
            crate::Error::SwitchIdentity {
                uid: self.uid,
                source,
            }
        })?;
        tracing::debug!(uid = self.uid, path = %path.display(), "assumed identity");

        Ok(ActingAs {
            restore: Some(current),
        })
    }
}

/// Guard returned by [`Identity::assume`], switches back to the original identity on drop.
#[derive(Debug)]
#[must_use = "dropping the guard immediately switches back"]
pub struct ActingAs {
    restore: Option<Identity>,
}

impl ActingAs {
    /// Returns true if assuming the identity required switching users.
    pub fn switched(&self) -> bool {
        self.restore.is_some()
    }
}

impl Drop for ActingAs {
    fn drop(&mut self) {
        let Some(original) = self.restore.take() else {
            return;
        };
        if let Err(err) = FilesystemPlatform::set_effective_identity(original) {
            // Never keep running as the wrong user.
            tracing::error!(?err, uid = original.uid, "failed to restore effective identity");
            std::process::abort();
        }
    }
}
