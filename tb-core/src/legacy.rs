//! Draining trash directories that predate `tb`.
//!
//! A legacy trash lives at `~/.trash.old`, inside the user's private home directory, so
//! everything here runs as the user who owns it. Its children are a mix of dated entries
//! and loose files, all of which are held to the same threshold. Once it's empty and has
//! been around for longer than the grace period the directory itself is removed.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::SystemTime;

use tb_filesystem::Identity;

use crate::sweeper::{sweep_children, AreaSweep, Eligible, SweepPolicy};
use crate::{HostLayout, User};

/// What happened to the legacy trash directory itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// Still has contents, or hasn't outlived the grace period.
    Kept,
    /// Would be removed if the sweep were executed.
    Removable,
    Removed,
}

impl Container {
    pub fn is_removed(&self) -> bool {
        matches!(self, Container::Removed)
    }
}

/// The result of sweeping a single legacy trash.
#[derive(Debug)]
pub struct LegacySweep {
    pub path: PathBuf,
    pub area: AreaSweep,
    pub container: Container,
}

/// Sweep `user`'s legacy trash, if they have one.
pub fn sweep_legacy(
    layout: &HostLayout,
    user: &User,
    policy: &SweepPolicy,
    now: SystemTime,
) -> Option<LegacySweep> {
    let path = layout.legacy_path(user);
    let mut sweep = LegacySweep {
        path: path.clone(),
        area: AreaSweep::default(),
        container: Container::Kept,
    };

    let metadata = match fs::symlink_metadata(&path) {
        Ok(metadata) if metadata.is_dir() => metadata,
        Ok(_) => return None,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
        Err(err) => {
            sweep.area.record(&path, tb_filesystem::Error::io("stat", &path)(err));
            return Some(sweep);
        }
    };
    // Removing children bumps the directory's mtime, so capture its age up front.
    let container_mtime = metadata.modified().ok();

    let owner = match Identity::owner_of(&path) {
        Ok(owner) => owner,
        Err(err) => {
            sweep.area.record(&path, err);
            return Some(sweep);
        }
    };
    let _guard = match owner.assume(&path) {
        Ok(guard) => {
            if guard.switched() {
                tracing::debug!(uid = owner.uid, path = %path.display(), "acting as owner");
            }
            Some(guard)
        }
        Err(err @ tb_filesystem::Error::RequiresIdentity { .. }) if !policy.execute => {
            // Reporting doesn't mutate anything, do what we can as ourselves.
            tracing::debug!(%err, "sweeping legacy trash without switching users");
            None
        }
        Err(err) => {
            sweep.area.record(&path, err);
            return Some(sweep);
        }
    };

    let remaining = sweep_children(&path, Eligible::Everything, policy, now, &mut sweep.area);

    let outlived_grace = container_mtime
        .map(|mtime| layout.legacy_grace.is_exceeded(mtime, now))
        .unwrap_or(false);
    if remaining == 0 && outlived_grace && sweep.area.errors.is_empty() {
        if !policy.execute {
            sweep.container = Container::Removable;
        } else {
            match fs::remove_dir(&path) {
                Ok(()) => {
                    tracing::info!(path = %path.display(), "removed empty legacy trash");
                    sweep.container = Container::Removed;
                }
                Err(err) => sweep
                    .area
                    .record(&path, tb_filesystem::Error::io("remove", &path)(err)),
            }
        }
    }

    Some(sweep)
}
