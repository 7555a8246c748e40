//! Making sure a user's trash root, and the alias to it from their home directory, exist.
//!
//! In [`PlacementMode::Centralized`] the trash root lives at `<trash_root>/<user>/trash`
//! and `~/.trash` is a symlink to it. Anything already sitting at `~/.trash` that isn't a
//! symlink predates `tb` and is moved aside to `~/.trash.old`, where the sweeper drains it
//! over time.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tb_filesystem::platform::{FilesystemPlatform, Platform};
use tb_ore::clock::NanoClock;
use tb_types::{PlacementMode, TimestampKey};

use crate::{HostLayout, User};

/// Permissions of `<trash_root>/<user>`, the admin group can look inside.
const CENTRAL_USER_DIR_MODE: u32 = 0o750;
/// Permissions of `<trash_root>/<user>/trash`, the admin group may delete aged entries.
const CENTRAL_TRASH_MODE: u32 = 0o770;
/// Permissions of `~/.trash` in [`PlacementMode::Local`].
const LOCAL_TRASH_MODE: u32 = 0o700;

/// Prefix of the temporary name a new alias is created under before it's renamed into
/// place.
static TEMP_ALIAS_PREFIX: &str = ".trash.tb-new-";

/// What [`ensure_alias`] had to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasOutcome {
    /// A symlink was already in place, it is never rewritten.
    Present,
    /// There was nothing at the alias location, a symlink was created.
    Created,
    /// Something that wasn't a symlink was at the alias location. It was moved to
    /// `legacy` and replaced with a symlink.
    Migrated { legacy: PathBuf },
}

/// Create `user`'s trash root if it doesn't exist yet, returning its location.
///
/// In centralized mode the shared parent must already exist, setting that up is the job
/// of whoever deploys `tb` on the host.
pub fn ensure_trash_root(layout: &HostLayout, user: &User) -> Result<PathBuf, crate::Error> {
    let trash_root = layout.trash_root_for(user);
    let unavailable = |source| crate::Error::TrashRootUnavailable {
        path: trash_root.clone(),
        source,
    };

    match layout.mode {
        PlacementMode::Centralized => {
            let shared = fs::metadata(&layout.trash_root)
                .map_err(tb_filesystem::Error::io("stat", &layout.trash_root))
                .map_err(unavailable)?;
            if !shared.is_dir() {
                let err = io::Error::new(io::ErrorKind::NotADirectory, "not a directory");
                return Err(unavailable(tb_filesystem::Error::io("use", &layout.trash_root)(err)));
            }

            if let Some(user_dir) = layout.central_user_dir(user) {
                ensure_dir(&user_dir, CENTRAL_USER_DIR_MODE).map_err(unavailable)?;
            }
            ensure_dir(&trash_root, CENTRAL_TRASH_MODE).map_err(unavailable)?;
        }
        PlacementMode::Local => {
            ensure_dir(&trash_root, LOCAL_TRASH_MODE).map_err(unavailable)?;
        }
    }

    Ok(trash_root)
}

/// Create `path` with `mode` unless a directory, or a symlink to one, is already there.
fn ensure_dir(path: &Path, mode: u32) -> Result<(), tb_filesystem::Error> {
    match fs::create_dir(path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), mode = format!("{mode:o}"), "created directory");
            FilesystemPlatform::set_mode(path, mode)
                .map_err(tb_filesystem::Error::io("set permissions of", path))
        }
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            let metadata = fs::metadata(path).map_err(tb_filesystem::Error::io("stat", path))?;
            if metadata.is_dir() {
                Ok(())
            } else {
                let err = io::Error::new(io::ErrorKind::NotADirectory, "not a directory");
                Err(tb_filesystem::Error::io("use", path)(err))
            }
        }
        Err(err) => Err(tb_filesystem::Error::io("create", path)(err)),
    }
}

/// Make sure `~/.trash` is a symlink to `user`'s trash root.
///
/// Only meaningful in centralized mode, in local mode the trash root itself lives at the
/// alias location and this always returns [`AliasOutcome::Present`].
pub fn ensure_alias(layout: &HostLayout, user: &User) -> Result<AliasOutcome, crate::Error> {
    if layout.mode == PlacementMode::Local {
        return Ok(AliasOutcome::Present);
    }

    let alias = layout.alias_path(user);
    let target = layout.trash_root_for(user);

    match fs::symlink_metadata(&alias) {
        Ok(metadata) if metadata.file_type().is_symlink() => Ok(AliasOutcome::Present),
        Ok(_) => migrate(layout, user, &alias, &target),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            match FilesystemPlatform::symlink(&target, &alias) {
                Ok(()) => Ok(AliasOutcome::Created),
                // Another shell of the same user beat us to it.
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    ensure_alias(layout, user)
                }
                Err(err) => Err(tb_filesystem::Error::io("create alias", &alias)(err).into()),
            }
        }
        Err(err) => Err(tb_filesystem::Error::io("stat", &alias)(err).into()),
    }
}

/// Replace whatever is at `alias` with a symlink to `target`.
///
/// The new link is fully created before anything is moved, so the only window where
/// `alias` doesn't exist is between two renames in the same directory.
fn migrate(
    layout: &HostLayout,
    user: &User,
    alias: &Path,
    target: &Path,
) -> Result<AliasOutcome, crate::Error> {
    let temp = user
        .home
        .join(format!("{TEMP_ALIAS_PREFIX}{}", uuid::Uuid::new_v4().simple()));
    FilesystemPlatform::symlink(target, &temp)
        .map_err(tb_filesystem::Error::io("create alias", &temp))?;

    let legacy = layout.legacy_path(user);
    let aside = match fs::symlink_metadata(&legacy) {
        Ok(_) => legacy.join(NanoClock::<TimestampKey>::default().next().to_string()),
        Err(_) => legacy,
    };

    if let Err(err) = fs::rename(alias, &aside) {
        let _ = fs::remove_file(&temp);
        return Err(tb_filesystem::Error::io("move aside", alias)(err).into());
    }
    if let Err(err) = fs::rename(&temp, alias) {
        if let Err(restore) = fs::rename(&aside, alias) {
            tracing::error!(?restore, aside = %aside.display(), "failed to move old trash back");
        }
        let _ = fs::remove_file(&temp);
        return Err(tb_filesystem::Error::io("create alias", alias)(err).into());
    }

    tracing::info!(user = %user.name, legacy = %aside.display(), "migrated old trash directory");
    Ok(AliasOutcome::Migrated { legacy: aside })
}
