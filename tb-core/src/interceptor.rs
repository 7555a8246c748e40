//! Moving removal targets into the trash instead of unlinking them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use derivative::Derivative;
use tb_filesystem::{move_path, MoveKind};
use tb_ore::clock::NanoClock;
use tb_types::TimestampKey;

use crate::{HostLayout, PathMapper, User};

bitflags::bitflags! {
    /// Flags of a removal, as given on the command line.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RemoveFlags: u8 {
        /// Ignore missing paths and never prompt.
        const FORCE = 1 << 0;
        /// Prompt before every removal.
        const INTERACTIVE = 1 << 1;
        /// Remove directories and their contents.
        const RECURSIVE = 1 << 2;
        /// Remove empty directories.
        const DIR = 1 << 3;
        /// Explain what is being done.
        const VERBOSE = 1 << 4;
    }
}

/// Asks whether a path should really be removed.
pub trait Confirm {
    fn confirm(&mut self, path: &Path, is_dir: bool) -> bool;
}

impl<F: FnMut(&Path, bool) -> bool> Confirm for F {
    fn confirm(&mut self, path: &Path, is_dir: bool) -> bool {
        self(path, is_dir)
    }
}

/// Why a path was left alone without that being a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The user answered no to the prompt.
    Declined,
    /// The path doesn't exist and [`RemoveFlags::FORCE`] was given.
    Missing,
}

/// Result of removing a single path.
#[derive(Debug)]
pub enum ItemOutcome {
    Trashed {
        path: PathBuf,
        /// The trash entry, `<trash root>/<key>`, created for this removal.
        entry: PathBuf,
        /// Where the removed path now lives.
        destination: PathBuf,
        kind: MoveKind,
    },
    Skipped {
        path: PathBuf,
        reason: SkipReason,
    },
    Failed {
        path: PathBuf,
        error: crate::Error,
    },
}

/// Moves paths into a single user's trash root.
///
/// Every removed path gets its own entry, `<trash root>/<key>/<relative path>`, where the
/// key comes from a monotonic nanosecond clock and the entry is created exclusively, so
/// two removals never share or overwrite an entry.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Interceptor<'a> {
    /// Canonical location of the trash root.
    trash_root: PathBuf,
    /// Canonical location of `~/.trash`.
    alias: Option<PathBuf>,
    mapper: PathMapper,
    flags: RemoveFlags,
    clock: NanoClock<TimestampKey>,
    #[derivative(Debug = "ignore")]
    confirm: Box<dyn Confirm + 'a>,
}

impl<'a> Interceptor<'a> {
    /// Create an [`Interceptor`] for `user`, whose trash root must already exist.
    pub fn new(layout: &HostLayout, user: &User, flags: RemoveFlags) -> Result<Self, crate::Error> {
        let trash_root = layout.trash_root_for(user);
        let trash_root = fs::canonicalize(&trash_root).map_err(|source| {
            crate::Error::TrashRootUnavailable {
                path: trash_root.clone(),
                source: tb_filesystem::Error::io("resolve", &trash_root)(source),
            }
        })?;
        let alias = fs::canonicalize(&user.home)
            .ok()
            .map(|home| home.join(crate::layout::TRASH_ALIAS_NAME));

        Ok(Interceptor {
            trash_root,
            alias,
            mapper: PathMapper::new(layout, user),
            flags,
            clock: NanoClock::default(),
            confirm: Box::new(|_: &Path, _: bool| false),
        })
    }

    /// Use `confirm` to answer prompts in [`RemoveFlags::INTERACTIVE`] mode.
    pub fn with_confirm(mut self, confirm: impl Confirm + 'a) -> Self {
        self.confirm = Box::new(confirm);
        self
    }

    #[cfg(test)]
    pub(crate) fn with_clock(mut self, clock: NanoClock<TimestampKey>) -> Self {
        self.clock = clock;
        self
    }

    /// Move every one of `paths` into the trash. A failure only affects its own path.
    pub fn remove<P: AsRef<Path>>(&mut self, paths: &[P]) -> Vec<ItemOutcome> {
        paths.iter().map(|path| self.remove_one(path.as_ref())).collect()
    }

    pub fn remove_one(&mut self, path: &Path) -> ItemOutcome {
        match self.trash(path) {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::debug!(path = %path.display(), %error, "failed to trash");
                ItemOutcome::Failed {
                    path: path.to_path_buf(),
                    error,
                }
            }
        }
    }

    fn trash(&mut self, path: &Path) -> Result<ItemOutcome, crate::Error> {
        let refused = |what| crate::Error::Refused {
            path: path.to_path_buf(),
            what,
        };
        if is_dot_or_dot_dot(path) {
            return Err(refused("'.' or '..'"));
        }

        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                if self.flags.contains(RemoveFlags::FORCE) {
                    return Ok(ItemOutcome::Skipped {
                        path: path.to_path_buf(),
                        reason: SkipReason::Missing,
                    });
                }
                return Err(crate::Error::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(err) => return Err(tb_filesystem::Error::io("stat", path)(err).into()),
        };

        let is_dir = metadata.is_dir();
        if is_dir && !self.flags.contains(RemoveFlags::RECURSIVE) {
            if !self.flags.contains(RemoveFlags::DIR) {
                return Err(crate::Error::IsDirectory {
                    path: path.to_path_buf(),
                });
            }
            let mut children = fs::read_dir(path).map_err(tb_filesystem::Error::io("read", path))?;
            if children.next().is_some() {
                return Err(crate::Error::DirectoryNotEmpty {
                    path: path.to_path_buf(),
                });
            }
        }

        if self.flags.contains(RemoveFlags::INTERACTIVE)
            && !self.flags.contains(RemoveFlags::FORCE)
            && !self.confirm.confirm(path, is_dir)
        {
            return Ok(ItemOutcome::Skipped {
                path: path.to_path_buf(),
                reason: SkipReason::Declined,
            });
        }

        // Resolve the parent only, removing a symlink trashes the link and not its target.
        let Some(name) = path.file_name() else {
            return Err(refused("the root directory"));
        };
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let parent = fs::canonicalize(parent).map_err(tb_filesystem::Error::io("resolve", parent))?;
        let source = parent.join(name);

        if source.starts_with(&self.trash_root) {
            return Err(refused("the trash or anything inside it"));
        }
        if self.trash_root.starts_with(&source) {
            return Err(refused("a directory containing the trash"));
        }
        if self.alias.as_deref() == Some(source.as_path()) {
            return Err(refused("the trash alias"));
        }

        let relative = self.mapper.to_relative(&source);
        let key = self.clock.next();
        let entry = self.trash_root.join(key.to_string());
        match fs::create_dir(&entry) {
            Ok(()) => (),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(crate::Error::KeyCollision { entry });
            }
            Err(err) => return Err(tb_filesystem::Error::io("create", &entry)(err).into()),
        }

        let destination = entry.join(&relative);
        let moved = destination
            .parent()
            .map_or(Ok(()), |parent| {
                fs::create_dir_all(parent).map_err(tb_filesystem::Error::io("create", parent))
            })
            .and_then(|()| move_path(&source, &destination));
        let kind = match moved {
            Ok(kind) => kind,
            Err(err) => {
                if let Some(parent) = destination.parent() {
                    prune_empty_dirs(parent, &entry);
                }
                return Err(err.into());
            }
        };
        tracing::debug!(
            source = %source.display(),
            destination = %destination.display(),
            ?kind,
            "trashed"
        );

        Ok(ItemOutcome::Trashed {
            path: path.to_path_buf(),
            entry,
            destination,
            kind,
        })
    }
}

/// Returns true if the last component of `path`, as written, is `.` or `..`.
fn is_dot_or_dot_dot(path: &Path) -> bool {
    let raw = path.as_os_str().to_string_lossy();
    let last = raw.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    matches!(last, "." | "..")
}

/// Remove `from` and then each of its parents, up to and including `stop_at`, as long as
/// they are empty.
pub(crate) fn prune_empty_dirs(from: &Path, stop_at: &Path) {
    let mut current = from;
    while current.starts_with(stop_at) {
        if fs::remove_dir(current).is_err() {
            break;
        }
        if current == stop_at {
            break;
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }
}
