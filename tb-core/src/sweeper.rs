//! Enforcing the retention threshold on every user's trash.
//!
//! A sweep captures "now" once, then for each user measures their trash, deletes the
//! entries whose modification time is at least the threshold old, and measures again.
//! Entries younger than the threshold are never touched, which is what makes it safe to
//! sweep while users are actively trashing things: the interceptor only ever creates
//! brand new entries.
//!
//! Nothing is deleted unless [`SweepPolicy::execute`] is set.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tb_filesystem::{disk_usage, remove_tree};
use tb_types::{Age, PlacementMode, TimestampKey, UserName};

use crate::cleanup_log::{CleanupLog, Outcome};
use crate::legacy::{sweep_legacy, LegacySweep};
use crate::report::SweepReport;
use crate::{HostLayout, User};

/// What a sweep should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPolicy {
    /// Entries at least this old are eligible.
    pub age: Age,
    /// Actually delete eligible entries, otherwise only report them.
    pub execute: bool,
    /// Restrict the sweep to a single user.
    pub user: Option<UserName>,
    /// How many users to list in the report's largest trash tables.
    pub top_n: usize,
}

impl Default for SweepPolicy {
    fn default() -> Self {
        SweepPolicy {
            age: Age::default(),
            execute: false,
            user: None,
            top_n: 10,
        }
    }
}

/// A failure that only affected a single path.
#[derive(Debug)]
pub struct SweepError {
    pub path: PathBuf,
    pub error: crate::Error,
}

/// The result of sweeping one directory, either a trash root or a legacy trash.
#[derive(Debug, Default)]
pub struct AreaSweep {
    /// Number of sweepable children found. In a trash root only dated entries count, in
    /// a legacy trash every child does.
    pub entries: u64,
    /// Size in bytes before anything was deleted.
    pub before: u64,
    /// Size in bytes after the sweep, equal to `before` in a dry run.
    pub after: u64,
    /// Number of children old enough to be deleted.
    pub matched: u64,
    /// Size in bytes of the children old enough to be deleted.
    pub matched_bytes: u64,
    /// Number of children this sweep deleted.
    pub removed: u64,
    pub errors: Vec<SweepError>,
}

impl AreaSweep {
    pub(crate) fn record(&mut self, path: &Path, error: impl Into<crate::Error>) {
        let error = error.into();
        tracing::warn!(path = %path.display(), %error, "sweep failure");
        self.errors.push(SweepError {
            path: path.to_path_buf(),
            error,
        });
    }
}

/// Which children of a directory are subject to the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Eligible {
    /// Only directories named like a [`TimestampKey`].
    Entries,
    /// Everything, entries and loose items alike.
    Everything,
}

/// Everything a sweep found for a single user.
#[derive(Debug)]
pub struct UserSweep {
    pub user: UserName,
    /// `None` if the user has no trash root.
    pub trash: Option<AreaSweep>,
    /// `None` if the user has no legacy trash.
    pub legacy: Option<LegacySweep>,
}

impl UserSweep {
    pub fn removed(&self) -> u64 {
        self.trash.as_ref().map_or(0, |area| area.removed)
            + self.legacy.as_ref().map_or(0, |legacy| legacy.area.removed)
    }

    pub fn errors(&self) -> impl Iterator<Item = &SweepError> {
        let trash = self.trash.iter().flat_map(|area| area.errors.iter());
        let legacy = self.legacy.iter().flat_map(|legacy| legacy.area.errors.iter());
        trash.chain(legacy)
    }
}

/// A single pass of the retention policy over a host.
#[derive(Debug)]
pub struct Sweeper<'a> {
    layout: &'a HostLayout,
    policy: SweepPolicy,
    now: SystemTime,
    log: Option<CleanupLog>,
}

impl<'a> Sweeper<'a> {
    pub fn new(layout: &'a HostLayout, policy: SweepPolicy) -> Self {
        Sweeper {
            layout,
            policy,
            now: SystemTime::now(),
            log: None,
        }
    }

    /// Classify ages relative to `now` instead of the time the sweeper was created.
    pub fn with_now(mut self, now: SystemTime) -> Self {
        self.now = now;
        self
    }

    /// Record deletions in `log`. Only used when executing.
    pub fn with_log(mut self, log: CleanupLog) -> Self {
        self.log = Some(log);
        self
    }

    /// The users this sweep will visit, sorted by name.
    ///
    /// When the sweep is restricted to a single user that user must have a trash root.
    pub fn users(&self) -> Result<Vec<User>, crate::Error> {
        if let Some(name) = &self.policy.user {
            let user = self.layout.user(name.clone());
            let trash_root = self.layout.trash_root_for(&user);
            if fs::metadata(&trash_root).map(|m| m.is_dir()).unwrap_or(false) {
                return Ok(vec![user]);
            }
            return Err(crate::Error::UserNotFound {
                user: name.clone(),
                path: trash_root,
            });
        }

        let mut names = BTreeSet::new();
        names.extend(child_users(&self.layout.home_root)?);
        if self.layout.mode == PlacementMode::Centralized {
            names.extend(child_users(&self.layout.trash_root)?);
        }
        Ok(names.into_iter().map(|name| self.layout.user(name)).collect())
    }

    /// Sweep every user, calling `progress` before each one.
    ///
    /// Failures while sweeping a user are recorded in the report and never stop the sweep.
    pub fn run(&mut self, mut progress: impl FnMut(&User)) -> Result<SweepReport, crate::Error> {
        let users = self.users()?;
        tracing::info!(
            users = users.len(),
            age = %self.policy.age,
            execute = self.policy.execute,
            "starting sweep"
        );

        let mut sweeps = Vec::with_capacity(users.len());
        for user in &users {
            progress(user);
            sweeps.push(self.sweep_user(user));
        }

        let report = SweepReport::new(self.policy.clone(), self.layout.legacy_grace, sweeps);
        if self.policy.execute {
            let subject = self.policy.user.as_ref().map_or("all", UserName::as_str);
            let details = [
                format!("age={}", self.policy.age),
                format!("users={}", report.users_scanned()),
                format!("cleaned={}", report.users_cleaned()),
                format!("removed={}", report.removed()),
                format!("before={}", tb_ore::human::bytes(report.grand_before())),
                format!("after={}", tb_ore::human::bytes(report.grand_after())),
            ];
            if let Some(log) = &mut self.log {
                log.append(Outcome::Summary, subject, &details);
            }
        }

        Ok(report)
    }

    fn sweep_user(&mut self, user: &User) -> UserSweep {
        let _span = tracing::info_span!("sweep", user = %user.name).entered();

        let trash = self.sweep_trash(user);
        if let Some(area) = &trash {
            self.log_cleaned(user, "trash", area.removed);
        }

        let legacy = sweep_legacy(self.layout, user, &self.policy, self.now);
        if let Some(legacy) = &legacy {
            self.log_cleaned(user, "legacy", legacy.area.removed);
            if legacy.container.is_removed() {
                let details = [
                    legacy.path.display().to_string(),
                    format!("empty legacy trash older than {}", self.layout.legacy_grace),
                ];
                if let Some(log) = &mut self.log {
                    log.append(Outcome::Removed, user.name.as_str(), &details);
                }
            }
        }

        UserSweep {
            user: user.name.clone(),
            trash,
            legacy,
        }
    }

    fn sweep_trash(&self, user: &User) -> Option<AreaSweep> {
        let root = self.layout.trash_root_for(user);
        let mut area = AreaSweep::default();
        match fs::metadata(&root) {
            Ok(metadata) if metadata.is_dir() => (),
            Ok(_) => return None,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                area.record(&root, tb_filesystem::Error::io("stat", &root)(err));
                return Some(area);
            }
        }

        sweep_children(&root, Eligible::Entries, &self.policy, self.now, &mut area);
        Some(area)
    }

    fn log_cleaned(&mut self, user: &User, what: &str, removed: u64) {
        if removed == 0 {
            return;
        }
        let details = [
            what.to_string(),
            format!("age={}", self.policy.age),
            format!("removed={removed}"),
        ];
        if let Some(log) = &mut self.log {
            log.append(Outcome::Cleaned, user.name.as_str(), &details);
        }
    }
}

/// Names of the directories directly inside `root` that can be user names.
fn child_users(root: &Path) -> Result<Vec<UserName>, crate::Error> {
    let children = match fs::read_dir(root) {
        Ok(children) => children,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(root = %root.display(), "missing, no users found here");
            return Ok(Vec::new());
        }
        Err(err) => return Err(tb_filesystem::Error::io("list", root)(err).into()),
    };

    let mut names = Vec::new();
    for child in children {
        let child = child.map_err(tb_filesystem::Error::io("list", root))?;
        if !child.file_type().map(|kind| kind.is_dir()).unwrap_or(false) {
            continue;
        }
        let name = child.file_name();
        let Some(name) = name.to_str().filter(|name| !name.starts_with('.')) else {
            continue;
        };
        if let Ok(name) = UserName::new(name) {
            names.push(name);
        }
    }
    Ok(names)
}

/// Measure `dir`, delete its eligible children that are old enough, and measure again.
///
/// Returns the number of children that are left afterwards, in a dry run the number that
/// would be left.
pub(crate) fn sweep_children(
    dir: &Path,
    eligible: Eligible,
    policy: &SweepPolicy,
    now: SystemTime,
    area: &mut AreaSweep,
) -> u64 {
    match disk_usage(dir) {
        Ok(usage) => area.before = usage.bytes,
        Err(err) => area.record(dir, err),
    }

    let children = match fs::read_dir(dir) {
        Ok(children) => children,
        Err(err) => {
            area.record(dir, tb_filesystem::Error::io("list", dir)(err));
            area.after = area.before;
            return 0;
        }
    };

    let mut remaining = 0;
    for child in children {
        let child = match child {
            Ok(child) => child,
            Err(err) => {
                area.record(dir, tb_filesystem::Error::io("list", dir)(err));
                continue;
            }
        };
        remaining += 1;

        let path = child.path();
        let metadata = match child.metadata() {
            Ok(metadata) => metadata,
            // Gone since we listed the directory.
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                remaining -= 1;
                continue;
            }
            Err(err) => {
                area.record(&path, tb_filesystem::Error::io("stat", &path)(err));
                continue;
            }
        };

        let is_entry = metadata.is_dir()
            && child
                .file_name()
                .to_str()
                .and_then(TimestampKey::from_name)
                .is_some();
        if eligible == Eligible::Entries && !is_entry {
            continue;
        }
        area.entries += 1;
        let Ok(mtime) = metadata.modified() else {
            continue;
        };
        if !policy.age.is_exceeded(mtime, now) {
            continue;
        }

        area.matched += 1;
        match disk_usage(&path) {
            Ok(usage) => area.matched_bytes += usage.bytes,
            Err(err) => area.record(&path, err),
        }
        if !policy.execute {
            remaining -= 1;
            continue;
        }

        match remove_tree(&path) {
            Ok(removed) => {
                remaining -= 1;
                if removed {
                    tracing::debug!(path = %path.display(), "removed");
                    area.removed += 1;
                }
            }
            Err(err) => area.record(&path, err),
        }
    }

    area.after = if policy.execute {
        match disk_usage(dir) {
            Ok(usage) => usage.bytes,
            Err(err) => {
                area.record(dir, err);
                area.before
            }
        }
    } else {
        area.before
    };
    remaining
}
