//! Where everything lives on a host.

use std::path::{Component, Path, PathBuf};

use tb_cfg::ConfigSet;
use tb_types::{Age, PlacementMode, UserName};

use crate::defs;

/// Name of the trash alias (centralized) or trash root (local) inside a home directory.
pub static TRASH_ALIAS_NAME: &str = ".trash";
/// Name of the pre-migration trash directory inside a home directory.
pub static LEGACY_TRASH_NAME: &str = ".trash.old";
/// Name of a user's trash root inside their centralized directory.
static CENTRAL_TRASH_NAME: &str = "trash";
/// Name of the persisted cleanup log inside the log directory.
static CLEANUP_LOG_NAME: &str = "trash_cleanup.log";

/// Resolved, host wide configuration.
///
/// Built once at process start and passed into everything else, nothing below this
/// reads the environment or probes the filesystem to decide where things go.
#[derive(Debug, Clone)]
pub struct HostLayout {
    pub mode: PlacementMode,
    /// Parent of per-user trash roots in [`PlacementMode::Centralized`].
    pub trash_root: PathBuf,
    /// Parent of home directories.
    pub home_root: PathBuf,
    /// Scratch areas, `<root>/<user>` belongs to `user`.
    pub scratch_roots: Vec<PathBuf>,
    /// Directory holding the cleanup log.
    pub log_dir: PathBuf,
    /// How long an emptied legacy trash directory is kept around.
    pub legacy_grace: Age,
}

impl HostLayout {
    pub fn from_configs(configs: &ConfigSet) -> Result<Self, crate::Error> {
        let invalid = |name: &'static str, reason: String| crate::Error::InvalidConfig { name, reason };
        let absolute = |name: &'static str, value: &str| -> Result<PathBuf, crate::Error> {
            let path = PathBuf::from(value.trim());
            if path.is_absolute() {
                Ok(path)
            } else {
                Err(invalid(name, format!("'{value}' is not an absolute path")))
            }
        };

        let mode = defs::PLACEMENT_MODE
            .read(configs)
            .parse::<PlacementMode>()
            .map_err(|err| invalid(defs::PLACEMENT_MODE.name(), err.to_string()))?;
        let trash_root = absolute(defs::TRASH_ROOT.name(), &defs::TRASH_ROOT.read(configs))?;
        let home_root = absolute(defs::HOME_ROOT.name(), &defs::HOME_ROOT.read(configs))?;
        let log_dir = absolute(defs::LOG_DIR.name(), &defs::LOG_DIR.read(configs))?;
        let scratch_roots = defs::SCRATCH_ROOTS
            .read(configs)
            .split(',')
            .map(str::trim)
            .filter(|root| !root.is_empty())
            .map(|root| absolute(defs::SCRATCH_ROOTS.name(), root))
            .collect::<Result<Vec<_>, _>>()?;
        let legacy_grace = Age::days(defs::LEGACY_GRACE_DAYS.read(configs));

        Ok(HostLayout {
            mode,
            trash_root,
            home_root,
            scratch_roots,
            log_dir,
            legacy_grace,
        })
    }

    /// The directory holding all of `user`'s trash entries.
    pub fn trash_root_for(&self, user: &User) -> PathBuf {
        match self.mode {
            PlacementMode::Centralized => self
                .trash_root
                .join(user.name.as_str())
                .join(CENTRAL_TRASH_NAME),
            PlacementMode::Local => user.home.join(TRASH_ALIAS_NAME),
        }
    }

    /// The per-user directory under the shared root, only in centralized mode.
    pub fn central_user_dir(&self, user: &User) -> Option<PathBuf> {
        match self.mode {
            PlacementMode::Centralized => Some(self.trash_root.join(user.name.as_str())),
            PlacementMode::Local => None,
        }
    }

    /// Location of the trash alias in `user`'s home directory.
    pub fn alias_path(&self, user: &User) -> PathBuf {
        user.home.join(TRASH_ALIAS_NAME)
    }

    /// Location of `user`'s legacy, pre-migration, trash directory.
    pub fn legacy_path(&self, user: &User) -> PathBuf {
        user.home.join(LEGACY_TRASH_NAME)
    }

    /// The user named `name`, with their home directory under [`HostLayout::home_root`].
    pub fn user(&self, name: UserName) -> User {
        let home = self.home_root.join(name.as_str());
        User { name, home }
    }

    pub fn cleanup_log_path(&self) -> PathBuf {
        self.log_dir.join(CLEANUP_LOG_NAME)
    }
}

/// A user on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: UserName,
    pub home: PathBuf,
}

impl User {
    pub fn new(name: UserName, home: impl Into<PathBuf>) -> Self {
        User {
            name,
            home: home.into(),
        }
    }
}

/// Maps between absolute paths and the relative paths they're stored under in a trash
/// entry.
///
/// Paths inside the user's home directory are stored under `home/`, paths inside one of
/// the user's scratch areas under the scratch root's name, e.g. `scratch/`, and anything
/// else under its full absolute path. This keeps entries short while still recording
/// where things came from.
#[derive(Debug, Clone)]
pub struct PathMapper {
    /// `(canonical prefix, label)`, longest prefix first.
    prefixes: Vec<(PathBuf, PathBuf)>,
}

impl PathMapper {
    /// Build the mapper for `user`, resolving symlinks in the prefixes once up front.
    pub fn new(layout: &HostLayout, user: &User) -> Self {
        let canonical = |path: &Path| std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

        let mut prefixes = vec![(canonical(&user.home), PathBuf::from("home"))];
        for root in &layout.scratch_roots {
            let Some(label) = root.file_name() else {
                continue;
            };
            let area = canonical(&root.join(user.name.as_str()));
            prefixes.push((area, PathBuf::from(label)));
        }
        prefixes.sort_by_key(|(prefix, _)| std::cmp::Reverse(prefix.components().count()));

        PathMapper { prefixes }
    }

    /// Relative path that the absolute, canonical, `path` is stored under.
    pub fn to_relative(&self, path: &Path) -> PathBuf {
        for (prefix, label) in &self.prefixes {
            if let Ok(rest) = path.strip_prefix(prefix) {
                return label.join(rest);
            }
        }
        path.components()
            .filter(|component| !matches!(component, Component::RootDir | Component::Prefix(_)))
            .collect()
    }

    /// Best guess at the absolute path a relative trash path was stored from.
    pub fn to_original(&self, relative: &Path) -> PathBuf {
        let mut components = relative.components();
        if let Some(Component::Normal(first)) = components.next() {
            let rest = components.as_path();
            if let Some((prefix, _)) = self
                .prefixes
                .iter()
                .find(|(_, label)| label.as_os_str() == first)
            {
                return prefix.join(rest);
            }
        }
        Path::new("/").join(relative)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn layout(mode: PlacementMode) -> HostLayout {
        HostLayout {
            mode,
            trash_root: PathBuf::from("/data/trash"),
            home_root: PathBuf::from("/home"),
            scratch_roots: vec![PathBuf::from("/scratch")],
            log_dir: PathBuf::from("/var/log"),
            legacy_grace: Age::days(30),
        }
    }

    fn alice(layout: &HostLayout) -> User {
        layout.user(UserName::new("alice").unwrap())
    }

    #[test]
    fn smoketest_trash_roots() {
        let central = layout(PlacementMode::Centralized);
        let user = alice(&central);
        assert_eq!(central.trash_root_for(&user), Path::new("/data/trash/alice/trash"));
        assert_eq!(central.alias_path(&user), Path::new("/home/alice/.trash"));
        assert_eq!(central.legacy_path(&user), Path::new("/home/alice/.trash.old"));
        assert_eq!(central.central_user_dir(&user).unwrap(), Path::new("/data/trash/alice"));

        let local = layout(PlacementMode::Local);
        let user = alice(&local);
        assert_eq!(local.trash_root_for(&user), Path::new("/home/alice/.trash"));
        assert!(local.central_user_dir(&user).is_none());
    }

    #[test]
    fn smoketest_relative_paths() {
        let layout = layout(PlacementMode::Centralized);
        let mapper = PathMapper::new(&layout, &alice(&layout));

        let cases = [
            ("/home/alice/notes.txt", "home/notes.txt"),
            ("/home/alice/sub/dir/file.txt", "home/sub/dir/file.txt"),
            ("/scratch/alice/run/out.log", "scratch/run/out.log"),
            ("/scratch/bob/out.log", "scratch/bob/out.log"),
            ("/tmp/x", "tmp/x"),
            // Only whole components match.
            ("/home/alice2/x", "home/alice2/x"),
        ];
        for (absolute, relative) in cases {
            assert_eq!(mapper.to_relative(Path::new(absolute)), Path::new(relative));
        }

        assert_eq!(
            mapper.to_original(Path::new("home/sub/file.txt")),
            Path::new("/home/alice/sub/file.txt")
        );
        assert_eq!(
            mapper.to_original(Path::new("scratch/out.log")),
            Path::new("/scratch/alice/out.log")
        );
        assert_eq!(mapper.to_original(Path::new("tmp/x")), Path::new("/tmp/x"));
    }

    #[test]
    fn layout_from_configs() {
        let configs = defs::all_configs();
        configs.try_update("placement_mode", "local").unwrap();
        configs.try_update("scratch_roots", "/scratch, /fast ,").unwrap();
        configs.try_update("legacy_grace_days", "14").unwrap();

        let layout = HostLayout::from_configs(&configs).unwrap();
        assert_eq!(layout.mode, PlacementMode::Local);
        assert_eq!(
            layout.scratch_roots,
            vec![PathBuf::from("/scratch"), PathBuf::from("/fast")]
        );
        assert_eq!(layout.legacy_grace, Age::days(14));
        assert_eq!(layout.cleanup_log_path(), Path::new("/var/log/trash_cleanup.log"));

        configs.try_update("home_root", "relative/home").unwrap();
        let err = HostLayout::from_configs(&configs).unwrap_err();
        assert!(err.to_string().contains("home_root"), "{err}");

        let configs = defs::all_configs();
        configs.try_update("placement_mode", "everywhere").unwrap();
        assert!(HostLayout::from_configs(&configs).is_err());
    }
}
