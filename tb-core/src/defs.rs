//! Host level settings, see [`HostLayout::from_configs`].
//!
//! [`HostLayout::from_configs`]: crate::layout::HostLayout::from_configs

use tb_cfg::{Config, ConfigSet};

pub static PLACEMENT_MODE: Config<&'static str> = Config::new(
    "placement_mode",
    "Where trash roots live, 'centralized' (shared area, aliased from home) or 'local'.",
    "centralized",
);

pub static TRASH_ROOT: Config<&'static str> = Config::new(
    "trash_root",
    "Shared parent of every user's trash root in centralized mode.",
    "/data/trash",
);

pub static HOME_ROOT: Config<&'static str> = Config::new(
    "home_root",
    "Parent of all home directories.",
    "/home",
);

pub static SCRATCH_ROOTS: Config<&'static str> = Config::new(
    "scratch_roots",
    "Comma separated scratch areas, '<root>/<user>' is a user's scratch space.",
    "/scratch",
);

pub static LOG_DIR: Config<&'static str> = Config::new(
    "log_dir",
    "Directory of the persisted cleanup log.",
    "/var/log",
);

pub static LEGACY_GRACE_DAYS: Config<u64> = Config::new(
    "legacy_grace_days",
    "Days an emptied legacy trash directory is kept before it is removed.",
    30,
);

pub static REPORT_TOP_N: Config<u64> = Config::new(
    "report_top_n",
    "Number of users listed in the sweep report's largest trash table.",
    10,
);

/// Returns a [`ConfigSet`] with every host setting registered at its default.
pub fn all_configs() -> ConfigSet {
    let mut builder = ConfigSet::builder();
    builder
        .register(&PLACEMENT_MODE)
        .register(&TRASH_ROOT)
        .register(&HOME_ROOT)
        .register(&SCRATCH_ROOTS)
        .register(&LOG_DIR)
        .register(&LEGACY_GRACE_DAYS)
        .register(&REPORT_TOP_N);
    builder.build()
}
