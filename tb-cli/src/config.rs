//! Resolving configuration and the invoking user, once, at startup.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tb_cfg::ConfigSet;
use tb_core::{HostLayout, User};
use tb_types::UserName;

/// Environment variable naming the host config file.
pub static CONFIG_ENV: &str = "TB_CONFIG";
/// Host config file used when [`CONFIG_ENV`] isn't set.
pub static DEFAULT_CONFIG_PATH: &str = "/etc/tb/config.toml";

/// Every setting at its default, overlaid with the host config file.
///
/// `explicit` must exist. Otherwise the file named by `TB_CONFIG`, or the default
/// location, is read if present.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<ConfigSet> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => {
            let path = tb_ore::env::path_var(CONFIG_ENV)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
            (path, false)
        }
    };
    load_from(&path, required)
}

fn load_from(path: &Path, required: bool) -> anyhow::Result<ConfigSet> {
    let configs = tb_core::defs::all_configs();
    match std::fs::read_to_string(path) {
        Ok(raw) => {
            configs
                .apply_toml(&raw)
                .with_context(|| format!("invalid config file '{}'", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config file");
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound && !required => {
            tracing::debug!(path = %path.display(), "no config file");
        }
        Err(err) => {
            return Err(err).with_context(|| format!("cannot read config file '{}'", path.display()));
        }
    }
    Ok(configs)
}

/// Set the config `name` to a path given on the command line.
pub fn override_path(configs: &ConfigSet, name: &str, value: &Path) -> anyhow::Result<()> {
    let value = value
        .to_str()
        .with_context(|| format!("'{}' is not valid UTF-8", value.display()))?;
    configs.try_update(name, value)
}

/// The user running this process, with their home directory from the passwd database.
///
/// Falls back to `USER` and `HOME` when there's no passwd entry.
pub fn invoking_user(layout: &HostLayout) -> anyhow::Result<User> {
    if let Some(entry) = tb_filesystem::users::current_user()? {
        let name = UserName::new(&entry.name)?;
        return Ok(User::new(name, entry.home));
    }

    tracing::debug!("no passwd entry, falling back to the environment");
    let name = std::env::var("USER").context("cannot determine the current user")?;
    let name = UserName::new(&name)?;
    match tb_ore::env::path_var("HOME") {
        Some(home) => Ok(User::new(name, home)),
        None => Ok(layout.user(name)),
    }
}
