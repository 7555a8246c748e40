//! `tb-sweep`, permanently deletes trash older than a threshold and reports on usage.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tb_core::cleanup_log::CleanupLog;
use tb_core::defs;
use tb_core::sweeper::{SweepPolicy, Sweeper};
use tb_core::HostLayout;
use tb_types::{Age, UserName};

static PROGRAM: &str = "tb-sweep";

/// How a sweep ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success,
    /// The sweep couldn't start, or the named user has no trash.
    Failure,
    /// Bad input, e.g. a malformed config file.
    Usage,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        match exit {
            Exit::Success => ExitCode::SUCCESS,
            Exit::Failure => ExitCode::FAILURE,
            Exit::Usage => ExitCode::from(2),
        }
    }
}

/// Delete trash entries older than a threshold and report how much space trash uses.
///
/// Without --do-it nothing is deleted, the report shows what would be.
#[derive(Debug, Parser)]
#[command(name = "tb-sweep", version)]
pub struct SweepArgs {
    /// Only sweep this user.
    #[arg(short, long, value_name = "NAME")]
    pub user: Option<UserName>,
    /// Delete entries at least this old, <N><unit> where unit is m, h, or d.
    #[arg(short, long, default_value = "7d")]
    pub age: Age,
    /// Actually delete, the default is a dry run.
    #[arg(long = "do-it")]
    pub do_it: bool,
    /// Number of users listed in the largest trash tables.
    #[arg(short = 'n', long = "top", value_name = "N")]
    pub top: Option<usize>,
    /// Read configuration from this file.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Parent of all home directories.
    #[arg(long, value_name = "PATH")]
    pub home_root: Option<PathBuf>,
    /// Shared parent of every user's trash.
    #[arg(long, value_name = "PATH")]
    pub trash_root: Option<PathBuf>,
    /// Directory of the cleanup log.
    #[arg(long, value_name = "PATH")]
    pub log_dir: Option<PathBuf>,
    /// Print the resolved configuration and exit.
    #[arg(long)]
    pub show_config: bool,
}

/// Entry point of `tb-sweep`.
pub fn main() -> ExitCode {
    crate::logging::init();
    run(SweepArgs::parse()).into()
}

pub fn run(args: SweepArgs) -> Exit {
    let (layout, top_n) = match resolve(&args) {
        Ok(Resolved::Layout(layout, top_n)) => (layout, top_n),
        Ok(Resolved::Shown) => return Exit::Success,
        Err(err) => {
            eprintln!("{PROGRAM}: {err:#}");
            return Exit::Usage;
        }
    };

    let policy = SweepPolicy {
        age: args.age,
        execute: args.do_it,
        user: args.user,
        top_n,
    };
    let mut sweeper = Sweeper::new(&layout, policy);
    if args.do_it {
        match CleanupLog::open(&layout.cleanup_log_path()) {
            Ok(log) => sweeper = sweeper.with_log(log),
            Err(err) => {
                eprintln!("{PROGRAM}: {err}");
                return Exit::Failure;
            }
        }
    }

    let spinner = crate::logging::spinner("finding users");
    let result = sweeper.run(|user| spinner.set_message(format!("sweeping {}", user.name)));
    spinner.finish_and_clear();

    match result {
        Ok(report) => {
            print!("{}", report.display(crate::logging::color_enabled()));
            Exit::Success
        }
        Err(err) => {
            eprintln!("{PROGRAM}: {err}");
            Exit::Failure
        }
    }
}

enum Resolved {
    Layout(HostLayout, usize),
    Shown,
}

/// Load the configuration and apply command line overrides.
fn resolve(args: &SweepArgs) -> anyhow::Result<Resolved> {
    let configs = crate::config::load(args.config.as_deref())?;
    let overrides = [
        (defs::HOME_ROOT.name(), &args.home_root),
        (defs::TRASH_ROOT.name(), &args.trash_root),
        (defs::LOG_DIR.name(), &args.log_dir),
    ];
    for (name, value) in overrides {
        if let Some(value) = value {
            crate::config::override_path(&configs, name, value)?;
        }
    }

    if args.show_config {
        print!("{configs}");
        return Ok(Resolved::Shown);
    }

    let layout = HostLayout::from_configs(&configs)?;
    let top_n = match args.top {
        Some(top_n) => top_n,
        None => usize::try_from(defs::REPORT_TOP_N.read(&configs))?,
    };
    Ok(Resolved::Layout(layout, top_n))
}

#[cfg(test)]
mod test {
    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn smoketest_args() {
        let args = SweepArgs::try_parse_from(["tb-sweep"]).unwrap();
        assert_eq!(args.age, Age::days(7));
        assert!(!args.do_it);
        assert!(args.user.is_none());

        let args =
            SweepArgs::try_parse_from(["tb-sweep", "-u", "bob", "-a", "90m", "--do-it", "-n", "3"])
                .unwrap();
        assert_eq!(args.user, Some(UserName::new("bob").unwrap()));
        assert_eq!(args.age.to_string(), "90m");
        assert!(args.do_it);
        assert_eq!(args.top, Some(3));
    }

    #[test]
    fn bad_age_is_a_usage_error() {
        let err = SweepArgs::try_parse_from(["tb-sweep", "--age", "7w"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn overrides_apply() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "report_top_n = 4\nlog_dir = \"/tmp\"\n").unwrap();
        let config = config.to_str().unwrap();

        let args = SweepArgs::try_parse_from([
            "tb-sweep",
            "-c",
            config,
            "--home-root",
            "/export/home",
            "--log-dir",
            "/srv/log",
        ])
        .unwrap();
        let Resolved::Layout(layout, top_n) = resolve(&args).unwrap() else {
            panic!("expected a layout");
        };
        assert_eq!(top_n, 4);
        assert_eq!(layout.home_root, std::path::Path::new("/export/home"));
        assert_eq!(layout.log_dir, std::path::Path::new("/srv/log"));
        assert_eq!(layout.trash_root, std::path::Path::new("/data/trash"));
    }

    #[test]
    fn missing_user_fails() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("home/bob")).unwrap();
        std::fs::create_dir_all(root.join("trash")).unwrap();
        let config = root.join("config.toml");
        std::fs::write(&config, "").unwrap();

        let path = |name: &str| root.join(name).to_str().unwrap().to_string();
        let args = SweepArgs::try_parse_from([
            "tb-sweep".to_string(),
            "-c".to_string(),
            path("config.toml"),
            "--home-root".to_string(),
            path("home"),
            "--trash-root".to_string(),
            path("trash"),
            "-u".to_string(),
            "bob".to_string(),
        ])
        .unwrap();
        assert_eq!(run(args), Exit::Failure);
    }
}
