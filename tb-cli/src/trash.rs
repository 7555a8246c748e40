//! `tb-trash`, lists and restores entries of your trash.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, SystemTime};

use clap::{Parser, Subcommand};
use tb_core::restore::{list_entries, restore};
use tb_core::{HostLayout, PathMapper};
use tb_types::TimestampKey;

static PROGRAM: &str = "tb-trash";

/// Inspect your trash and put things back.
#[derive(Debug, Parser)]
#[command(name = "tb-trash", version)]
pub struct TrashArgs {
    #[command(subcommand)]
    pub command: TrashCommand,
}

#[derive(Debug, Subcommand)]
pub enum TrashCommand {
    /// List every entry, oldest first.
    List,
    /// Move a trashed item back to where it was removed from.
    Restore {
        /// Entry the item was trashed into, as shown by `list`.
        key: TimestampKey,
        /// Path the item had before it was removed.
        original: PathBuf,
    },
}

/// Entry point of `tb-trash`.
pub fn main() -> ExitCode {
    crate::logging::init();
    match run(TrashArgs::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{PROGRAM}: {err:#}");
            ExitCode::FAILURE
        }
    }
}

pub fn run(args: TrashArgs) -> anyhow::Result<()> {
    let configs = crate::config::load(None)?;
    let layout = HostLayout::from_configs(&configs)?;
    let user = crate::config::invoking_user(&layout)?;
    let trash_root = layout.trash_root_for(&user);
    let mapper = PathMapper::new(&layout, &user);

    match args.command {
        TrashCommand::List => {
            let now = SystemTime::now();
            for entry in list_entries(&trash_root, &mapper)? {
                let age = entry
                    .modified
                    .and_then(|modified| now.duration_since(modified).ok())
                    .map(ago)
                    .unwrap_or_else(|| "-".to_string());
                let original = entry
                    .original
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "?".to_string());
                println!(
                    "{}  {age:>5}  {:>6}  {original}",
                    entry.key,
                    tb_ore::human::bytes(entry.size)
                );
            }
        }
        TrashCommand::Restore { key, original } => {
            let restored = restore(&trash_root, &mapper, key, &original)?;
            println!("restored '{}'", restored.display());
        }
    }
    Ok(())
}

/// Coarse age, e.g. `3d`, `5h`, or `12m`.
fn ago(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    match secs {
        0..60 => "now".to_string(),
        60..3_600 => format!("{}m", secs / 60),
        3_600..86_400 => format!("{}h", secs / 3_600),
        _ => format!("{}d", secs / 86_400),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn smoketest_ago() {
        assert_eq!(ago(Duration::from_secs(5)), "now");
        assert_eq!(ago(Duration::from_secs(12 * 60 + 30)), "12m");
        assert_eq!(ago(Duration::from_secs(5 * 3_600)), "5h");
        assert_eq!(ago(Duration::from_secs(3 * 86_400 + 7)), "3d");
    }

    #[test]
    fn parses_restore() {
        let args = TrashArgs::try_parse_from([
            "tb-trash",
            "restore",
            "2026-10-18_09-15-02.123456789",
            "notes.txt",
        ])
        .unwrap();
        let TrashCommand::Restore { key, original } = args.command else {
            panic!("expected restore");
        };
        assert_eq!(key.to_string(), "2026-10-18_09-15-02.123456789");
        assert_eq!(original, PathBuf::from("notes.txt"));

        assert!(TrashArgs::try_parse_from(["tb-trash", "restore", "yesterday", "x"]).is_err());
    }
}
