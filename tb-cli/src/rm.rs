//! `tb-rm`, a drop in replacement for `rm` that moves things into the trash.
//!
//! Flags are parsed leniently: short flags can be fused in any order (`-rf`, `-fri`),
//! unknown flags are reported and ignored, and `--` ends option parsing.

use std::ffi::OsString;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tb_core::alias::{self, AliasOutcome};
use tb_core::interceptor::{Interceptor, ItemOutcome, RemoveFlags};
use tb_core::HostLayout;

static PROGRAM: &str = "tb-rm";

/// Move files and directories into your trash instead of deleting them.
///
/// Trashed items can be listed and restored with `tb-trash`. To delete something
/// permanently, call `/bin/rm` directly.
#[derive(Debug, Parser)]
#[command(name = "tb-rm", version, args_override_self = true)]
pub struct RmArgs {
    /// Ignore nonexistent files and never prompt.
    #[arg(short, long)]
    pub force: bool,
    /// Prompt before every removal.
    #[arg(short, long)]
    pub interactive: bool,
    /// Remove directories and their contents.
    #[arg(short, short_alias = 'R', long)]
    pub recursive: bool,
    /// Remove empty directories.
    #[arg(short, long)]
    pub dir: bool,
    /// Explain what is being done.
    #[arg(short, long)]
    pub verbose: bool,
    /// Files and directories to remove.
    pub paths: Vec<PathBuf>,
}

impl RmArgs {
    pub fn flags(&self) -> RemoveFlags {
        let mut flags = RemoveFlags::empty();
        flags.set(RemoveFlags::FORCE, self.force);
        flags.set(RemoveFlags::INTERACTIVE, self.interactive);
        flags.set(RemoveFlags::RECURSIVE, self.recursive);
        flags.set(RemoveFlags::DIR, self.dir);
        flags.set(RemoveFlags::VERBOSE, self.verbose);
        flags
    }
}

/// Short flags we understand.
static SHORT_FLAGS: &[char] = &['f', 'i', 'r', 'R', 'd', 'v', 'h', 'V'];
/// Long flags we understand.
static LONG_FLAGS: &[&str] = &[
    "--force",
    "--interactive",
    "--recursive",
    "--dir",
    "--verbose",
    "--help",
    "--version",
];

/// Rewrite raw arguments into a form `clap` accepts: every recognized flag on its own,
/// followed by `--` and then every path.
///
/// Returns the rewritten arguments and the flags that were dropped.
pub fn normalize_args<I>(args: I) -> (Vec<OsString>, Vec<String>)
where
    I: IntoIterator<Item = OsString>,
{
    let mut args = args.into_iter();
    let mut flags: Vec<OsString> = args.next().into_iter().collect();
    let mut paths = Vec::new();
    let mut unknown = Vec::new();

    let mut options_done = false;
    for arg in args {
        if options_done {
            paths.push(arg);
            continue;
        }
        let Some(raw) = arg.to_str() else {
            paths.push(arg);
            continue;
        };

        if raw == "--" {
            options_done = true;
        } else if raw.starts_with("--") {
            if LONG_FLAGS.contains(&raw) {
                flags.push(arg);
            } else {
                unknown.push(raw.to_string());
            }
        } else if raw.len() > 1 && raw.starts_with('-') {
            for flag in raw.chars().skip(1) {
                if SHORT_FLAGS.contains(&flag) {
                    flags.push(format!("-{flag}").into());
                } else {
                    unknown.push(format!("-{flag}"));
                }
            }
        } else {
            paths.push(arg);
        }
    }

    flags.push("--".into());
    flags.extend(paths);
    (flags, unknown)
}

/// Entry point of `tb-rm`.
pub fn main() -> ExitCode {
    crate::logging::init();

    let (args, unknown) = normalize_args(std::env::args_os());
    for flag in unknown {
        eprintln!("{PROGRAM}: ignoring unknown option '{flag}'");
    }
    let args = RmArgs::parse_from(args);
    if args.paths.is_empty() {
        eprintln!("{PROGRAM}: missing operand");
        eprintln!("{}", RmArgs::command().render_usage());
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{PROGRAM}: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Trash every path in `args`. Only failing to find or create the trash is an error,
/// failures of individual paths are reported and skipped.
pub fn run(args: &RmArgs) -> anyhow::Result<()> {
    let configs = crate::config::load(None)?;
    let layout = HostLayout::from_configs(&configs)?;
    let user = crate::config::invoking_user(&layout)?;

    let trash_root = alias::ensure_trash_root(&layout, &user)?;
    match alias::ensure_alias(&layout, &user) {
        Ok(AliasOutcome::Migrated { legacy }) => eprintln!(
            "{PROGRAM}: moved your old trash to '{}', '{}' now points to '{}'",
            legacy.display(),
            layout.alias_path(&user).display(),
            trash_root.display()
        ),
        Ok(AliasOutcome::Created | AliasOutcome::Present) => (),
        Err(err) => eprintln!("{PROGRAM}: warning: {err}"),
    }

    let flags = args.flags();
    let mut interceptor = Interceptor::new(&layout, &user, flags)?.with_confirm(prompt);
    for outcome in interceptor.remove(&args.paths) {
        match outcome {
            ItemOutcome::Trashed { path, .. } => {
                if flags.contains(RemoveFlags::VERBOSE) {
                    println!("removed '{}'", path.display());
                }
            }
            ItemOutcome::Skipped { .. } => (),
            ItemOutcome::Failed { path, error } => {
                eprintln!("{PROGRAM}: cannot remove '{}': {}", path.display(), error.reason());
            }
        }
    }

    Ok(())
}

/// Ask on stderr, an answer starting with `y` or `Y` confirms.
fn prompt(path: &Path, is_dir: bool) -> bool {
    let kind = if is_dir { "directory" } else { "file" };
    eprint!("{PROGRAM}: remove {kind} '{}'? ", path.display());
    let _ = io::stderr().flush();

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => answer.trim_start().starts_with(['y', 'Y']),
        Err(_) => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn normalize(args: &[&str]) -> (Vec<String>, Vec<String>) {
        let args = std::iter::once("tb-rm")
            .chain(args.iter().copied())
            .map(OsString::from);
        let (args, unknown) = normalize_args(args);
        let args = args
            .into_iter()
            .map(|arg| arg.into_string().unwrap())
            .collect();
        (args, unknown)
    }

    fn parse(args: &[&str]) -> RmArgs {
        let (args, _) = normalize(args);
        RmArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn smoketest_fused_flags() {
        let (args, unknown) = normalize(&["-rf", "a", "-v", "b"]);
        assert_eq!(args, ["tb-rm", "-r", "-f", "-v", "--", "a", "b"]);
        assert!(unknown.is_empty());

        for fused in ["-rf", "-fr", "-Rf", "-fR"] {
            let args = parse(&[fused, "x"]);
            assert!(args.force && args.recursive, "{fused}");
            assert!(!args.interactive);
        }

        let args = parse(&["-fri", "x"]);
        assert_eq!(
            args.flags(),
            RemoveFlags::FORCE | RemoveFlags::RECURSIVE | RemoveFlags::INTERACTIVE
        );
        assert_eq!(args.paths, [PathBuf::from("x")]);
    }

    #[test]
    fn long_flags() {
        let args = parse(&["--recursive", "--force", "--verbose", "--dir", "x"]);
        assert_eq!(
            args.flags(),
            RemoveFlags::RECURSIVE | RemoveFlags::FORCE | RemoveFlags::VERBOSE | RemoveFlags::DIR
        );
    }

    #[test]
    fn unknown_flags_are_dropped() {
        let (args, unknown) = normalize(&["-rzf", "--one-file-system", "x"]);
        assert_eq!(args, ["tb-rm", "-r", "-f", "--", "x"]);
        assert_eq!(unknown, ["-z", "--one-file-system"]);
    }

    #[test]
    fn double_dash_ends_options() {
        let args = parse(&["-f", "--", "-rf", "--force", "-"]);
        assert_eq!(args.flags(), RemoveFlags::FORCE);
        assert_eq!(
            args.paths,
            [PathBuf::from("-rf"), PathBuf::from("--force"), PathBuf::from("-")]
        );
    }

    #[test]
    fn no_paths() {
        let args = parse(&["-rf"]);
        assert!(args.paths.is_empty());
    }
}
