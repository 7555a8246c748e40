//! The persisted, append only, record of what a sweep deleted.
//!
//! Every line has the form `<timestamp> | <OUTCOME> | <subject> | <detail> | ...` so it
//! can be picked apart with `cut -d'|'`.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};

/// Tag of a line in the cleanup log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Aged entries were deleted from a user's trash.
    Cleaned,
    /// An emptied legacy trash directory was removed.
    Removed,
    /// Totals for a whole sweep.
    Summary,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Outcome::Cleaned => "CLEANED",
            Outcome::Removed => "REMOVED",
            Outcome::Summary => "SUMMARY",
        };
        f.write_str(tag)
    }
}

/// Handle to the cleanup log, opened in append mode.
#[derive(Debug)]
pub struct CleanupLog {
    path: PathBuf,
    file: File,
}

impl CleanupLog {
    /// Open, creating if needed, the log at `path`.
    pub fn open(path: &Path) -> Result<Self, crate::Error> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| crate::Error::LogUnavailable {
                path: path.to_path_buf(),
                source: tb_filesystem::Error::io("open", path)(source),
            })?;
        Ok(CleanupLog {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Append a single line stamped with the current time.
    ///
    /// A failed write is reported but never stops a sweep, the deletion already happened.
    pub fn append<D: fmt::Display>(&mut self, outcome: Outcome, subject: &str, details: &[D]) {
        let line = format_line(Utc::now(), outcome, subject, details);
        if let Err(err) = self.file.write_all(line.as_bytes()) {
            tracing::warn!(?err, path = %self.path.display(), "failed to write cleanup log");
        }
    }
}

fn format_line<D: fmt::Display>(
    at: DateTime<Utc>,
    outcome: Outcome,
    subject: &str,
    details: &[D],
) -> String {
    let mut line = format!(
        "{} | {outcome} | {subject}",
        at.to_rfc3339_opts(SecondsFormat::Secs, false)
    );
    for detail in details {
        line.push_str(" | ");
        line.push_str(&detail.to_string());
    }
    line.push('\n');
    line
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn smoketest_format() {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 3, 0, 0).unwrap();
        let line = format_line(at, Outcome::Cleaned, "alice", &["trash", "age=7d", "removed=3"]);
        assert_eq!(
            line,
            "2026-10-18T03:00:00+00:00 | CLEANED | alice | trash | age=7d | removed=3\n"
        );

        let none: [&str; 0] = [];
        let line = format_line(at, Outcome::Summary, "all", &none);
        assert_eq!(line, "2026-10-18T03:00:00+00:00 | SUMMARY | all\n");
    }

    #[test]
    fn appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trash_cleanup.log");

        let mut log = CleanupLog::open(&path).unwrap();
        log.append(Outcome::Removed, "bob", &["/home/bob/.trash.old"]);
        drop(log);
        let mut log = CleanupLog::open(&path).unwrap();
        log.append(Outcome::Summary, "all", &["users=1"]);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(" | REMOVED | bob | /home/bob/.trash.old"));
        assert!(lines[1].ends_with(" | SUMMARY | all | users=1"));
    }

    #[test]
    fn missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = CleanupLog::open(&dir.path().join("nope/trash_cleanup.log")).unwrap_err();
        assert!(matches!(err, crate::Error::LogUnavailable { .. }));
        assert!(err.to_string().contains("--log-dir"));
    }
}
