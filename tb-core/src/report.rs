//! Summarizing a sweep for an operator.

use std::fmt;

use ansi_term::{Colour, Style};
use tb_ore::human;
use tb_types::{Age, UserName};

use crate::legacy::Container;
use crate::sweeper::{AreaSweep, SweepError, SweepPolicy, UserSweep};

/// Everything a single sweep found and did.
#[derive(Debug)]
pub struct SweepReport {
    policy: SweepPolicy,
    legacy_grace: Age,
    users: Vec<UserSweep>,
}

impl SweepReport {
    pub fn new(policy: SweepPolicy, legacy_grace: Age, users: Vec<UserSweep>) -> Self {
        SweepReport {
            policy,
            legacy_grace,
            users,
        }
    }

    pub fn users(&self) -> &[UserSweep] {
        &self.users
    }

    pub fn users_scanned(&self) -> usize {
        self.users.len()
    }

    /// Users with at least one entry in their trash root.
    pub fn users_with_trash(&self) -> usize {
        self.trash_areas().filter(|(_, area)| area.entries > 0).count()
    }

    /// Users with at least one entry older than the threshold.
    pub fn users_with_matches(&self) -> usize {
        self.users
            .iter()
            .filter(|sweep| {
                sweep.trash.as_ref().is_some_and(|area| area.matched > 0)
                    || sweep.legacy.as_ref().is_some_and(|legacy| legacy.area.matched > 0)
            })
            .count()
    }

    /// Users this sweep deleted anything for.
    pub fn users_cleaned(&self) -> usize {
        self.users.iter().filter(|sweep| sweep.removed() > 0).count()
    }

    /// Number of entries and loose items deleted.
    pub fn removed(&self) -> u64 {
        self.users.iter().map(UserSweep::removed).sum()
    }

    /// Number of entries and loose items old enough to be deleted.
    pub fn matched(&self) -> u64 {
        self.areas().map(|area| area.matched).sum()
    }

    pub fn matched_bytes(&self) -> u64 {
        self.areas().map(|area| area.matched_bytes).sum()
    }

    pub fn trash_before(&self) -> u64 {
        self.trash_areas().map(|(_, area)| area.before).sum()
    }

    pub fn trash_after(&self) -> u64 {
        self.trash_areas().map(|(_, area)| area.after).sum()
    }

    pub fn legacy_users(&self) -> usize {
        self.legacy_areas().count()
    }

    pub fn legacy_before(&self) -> u64 {
        self.legacy_areas().map(|(_, area)| area.before).sum()
    }

    pub fn legacy_after(&self) -> u64 {
        self.legacy_areas().map(|(_, area)| area.after).sum()
    }

    pub fn grand_before(&self) -> u64 {
        self.trash_before() + self.legacy_before()
    }

    pub fn grand_after(&self) -> u64 {
        self.trash_after() + self.legacy_after()
    }

    /// Users with the largest trash after the sweep, largest first, ties broken by name.
    pub fn top_trash(&self) -> Vec<(&UserName, u64)> {
        top(self.trash_areas(), self.policy.top_n)
    }

    /// Users with the largest legacy trash after the sweep, largest first.
    pub fn top_legacy(&self) -> Vec<(&UserName, u64)> {
        top(self.legacy_areas(), self.policy.top_n)
    }

    /// Legacy trash directories that were, or in a dry run would be, removed.
    pub fn legacy_containers(&self, fate: Container) -> usize {
        self.users
            .iter()
            .filter_map(|sweep| sweep.legacy.as_ref())
            .filter(|legacy| legacy.container == fate)
            .count()
    }

    pub fn errors(&self) -> impl Iterator<Item = (&UserName, &SweepError)> {
        self.users
            .iter()
            .flat_map(|sweep| sweep.errors().map(move |error| (&sweep.user, error)))
    }

    /// Render the report, with colors if `color` is set.
    pub fn display(&self, color: bool) -> ReportDisplay<'_> {
        ReportDisplay {
            report: self,
            color,
        }
    }

    fn trash_areas(&self) -> impl Iterator<Item = (&UserName, &AreaSweep)> {
        self.users
            .iter()
            .filter_map(|sweep| sweep.trash.as_ref().map(|area| (&sweep.user, area)))
    }

    fn legacy_areas(&self) -> impl Iterator<Item = (&UserName, &AreaSweep)> {
        self.users.iter().filter_map(|sweep| {
            sweep
                .legacy
                .as_ref()
                .map(|legacy| (&sweep.user, &legacy.area))
        })
    }

    fn areas(&self) -> impl Iterator<Item = &AreaSweep> {
        self.trash_areas()
            .chain(self.legacy_areas())
            .map(|(_, area)| area)
    }
}

fn top<'a>(
    areas: impl Iterator<Item = (&'a UserName, &'a AreaSweep)>,
    n: usize,
) -> Vec<(&'a UserName, u64)> {
    let mut sizes: Vec<_> = areas
        .filter(|(_, area)| area.after > 0)
        .map(|(user, area)| (user, area.after))
        .collect();
    sizes.sort_by(|(a_user, a_size), (b_user, b_size)| {
        b_size.cmp(a_size).then_with(|| a_user.cmp(b_user))
    });
    sizes.truncate(n);
    sizes
}

/// Human readable rendering of a [`SweepReport`], see [`SweepReport::display`].
pub struct ReportDisplay<'a> {
    report: &'a SweepReport,
    color: bool,
}

impl ReportDisplay<'_> {
    fn style(&self, style: Style) -> Style {
        if self.color {
            style
        } else {
            Style::new()
        }
    }
}

impl fmt::Display for ReportDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        let policy = &report.policy;
        let heading = self.style(Style::new().bold());
        let warn = self.style(Colour::Yellow.normal());
        let error = self.style(Colour::Red.normal());

        let mode = if policy.execute { "cleanup" } else { "dry run" };
        writeln!(
            f,
            "{}",
            heading.paint(format!("Trash sweep ({mode}), threshold {}", policy.age))
        )?;
        writeln!(f, "  users scanned:        {}", report.users_scanned())?;
        writeln!(f, "  users with trash:     {}", report.users_with_trash())?;
        writeln!(f, "  users with old trash: {}", report.users_with_matches())?;
        if policy.execute {
            writeln!(f, "  users cleaned:        {}", report.users_cleaned())?;
            writeln!(f, "  entries removed:      {}", report.removed())?;
            writeln!(f, "  trash size before:    {}", human::bytes(report.trash_before()))?;
            writeln!(f, "  trash size after:     {}", human::bytes(report.trash_after()))?;
        } else {
            writeln!(f, "  trash size:           {}", human::bytes(report.trash_before()))?;
            writeln!(
                f,
                "  reclaimable:          {} in {} entries",
                warn.paint(human::bytes(report.matched_bytes())),
                report.matched()
            )?;
        }

        let top_trash = report.top_trash();
        if !top_trash.is_empty() {
            writeln!(f)?;
            writeln!(f, "{}", heading.paint(format!("Top {} users by trash size", policy.top_n)))?;
            for (user, size) in top_trash {
                writeln!(f, "  {:>8}  {user}", human::bytes(size))?;
            }
        }

        if report.legacy_users() > 0 {
            writeln!(f)?;
            writeln!(f, "{}", heading.paint("Legacy trash (.trash.old)"))?;
            writeln!(f, "  users with legacy trash: {}", report.legacy_users())?;
            if policy.execute {
                writeln!(f, "  size before:             {}", human::bytes(report.legacy_before()))?;
                writeln!(f, "  size after:              {}", human::bytes(report.legacy_after()))?;
                writeln!(
                    f,
                    "  directories removed:     {}",
                    report.legacy_containers(Container::Removed)
                )?;
            } else {
                writeln!(f, "  size:                    {}", human::bytes(report.legacy_before()))?;
                writeln!(
                    f,
                    "  removable directories:   {} (empty, older than {})",
                    report.legacy_containers(Container::Removable),
                    report.legacy_grace
                )?;
            }
            for (user, size) in report.top_legacy() {
                writeln!(f, "  {:>8}  {user}", human::bytes(size))?;
            }
        }

        writeln!(f)?;
        if policy.execute {
            writeln!(
                f,
                "{} {} -> {}",
                heading.paint("Grand total:"),
                human::bytes(report.grand_before()),
                human::bytes(report.grand_after())
            )?;
        } else {
            writeln!(
                f,
                "{} {}",
                heading.paint("Grand total:"),
                human::bytes(report.grand_before())
            )?;
            writeln!(f, "{}", warn.paint("Dry run, nothing was deleted. Pass --do-it to clean up."))?;
        }

        let mut errors = report.errors().peekable();
        if errors.peek().is_some() {
            writeln!(f)?;
            writeln!(f, "{}", error.paint("Errors (retried on the next run)"))?;
            for (user, failure) in errors {
                writeln!(f, "  {user}: {}", failure.error)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::*;
    use crate::legacy::LegacySweep;

    fn name(name: &str) -> UserName {
        UserName::new(name).unwrap()
    }

    fn area(before: u64, after: u64, matched: u64, removed: u64) -> AreaSweep {
        AreaSweep {
            entries: matched + 1,
            before,
            after,
            matched,
            matched_bytes: before - after,
            removed,
            errors: Vec::new(),
        }
    }

    fn sample(execute: bool) -> SweepReport {
        let policy = SweepPolicy {
            execute,
            top_n: 2,
            ..SweepPolicy::default()
        };
        let users = vec![
            UserSweep {
                user: name("alice"),
                trash: Some(area(4096, 1024, 2, 2)),
                legacy: Some(LegacySweep {
                    path: PathBuf::from("/home/alice/.trash.old"),
                    area: area(2048, 0, 1, 1),
                    container: Container::Removed,
                }),
            },
            UserSweep {
                user: name("bob"),
                trash: None,
                legacy: None,
            },
            UserSweep {
                user: name("carol"),
                trash: Some(area(1024, 1024, 0, 0)),
                legacy: None,
            },
            UserSweep {
                user: name("dave"),
                trash: Some(area(8192, 8192, 0, 0)),
                legacy: None,
            },
        ];
        SweepReport::new(policy, Age::days(30), users)
    }

    #[test]
    fn smoketest_aggregates() {
        let report = sample(true);
        assert_eq!(report.users_scanned(), 4);
        assert_eq!(report.users_with_trash(), 3);
        assert_eq!(report.users_with_matches(), 1);
        assert_eq!(report.users_cleaned(), 1);
        assert_eq!(report.removed(), 3);
        assert_eq!(report.trash_before(), 4096 + 1024 + 8192);
        assert_eq!(report.trash_after(), 1024 + 1024 + 8192);
        assert_eq!(report.legacy_users(), 1);
        assert_eq!(report.grand_before(), 4096 + 1024 + 8192 + 2048);
        assert_eq!(report.grand_after(), 1024 + 1024 + 8192);
        assert_eq!(report.legacy_containers(Container::Removed), 1);
    }

    #[test]
    fn top_n_orders_by_size_then_name() {
        let report = sample(true);
        let top: Vec<_> = report
            .top_trash()
            .into_iter()
            .map(|(user, size)| (user.to_string(), size))
            .collect();
        assert_eq!(
            top,
            vec![("dave".to_string(), 8192), ("alice".to_string(), 1024)]
        );
        // Emptied legacy trash doesn't make the list.
        assert!(report.top_legacy().is_empty());
    }

    #[test]
    fn renders_without_color() {
        let rendered = sample(true).display(false).to_string();
        assert!(!rendered.contains('\u{1b}'), "{rendered}");
        assert!(rendered.contains("Trash sweep (cleanup), threshold 7d"));
        assert!(rendered.contains("users scanned:        4"));
        assert!(rendered.contains("entries removed:      3"));
        assert!(rendered.contains("Legacy trash (.trash.old)"));
        assert!(rendered.contains("Grand total: 15K -> 10K"), "{rendered}");

        let rendered = sample(false).display(false).to_string();
        assert!(rendered.contains("Trash sweep (dry run)"));
        assert!(rendered.contains("Pass --do-it"));
    }

    #[test]
    fn renders_with_color() {
        let rendered = sample(false).display(true).to_string();
        assert!(rendered.contains('\u{1b}'));
    }
}
