//! Types used throughout `tb`.
//!
//! The goal of this crate is to be very lightweight, so take care with adding dependencies.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDateTime, Utc};
use compact_str::CompactString;

/// `strftime` format of a [`TimestampKey`], always rendered in UTC.
static TIMESTAMP_KEY_FORMAT: &str = "%Y-%m-%d_%H-%M-%S%.9f";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("'{0}' is not a trash timestamp key")]
    TimestampKey(String),
    #[error("invalid age '{0}', expected <N><unit> where unit is one of m, h, d (e.g. 7d)")]
    Age(String),
    #[error("invalid placement mode '{0}', expected 'centralized' or 'local'")]
    PlacementMode(String),
    #[error("invalid user name '{0}'")]
    UserName(String),
}

/// Name of the directory holding a single deletion event inside a trash root.
///
/// Keys have nanosecond resolution and render as `YYYY-MM-DD_HH-MM-SS.NNNNNNNNN` in UTC,
/// so sorting the names lexicographically sorts them by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimestampKey {
    instant: DateTime<Utc>,
}

impl TimestampKey {
    pub fn new(instant: DateTime<Utc>) -> Self {
        TimestampKey { instant }
    }

    /// Parses a directory name, returning `None` if it isn't a well formed key.
    ///
    /// Only the canonical rendering is accepted, e.g. a name with 6 fractional digits is
    /// not a key even though it describes a valid instant.
    pub fn from_name(name: &str) -> Option<Self> {
        let naive = NaiveDateTime::parse_from_str(name, TIMESTAMP_KEY_FORMAT).ok()?;
        let key = TimestampKey::new(naive.and_utc());
        (key.to_string() == name).then_some(key)
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }
}

impl From<u128> for TimestampKey {
    fn from(nanos_since_epoch: u128) -> Self {
        let secs = i64::try_from(nanos_since_epoch / 1_000_000_000).unwrap_or(i64::MAX);
        let nanos = u32::try_from(nanos_since_epoch % 1_000_000_000).unwrap_or(0);
        let instant = DateTime::<Utc>::from_timestamp(secs, nanos).unwrap_or_default();
        TimestampKey { instant }
    }
}

impl FromStr for TimestampKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimestampKey::from_name(s).ok_or_else(|| ParseError::TimestampKey(s.to_string()))
    }
}

impl fmt::Display for TimestampKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.instant.format(TIMESTAMP_KEY_FORMAT))
    }
}

/// Unit of an [`Age`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeUnit {
    Minutes,
    Hours,
    Days,
}

impl AgeUnit {
    fn secs(self) -> u64 {
        match self {
            AgeUnit::Minutes => 60,
            AgeUnit::Hours => 60 * 60,
            AgeUnit::Days => 24 * 60 * 60,
        }
    }

    fn suffix(self) -> char {
        match self {
            AgeUnit::Minutes => 'm',
            AgeUnit::Hours => 'h',
            AgeUnit::Days => 'd',
        }
    }
}

/// A retention threshold, e.g. `7d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Age {
    amount: u64,
    unit: AgeUnit,
}

impl Age {
    pub const fn new(amount: u64, unit: AgeUnit) -> Self {
        Age { amount, unit }
    }

    pub const fn days(amount: u64) -> Self {
        Age::new(amount, AgeUnit::Days)
    }

    /// Length of the threshold in whole seconds, saturating on overflow.
    pub fn as_secs(&self) -> u64 {
        self.amount.saturating_mul(self.unit.secs())
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.as_secs())
    }

    /// Returns true if something last modified at `mtime` is at least this old at `now`.
    ///
    /// Both instants are truncated to whole seconds so an entry sitting exactly on the
    /// boundary is classified the same way on every run. Modification times in the
    /// future are never old enough.
    pub fn is_exceeded(&self, mtime: SystemTime, now: SystemTime) -> bool {
        let secs = |t: SystemTime| t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).ok();
        match (secs(mtime), secs(now)) {
            (Some(mtime), Some(now)) if now >= mtime => now - mtime >= self.as_secs(),
            // Anything before the epoch is ancient.
            (None, Some(_)) => true,
            _ => false,
        }
    }
}

impl Default for Age {
    fn default() -> Self {
        Age::days(7)
    }
}

impl FromStr for Age {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseError::Age(s.to_string());

        let trimmed = s.trim();
        let split = trimmed
            .char_indices()
            .last()
            .map(|(idx, _)| idx)
            .ok_or_else(err)?;
        let (amount, unit) = trimmed.split_at(split);
        let unit = match unit {
            "m" => AgeUnit::Minutes,
            "h" => AgeUnit::Hours,
            "d" => AgeUnit::Days,
            _ => return Err(err()),
        };
        if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let amount: u64 = amount.parse().map_err(|_| err())?;

        Ok(Age { amount, unit })
    }
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}

/// Where trash roots live on a host, decided once at deployment time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementMode {
    /// One directory per user under a shared large-capacity area, aliased from the home
    /// directory by a symlink.
    Centralized,
    /// A plain directory inside each home directory.
    Local,
}

impl FromStr for PlacementMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "centralized" | "centralised" => Ok(PlacementMode::Centralized),
            "local" => Ok(PlacementMode::Local),
            _ => Err(ParseError::PlacementMode(s.to_string())),
        }
    }
}

impl fmt::Display for PlacementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementMode::Centralized => write!(f, "centralized"),
            PlacementMode::Local => write!(f, "local"),
        }
    }
}

/// Login name of a user, safe to use as a single path component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserName(CompactString);

impl UserName {
    pub fn new(name: &str) -> Result<Self, ParseError> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains('/')
            && !name.contains('\0');
        if valid {
            Ok(UserName(CompactString::new(name)))
        } else {
            Err(ParseError::UserName(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for UserName {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserName::new(s)
    }
}

impl AsRef<str> for UserName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<std::path::Path> for UserName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(self.as_str())
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn smoketest_timestamp_key() {
        let key = TimestampKey::from(1_700_000_000_123_456_789u128);
        assert_eq!(key.to_string(), "2023-11-14_22-13-20.123456789");
        assert_eq!(TimestampKey::from_name(&key.to_string()), Some(key));

        // Sub-second zeroes are still rendered.
        let key = TimestampKey::from(1_700_000_000_000_000_000u128);
        assert_eq!(key.to_string(), "2023-11-14_22-13-20.000000000");
    }

    #[test]
    fn timestamp_key_rejects_non_canonical() {
        assert!(TimestampKey::from_name("notes.txt").is_none());
        assert!(TimestampKey::from_name("2023-11-14_22-13-20").is_none());
        assert!(TimestampKey::from_name("2023-11-14_22-13-20.123456").is_none());
        assert!(TimestampKey::from_name("2023-11-14 22:13:20.123456789").is_none());
        assert!(".tb-partial-1234".parse::<TimestampKey>().is_err());
    }

    #[test]
    fn timestamp_keys_sort_chronologically() {
        let a = TimestampKey::from(1_699_999_999_999_999_999u128).to_string();
        let b = TimestampKey::from(1_700_000_000_000_000_000u128).to_string();
        let c = TimestampKey::from(1_700_000_000_000_000_001u128).to_string();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn smoketest_age() {
        assert_eq!("7d".parse::<Age>().unwrap(), Age::days(7));
        assert_eq!("30m".parse::<Age>().unwrap().as_secs(), 30 * 60);
        assert_eq!("1h".parse::<Age>().unwrap().as_secs(), 3600);
        assert_eq!(Age::default().to_string(), "7d");

        for bad in ["", "d", "7", "7w", "-1d", "1.5h", "seven d"] {
            assert!(bad.parse::<Age>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn age_boundary_is_stable() {
        let now = UNIX_EPOCH + Duration::from_secs(10_000_000);
        let age = Age::days(7);
        let exactly = now - age.as_duration();
        let just_younger = exactly + Duration::from_secs(1);

        for _ in 0..3 {
            assert!(age.is_exceeded(exactly, now));
            // Sub-second noise doesn't flip the result.
            assert!(age.is_exceeded(exactly + Duration::from_millis(999), now));
            assert!(!age.is_exceeded(just_younger, now));
        }

        // Timestamps in the future are never old.
        assert!(!age.is_exceeded(now + Duration::from_secs(60), now));
    }

    #[test]
    fn smoketest_placement_mode() {
        assert_eq!(
            "Centralized".parse::<PlacementMode>().unwrap(),
            PlacementMode::Centralized
        );
        assert_eq!("local".parse::<PlacementMode>().unwrap(), PlacementMode::Local);
        assert!("shared".parse::<PlacementMode>().is_err());
    }

    #[test]
    fn smoketest_user_name() {
        assert_eq!(UserName::new("alice").unwrap().as_str(), "alice");
        for bad in ["", ".", "..", "a/b"] {
            assert!(UserName::new(bad).is_err());
        }
    }
}
