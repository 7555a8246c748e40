//! Utilities for reading environment variables.

use std::ffi::OsStr;
use std::path::PathBuf;

/// Returns true if the environment variable is set, and is _not_ one of the following:
/// `'0', '', 'no', 'false', 'off'`.
pub fn is_truthy<K: AsRef<OsStr>>(var: K) -> bool {
    static FALSEY: &[&str] = &["0", "", "no", "false", "off"];

    let Some(mut value) = std::env::var_os(var) else {
        return false;
    };

    value.make_ascii_lowercase();
    !FALSEY.iter().any(|falsey| value == *falsey)
}

/// Returns the environment variable as a path, if it's set and non-empty.
pub fn path_var<K: AsRef<OsStr>>(var: K) -> Option<PathBuf> {
    let value = std::env::var_os(var)?;
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unset_is_not_truthy() {
        assert!(!is_truthy("TB_ORE_TEST_DEFINITELY_UNSET"));
        assert!(path_var("TB_ORE_TEST_DEFINITELY_UNSET").is_none());
    }
}
