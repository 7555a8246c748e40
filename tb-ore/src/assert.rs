//! Utilities for `assert!`s.

/// Asserts that the provided expression, that returns an `Option`, is `None`.
#[macro_export]
macro_rules! assert_none {
    ($val:expr, $($msg:tt)+) => {{
        if let Some(y) = &$val {
            panic!("assertion failed: expected None found Some({y:?}), {}", format!($($msg)+));
        }
    }};
    ($val:expr) => {{
        if let Some(y) = &$val {
            panic!("assertion failed: expected None found Some({y:?})");
        }
    }}
}

/// Asserts that a path exists on disk, without following a trailing symlink.
#[macro_export]
macro_rules! assert_exists {
    ($path:expr) => {{
        match &$path {
            path => {
                let path: &::std::path::Path = ::std::convert::AsRef::as_ref(path);
                if let Err(err) = ::std::fs::symlink_metadata(path) {
                    panic!("assertion failed: expected {path:?} to exist, {err}");
                }
            }
        }
    }};
}

/// Asserts that nothing exists at a path, not even a dangling symlink.
#[macro_export]
macro_rules! assert_missing {
    ($path:expr) => {{
        match &$path {
            path => {
                let path: &::std::path::Path = ::std::convert::AsRef::as_ref(path);
                if ::std::fs::symlink_metadata(path).is_ok() {
                    panic!("assertion failed: expected {path:?} to be missing");
                }
            }
        }
    }};
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    #[test]
    fn path_asserts_accept_temporaries() {
        let dir = std::env::temp_dir();
        assert_exists!(dir.join("."));
        assert_exists!(dir);
        assert_missing!(dir.join("tb-ore-surely-not-here").join("nested"));
        assert_missing!(PathBuf::from("/tb-ore-surely-not-here"));
        // Named paths are borrowed, not moved.
        assert_exists!(dir);
    }

    #[test]
    #[should_panic(expected = "to be missing")]
    fn missing_panics_on_existing() {
        assert_missing!(std::env::temp_dir().join("."));
    }
}
