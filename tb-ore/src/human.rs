//! Human readable formatting, in the style of `du -h`.

/// Formats a byte count using binary units with at most one decimal, e.g. `4.0K`,
/// `1.5G`, or `512B`.
pub fn bytes(count: u64) -> String {
    const UNITS: &[&str] = &["K", "M", "G", "T", "P", "E"];

    if count < 1024 {
        return format!("{count}B");
    }

    // Integer arithmetic with tenths to avoid surprising float rounding.
    let mut tenths = u128::from(count) * 10;
    let mut unit = 0;
    tenths /= 1024;
    while tenths >= 10_240 && unit + 1 < UNITS.len() {
        tenths /= 1024;
        unit += 1;
    }

    if tenths >= 100 {
        format!("{}{}", (tenths + 5) / 10, UNITS[unit])
    } else {
        format!("{}.{}{}", tenths / 10, tenths % 10, UNITS[unit])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn smoketest_bytes() {
        assert_eq!(bytes(0), "0B");
        assert_eq!(bytes(1023), "1023B");
        assert_eq!(bytes(1024), "1.0K");
        assert_eq!(bytes(1536), "1.5K");
        assert_eq!(bytes(4096), "4.0K");
        assert_eq!(bytes(10 * 1024), "10K");
        assert_eq!(bytes(3 * 1024 * 1024 * 1024 / 2), "1.5G");
    }
}
