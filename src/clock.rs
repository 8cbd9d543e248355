//! Grid-time conversion.
//!
//! Grid ticks arrive as decimal `YYYYMMDDHHMMSS` integers and the
//! window math runs in Unix seconds, so the components are peeled off
//! by successive division and rebuilt through a UTC-only calendar.
//! Trade times arrive as nanoseconds since the epoch.

use chrono::{LocalResult, TimeZone, Utc};

/// Convert a `YYYYMMDDHHMMSS` grid time to Unix seconds (UTC).
///
/// Returns `None` when the components do not form a valid calendar
/// time; callers treat that as "leave the window untouched".
pub fn grid_to_unix_seconds(grid: u64) -> Option<u64> {
    let sec = (grid % 100) as u32;
    let min = ((grid / 100) % 100) as u32;
    let hour = ((grid / 10_000) % 100) as u32;
    let day = ((grid / 1_000_000) % 100) as u32;
    let month = ((grid / 100_000_000) % 100) as u32;
    let year = (grid / 10_000_000_000) as i32;

    match Utc.with_ymd_and_hms(year, month, day, hour, min, sec) {
        LocalResult::Single(dt) => u64::try_from(dt.timestamp()).ok(),
        _ => None,
    }
}

/// Truncate an epoch-nanosecond timestamp to whole seconds.
#[inline]
pub const fn ns_to_seconds(ns: u64) -> u64 {
    ns / 1_000_000_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_conversion() {
        // 2023-11-14 22:13:20 UTC is epoch second 1_700_000_000
        assert_eq!(grid_to_unix_seconds(20231114221320), Some(1_700_000_000));
        assert_eq!(grid_to_unix_seconds(20231114222322), Some(1_700_000_602));
        assert_eq!(grid_to_unix_seconds(19700101000000), Some(0));
    }

    #[test]
    fn test_invalid_grid_times() {
        assert_eq!(grid_to_unix_seconds(20231314000000), None); // month 13
        assert_eq!(grid_to_unix_seconds(20230230120000), None); // Feb 30
        assert_eq!(grid_to_unix_seconds(20231114246060), None); // hour 24
        assert_eq!(grid_to_unix_seconds(0), None);
    }

    #[test]
    fn test_ns_truncation() {
        assert_eq!(ns_to_seconds(1_700_000_000_999_999_999), 1_700_000_000);
        assert_eq!(ns_to_seconds(999_999_999), 0);
    }
}
