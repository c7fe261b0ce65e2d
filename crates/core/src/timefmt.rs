//! Epoch-to-ISO8601 formatting with no dependency beyond the standard
//! library. The Watch Store stores timestamps as plain `TEXT` ISO strings,
//! not a chrono type, so every timestamp the pipeline stamps — artifact
//! timestamps and remote `pushed_at` values alike — goes through this
//! self-contained formatter/parser pair, adapted from
//! http://howardhinnant.github.io/date_algorithms.html. `scout-collab`
//! passes `pushed_at` through as a raw string; `parse_iso8601` below is
//! where it actually gets interpreted, during Tier-1 recency scoring.

pub fn epoch_to_iso8601(epoch_secs: i64) -> String {
    let days = epoch_secs.div_euclid(86400);
    let rem = epoch_secs.rem_euclid(86400);
    let hours = rem / 3600;
    let mins = (rem % 3600) / 60;
    let secs = rem % 60;
    let (year, month, day) = days_to_ymd(days);
    format!("{year:04}-{month:02}-{day:02}T{hours:02}:{mins:02}:{secs:02}Z")
}

pub fn epoch_to_date(epoch_secs: i64) -> String {
    let days = epoch_secs.div_euclid(86400);
    let (year, month, day) = days_to_ymd(days);
    format!("{year:04}-{month:02}-{day:02}")
}

fn days_to_ymd(mut days: i64) -> (i64, i64, i64) {
    days += 719468;
    let era = if days >= 0 { days } else { days - 146096 } / 146097;
    let doe = days - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}

/// Days between two ISO8601 timestamps (`to` minus `from`), used by Tier-1
/// recency scoring. Falls back to `0` on unparsable input rather than
/// erroring — scoring is best-effort over remote metadata.
pub fn days_since(pushed_at_iso8601: &str, now_epoch_secs: i64) -> f64 {
    match parse_iso8601(pushed_at_iso8601) {
        Some(epoch) => ((now_epoch_secs - epoch).max(0) as f64) / 86400.0,
        None => 0.0,
    }
}

/// Minimal ISO8601 `YYYY-MM-DDTHH:MM:SSZ` parser — the only shape remote
/// APIs in this domain emit for `pushed_at`.
pub fn parse_iso8601(s: &str) -> Option<i64> {
    let s = s.trim();
    let bytes = s.as_bytes();
    if bytes.len() < 19 {
        return None;
    }
    let year: i64 = s.get(0..4)?.parse().ok()?;
    let month: i64 = s.get(5..7)?.parse().ok()?;
    let day: i64 = s.get(8..10)?.parse().ok()?;
    let hour: i64 = s.get(11..13)?.parse().ok()?;
    let min: i64 = s.get(14..16)?.parse().ok()?;
    let sec: i64 = s.get(17..19)?.parse().ok()?;

    let days = ymd_to_days(year, month, day);
    Some(days * 86400 + hour * 3600 + min * 60 + sec)
}

fn ymd_to_days(y: i64, m: i64, d: i64) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = if m > 2 { m - 3 } else { m + 9 };
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe - 719468
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_epoch_date() {
        let s = epoch_to_iso8601(1_700_000_000);
        let parsed = parse_iso8601(&s).unwrap();
        assert_eq!(parsed, 1_700_000_000);
    }

    #[test]
    fn days_since_is_nonnegative_and_zero_for_now() {
        let now = 1_700_000_000;
        let s = epoch_to_iso8601(now);
        assert_eq!(days_since(&s, now), 0.0);
        assert!(days_since(&s, now + 86400 * 10) > 9.9);
    }

    #[test]
    fn unparsable_timestamp_yields_zero_days() {
        assert_eq!(days_since("not-a-date", 1_700_000_000), 0.0);
    }
}
