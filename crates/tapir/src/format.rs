//! Time and duration formatting for console output

use chrono::{DateTime, SecondsFormat, Utc};
use tapir_protocol::TIME_LAYOUT;

/// Format whole seconds as `1h2m3s`, `4m0s` or `12s`
pub fn format_duration(secs: i64) -> String {
    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.unsigned_abs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);

    if h > 0 {
        format!("{sign}{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{sign}{m}m{s}s")
    } else {
        format!("{sign}{s}s")
    }
}

/// Time elapsed from `since` to `now`, rounded to seconds
pub fn format_since(since: DateTime<Utc>, now: DateTime<Utc>) -> String {
    format_duration((now - since).num_seconds())
}

/// `2024-05-01 12:00:00`
pub fn format_time(t: &DateTime<Utc>) -> String {
    t.format(TIME_LAYOUT).to_string()
}

/// `2024-05-01T12:00:00Z`
pub fn format_rfc3339(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Render a list the way the daemons log them: `[a b c]`
pub fn format_list<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let items: Vec<String> = items.into_iter().map(|s| s.as_ref().to_string()).collect();
    format!("[{}]", items.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(60), "1m0s");
        assert_eq!(format_duration(3723), "1h2m3s");
        assert_eq!(format_duration(90_000), "25h0m0s");
        assert_eq!(format_duration(-75), "-1m15s");
    }

    #[test]
    fn test_format_since() {
        let boot = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 30).unwrap();
        assert_eq!(format_since(boot, now), "1h0m30s");
    }

    #[test]
    fn test_time_layouts() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 8, 9, 10).unwrap();
        assert_eq!(format_time(&t), "2024-05-01 08:09:10");
        assert_eq!(format_rfc3339(&t), "2024-05-01T08:09:10Z");
    }

    #[test]
    fn test_format_list() {
        assert_eq!(format_list(["a.", "b."]), "[a. b.]");
        assert_eq!(format_list(Vec::<String>::new()), "[]");
    }
}
