//! Date input parsing and formatting.
//!
//! Task dates are stored as UTC instants. Users mostly type days, so bare dates and
//! relative phrases resolve to midnight UTC of that day.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

/// Parse human-readable date input relative to `today`.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "monday".."sunday" (and short forms), "next friday", "this friday"
/// - "end of week" / "eow", "end of month" / "eom"
/// - "in 3d", "in 2w", "in 1m"
/// - "YYYY-MM-DD"
pub fn parse_date_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        "end of week" | "eow" => {
            let (_, end) = start_end_of_week(today);
            return Some(end);
        }
        "end of month" | "eom" => {
            let (year, month) = (today.year(), today.month());
            let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
            let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
            return Some(first_of_next - Duration::days(1));
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        let rest = rest.trim();
        let (num, unit) = rest.split_at(rest.len().saturating_sub(1));
        if let Ok(n) = num.trim().parse::<i64>() {
            match unit {
                "d" => return Some(today + Duration::days(n)),
                "w" => return Some(today + Duration::weeks(n)),
                // Approximate: 30 days per month
                "m" => return Some(today + Duration::days(n * 30)),
                _ => {}
            }
        }
    }

    let weekdays = [
        ("monday", 0), ("tuesday", 1), ("wednesday", 2), ("thursday", 3),
        ("friday", 4), ("saturday", 5), ("sunday", 6),
        ("mon", 0), ("tue", 1), ("wed", 2), ("thu", 3),
        ("fri", 4), ("sat", 5), ("sun", 6),
    ];
    let (next, bare) = match s.strip_prefix("next ") {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix("this ").unwrap_or(&s)),
    };
    if let Some(&(_, target)) = weekdays.iter().find(|(name, _)| *name == bare) {
        let current = today.weekday().num_days_from_monday() as i64;
        let ahead = (target + 7 - current) % 7;
        let days = if next { ahead + 7 } else { ahead };
        return Some(today + Duration::days(days));
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Parse an RFC 3339 timestamp, or any day accepted by [`parse_date_input`] as
/// midnight UTC.
pub fn parse_instant(s: &str, today: NaiveDate) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s.trim()) {
        return Some(dt.with_timezone(&Utc));
    }
    parse_date_input(s, today).map(start_of_day)
}

/// Midnight UTC at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
}

/// Monday and Sunday of the ISO week containing `today`.
pub fn start_end_of_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let weekday = today.weekday().num_days_from_monday() as i64;
    let start = today - Duration::days(weekday);
    (start, start + Duration::days(6))
}

/// Whole days spanned by `d`, rounded up.
pub fn ceil_days(d: Duration) -> i64 {
    (d.num_milliseconds() as f64 / 86_400_000.0).ceil() as i64
}

/// `YYYY-MM-DD` of an instant.
pub fn format_day(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d").to_string()
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
