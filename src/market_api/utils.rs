use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};

use super::types::IntradaySample;

pub const WEEKDAYS_CH: [&str; 7] = ["一", "二", "三", "四", "五", "六", "日"];

/// Minimum samples a window needs before it is compared.
pub const MIN_WINDOW_SAMPLES: usize = 5;

/// Wall-clock constant. Call it only from `const` items so an out-of-range
/// literal fails the build instead of surfacing at runtime.
pub const fn clock(hour: u32, min: u32, sec: u32) -> NaiveTime {
    match NaiveTime::from_hms_opt(hour, min, sec) {
        Some(t) => t,
        None => panic!("wall-clock constant out of range"),
    }
}

pub fn weekday_label(date: NaiveDate) -> &'static str {
    WEEKDAYS_CH[date.weekday().num_days_from_monday() as usize]
}

pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{}': {}", s, e))
}

pub fn parse_time(s: &str) -> Result<NaiveTime, String> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|e| format!("Invalid time '{}': {}", s, e))
}

/// Accepts the timestamp layouts that show up in exported ATM tables.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    // fractional seconds
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok()
}

/// Samples of `date` whose wall-clock time lies in `[start, end]`.
pub fn window_samples(
    samples: &[IntradaySample],
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
) -> Vec<IntradaySample> {
    let start_dt = date.and_time(start);
    let end_dt = date.and_time(end);
    samples
        .iter()
        .filter(|s| s.timestamp >= start_dt && s.timestamp <= end_dt)
        .cloned()
        .collect()
}

/// `start`, `start + 1`, ... `day_count` calendar days.
pub fn consecutive_dates(start: NaiveDate, day_count: usize) -> Vec<NaiveDate> {
    start.iter_days().take(day_count).collect()
}

/// `1234567.4` -> `1,234,567`
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if negative {
        format!("-{}", out)
    } else {
        out
    }
}

/// Value with its signed change, e.g. `8,100 (+20)`.
pub fn format_with_change(value: Option<f64>, change: Option<f64>) -> String {
    match (value, change) {
        (None, _) => String::new(),
        (Some(v), None) => format_thousands(v),
        (Some(v), Some(c)) => format!("{} ({:+.0})", format_thousands(v), c),
    }
}

pub fn format_datetime_with_week(dt: NaiveDateTime) -> String {
    format!(
        "{} ({}) {}",
        dt.format("%Y-%m-%d"),
        weekday_label(dt.date()),
        dt.format("%H:%M")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(8100.0), "8,100");
        assert_eq!(format_thousands(1234567.4), "1,234,567");
        assert_eq!(format_thousands(-950.0), "-950");
        assert_eq!(format_thousands(0.2), "0");
    }

    #[test]
    fn test_format_with_change() {
        assert_eq!(format_with_change(Some(8100.0), Some(20.0)), "8,100 (+20)");
        assert_eq!(format_with_change(Some(8100.0), Some(-5.0)), "8,100 (-5)");
        assert_eq!(format_with_change(Some(8100.0), None), "8,100");
        assert_eq!(format_with_change(None, Some(3.0)), "");
    }

    #[test]
    fn test_parse_datetime_variants() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(9, 5, 0).unwrap();
        assert_eq!(parse_datetime("2024-03-01 09:05:00"), Some(expected));
        assert_eq!(parse_datetime("2024-03-01T09:05:00"), Some(expected));
        assert_eq!(parse_datetime("2024-03-01 09:05"), Some(expected));
        assert_eq!(parse_datetime("not a time"), None);
    }

    #[test]
    fn test_weekday_label_and_format() {
        // 2024-03-01 is a Friday
        let dt = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(9, 5, 0).unwrap();
        assert_eq!(weekday_label(dt.date()), "五");
        assert_eq!(format_datetime_with_week(dt), "2024-03-01 (五) 09:05");
    }

    #[test]
    fn test_consecutive_dates() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let days = consecutive_dates(start, 3);
        assert_eq!(days[2], NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(days.len(), 3);
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("09:00").unwrap(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(parse_time("13:45:30").unwrap(), NaiveTime::from_hms_opt(13, 45, 30).unwrap());
        assert!(parse_time("25:00").is_err());
    }
}
