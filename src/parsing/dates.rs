//! Date expression resolution and per-category window expansion.
//!
//! Every function here takes the reference instant explicitly. Nothing in
//! this module reads the system clock, so resolution is deterministic for a
//! given `now`.

use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use regex::Regex;

use crate::models::{DateWindow, LeaveCategory};

const WEEKDAY_NAMES: [(&str, Weekday); 8] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
    ("weekend", Weekday::Sat),
];

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{2}|\d{4})$").expect("numeric date regex is valid")
});

static DAY_MONTH_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,2})(?:st|nd|rd|th)?\s+([a-z]{3,9})\.?,?(?:\s+(\d{2}|\d{4}))?$")
        .expect("day-month date regex is valid")
});

static MONTH_DAY_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?(?:\s+(\d{2}|\d{4}))?$")
        .expect("month-day date regex is valid")
});

/// The time-of-day template imposed on a category's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeTemplate {
    /// Start time on the base date.
    pub start: NaiveTime,
    /// End time.
    pub end: NaiveTime,
    /// Days after the base date on which a single-date window ends.
    pub end_day_offset: i64,
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// Returns the canonical time template for `category`.
///
/// | Category | Start | End |
/// |---|---|---|
/// | Overnight | 14:00 | next day 18:50 |
/// | FridaySupper | 17:00 | 21:00 |
/// | DayLeave, Special | 09:00 | 17:00 |
pub fn template_for(category: LeaveCategory) -> TimeTemplate {
    match category {
        LeaveCategory::Overnight => TimeTemplate {
            start: hm(14, 0),
            end: hm(18, 50),
            end_day_offset: 1,
        },
        LeaveCategory::FridaySupper => TimeTemplate {
            start: hm(17, 0),
            end: hm(21, 0),
            end_day_offset: 0,
        },
        LeaveCategory::DayLeave | LeaveCategory::Special => TimeTemplate {
            start: hm(9, 0),
            end: hm(17, 0),
            end_day_offset: 0,
        },
    }
}

/// Resolves a relative expression against `now`.
///
/// Understands `today`, `tomorrow` and weekday names (with `weekend`
/// meaning Saturday), optionally qualified by `this` or `next`. A bare or
/// `this` weekday is the soonest occurrence on or after today, so asking
/// for "this thursday" on a Thursday yields today. `next` adds a further
/// seven days.
///
/// # Example
///
/// ```
/// use exeat_engine::parsing::dates::resolve_relative;
/// use chrono::{NaiveDate, NaiveDateTime};
///
/// // 2025-02-06 is a Thursday
/// let now = NaiveDateTime::parse_from_str("2025-02-06 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
/// assert_eq!(resolve_relative("this Saturday", now), NaiveDate::from_ymd_opt(2025, 2, 8));
/// assert_eq!(resolve_relative("next saturday", now), NaiveDate::from_ymd_opt(2025, 2, 15));
/// assert_eq!(resolve_relative("tomorrow", now), NaiveDate::from_ymd_opt(2025, 2, 7));
/// ```
pub fn resolve_relative(expression: &str, now: NaiveDateTime) -> Option<NaiveDate> {
    let lowered = expression.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|word| !word.is_empty())
        .collect();
    let today = now.date();

    if words.contains(&"today") {
        return Some(today);
    }
    if words.contains(&"tomorrow") {
        return today.succ_opt();
    }

    let target = words.iter().find_map(|word| {
        WEEKDAY_NAMES
            .iter()
            .find(|(name, _)| name == word)
            .map(|(_, weekday)| *weekday)
    })?;

    let soonest = (i64::from(target.num_days_from_monday())
        - i64::from(today.weekday().num_days_from_monday()))
    .rem_euclid(7);
    let offset = if words.contains(&"next") {
        soonest + 7
    } else {
        soonest
    };
    today.checked_add_signed(Duration::days(offset))
}

/// Resolves an absolute date written in one of the accepted forms.
///
/// Forms are tried in a fixed order and the first that parses wins:
/// numeric `d/m/y` or `d-m-y` (two-digit years are in the 2000s), then
/// `15 February 2025` / `15th Feb`, then `February 15, 2025`. A month-name
/// date without a year takes `default_year`.
///
/// # Example
///
/// ```
/// use exeat_engine::parsing::dates::resolve_absolute;
/// use chrono::NaiveDate;
///
/// assert_eq!(resolve_absolute("15/02/2025", 2025), NaiveDate::from_ymd_opt(2025, 2, 15));
/// assert_eq!(resolve_absolute("15th Feb", 2025), NaiveDate::from_ymd_opt(2025, 2, 15));
/// assert_eq!(resolve_absolute("31/02/2025", 2025), None);
/// ```
pub fn resolve_absolute(text: &str, default_year: i32) -> Option<NaiveDate> {
    let text = text.trim();

    if let Some(caps) = NUMERIC_DATE.captures(text) {
        let day = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let year = parse_year(&caps[3])?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = DAY_MONTH_DATE.captures(text) {
        let day = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        let year = match caps.get(3) {
            Some(year) => parse_year(year.as_str())?,
            None => default_year,
        };
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = MONTH_DAY_DATE.captures(text) {
        let month = month_number(&caps[1])?;
        let day = caps[2].parse().ok()?;
        let year = match caps.get(3) {
            Some(year) => parse_year(year.as_str())?,
            None => default_year,
        };
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    None
}

/// Resolves any supported expression, trying relative forms first.
pub fn resolve(expression: &str, now: NaiveDateTime) -> Option<NaiveDate> {
    resolve_relative(expression, now).or_else(|| resolve_absolute(expression, now.year()))
}

/// Expands a base date into the category's canonical window.
///
/// # Example
///
/// ```
/// use exeat_engine::models::LeaveCategory;
/// use exeat_engine::parsing::dates::expand_window;
/// use chrono::NaiveDate;
///
/// let saturday = NaiveDate::from_ymd_opt(2025, 2, 8).unwrap();
/// let window = expand_window(saturday, LeaveCategory::Overnight);
/// assert_eq!(window.start.to_string(), "2025-02-08 14:00:00");
/// assert_eq!(window.end.to_string(), "2025-02-09 18:50:00");
/// ```
pub fn expand_window(date: NaiveDate, category: LeaveCategory) -> DateWindow {
    let template = template_for(category);
    let end_date = date
        .checked_add_signed(Duration::days(template.end_day_offset))
        .unwrap_or(date);
    // Every template ends after it starts, so the invariant holds.
    DateWindow {
        start: date.and_time(template.start),
        end: end_date.and_time(template.end),
    }
}

/// Expands an explicit two-date range using the category's times.
///
/// The start time lands on `start_date` and the end time on `end_date`.
/// Returns `None` when the result would not end after it starts.
pub fn expand_range(
    start_date: NaiveDate,
    end_date: NaiveDate,
    category: LeaveCategory,
) -> Option<DateWindow> {
    let template = template_for(category);
    DateWindow::new(
        start_date.and_time(template.start),
        end_date.and_time(template.end),
    )
    .ok()
}

fn parse_year(digits: &str) -> Option<i32> {
    let value: i32 = digits.parse().ok()?;
    match digits.len() {
        2 => Some(2000 + value),
        4 => Some(value),
        _ => None,
    }
}

fn month_number(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    if name.len() < 3 {
        return None;
    }
    MONTH_NAMES
        .iter()
        .position(|month| month.starts_with(&name))
        .and_then(|index| u32::try_from(index + 1).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_datetime(date_str: &str, time_str: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{} {}", date_str, time_str), "%Y-%m-%d %H:%M:%S")
            .unwrap()
    }

    fn make_date(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
    }

    /// Thursday 2025-02-06, mid-morning.
    fn thursday() -> NaiveDateTime {
        make_datetime("2025-02-06", "10:00:00")
    }

    // ==========================================================================
    // DR-001: today and tomorrow resolve against the reference instant
    // ==========================================================================
    #[test]
    fn test_dr_001_today_and_tomorrow() {
        assert_eq!(resolve_relative("today", thursday()), Some(make_date("2025-02-06")));
        assert_eq!(
            resolve_relative("Tomorrow", thursday()),
            Some(make_date("2025-02-07"))
        );
    }

    // ==========================================================================
    // DR-002: this/bare weekday is the soonest occurrence
    // ==========================================================================
    #[test]
    fn test_dr_002_this_weekday_is_soonest() {
        assert_eq!(
            resolve_relative("this saturday", thursday()),
            Some(make_date("2025-02-08"))
        );
        assert_eq!(resolve_relative("sunday", thursday()), Some(make_date("2025-02-09")));
        assert_eq!(
            resolve_relative("wednesday", thursday()),
            Some(make_date("2025-02-12"))
        );
    }

    // ==========================================================================
    // DR-003: naming today's weekday yields today, not a week later
    // ==========================================================================
    #[test]
    fn test_dr_003_same_weekday_is_day_zero() {
        assert_eq!(
            resolve_relative("this thursday", thursday()),
            Some(make_date("2025-02-06"))
        );
    }

    // ==========================================================================
    // DR-004: next adds seven days to the soonest occurrence
    // ==========================================================================
    #[test]
    fn test_dr_004_next_adds_a_week() {
        assert_eq!(
            resolve_relative("next saturday", thursday()),
            Some(make_date("2025-02-15"))
        );
        assert_eq!(
            resolve_relative("next thursday", thursday()),
            Some(make_date("2025-02-13"))
        );
    }

    // ==========================================================================
    // DR-005: weekend means Saturday
    // ==========================================================================
    #[test]
    fn test_dr_005_weekend_is_saturday() {
        assert_eq!(
            resolve_relative("this weekend", thursday()),
            Some(make_date("2025-02-08"))
        );
        assert_eq!(
            resolve_relative("next weekend", thursday()),
            Some(make_date("2025-02-15"))
        );
    }

    #[test]
    fn test_unknown_relative_expression() {
        assert_eq!(resolve_relative("yesterday", thursday()), None);
        assert_eq!(resolve_relative("", thursday()), None);
    }

    // ==========================================================================
    // DR-006: numeric dates with either separator and two-digit years
    // ==========================================================================
    #[test]
    fn test_dr_006_numeric_dates() {
        let expected = Some(make_date("2025-02-15"));
        assert_eq!(resolve_absolute("15/02/2025", 2024), expected);
        assert_eq!(resolve_absolute("15-02-2025", 2024), expected);
        assert_eq!(resolve_absolute("15/2/25", 2024), expected);
        assert_eq!(resolve_absolute("15-02-25", 2024), expected);
    }

    // ==========================================================================
    // DR-007: impossible numeric dates do not resolve
    // ==========================================================================
    #[test]
    fn test_dr_007_invalid_numeric_dates() {
        assert_eq!(resolve_absolute("31/02/2025", 2025), None);
        assert_eq!(resolve_absolute("15/13/2025", 2025), None);
        assert_eq!(resolve_absolute("15/02/202", 2025), None);
    }

    // ==========================================================================
    // DR-008: month-name forms
    // ==========================================================================
    #[test]
    fn test_dr_008_month_name_dates() {
        let expected = Some(make_date("2025-02-15"));
        assert_eq!(resolve_absolute("15 February 2025", 2024), expected);
        assert_eq!(resolve_absolute("15 feb 2025", 2024), expected);
        assert_eq!(resolve_absolute("15th Feb", 2025), expected);
        assert_eq!(resolve_absolute("February 15, 2025", 2024), expected);
        assert_eq!(resolve_absolute("15 Sept 2025", 2024), Some(make_date("2025-09-15")));
    }

    #[test]
    fn test_unknown_month_name() {
        assert_eq!(resolve_absolute("15 Febtober 2025", 2025), None);
        assert_eq!(resolve_absolute("15 fe 2025", 2025), None);
    }

    #[test]
    fn test_resolve_prefers_relative_then_absolute() {
        assert_eq!(resolve("this saturday", thursday()), Some(make_date("2025-02-08")));
        assert_eq!(resolve("22 March", thursday()), Some(make_date("2025-03-22")));
        assert_eq!(resolve("whenever", thursday()), None);
    }

    // ==========================================================================
    // DR-009: category templates
    // ==========================================================================
    #[test]
    fn test_dr_009_overnight_template() {
        let window = expand_window(make_date("2025-02-08"), LeaveCategory::Overnight);
        assert_eq!(window.start, make_datetime("2025-02-08", "14:00:00"));
        assert_eq!(window.end, make_datetime("2025-02-09", "18:50:00"));
    }

    #[test]
    fn test_friday_supper_template() {
        let window = expand_window(make_date("2025-02-07"), LeaveCategory::FridaySupper);
        assert_eq!(window.start, make_datetime("2025-02-07", "17:00:00"));
        assert_eq!(window.end, make_datetime("2025-02-07", "21:00:00"));
    }

    #[test]
    fn test_day_leave_and_special_templates() {
        for category in [LeaveCategory::DayLeave, LeaveCategory::Special] {
            let window = expand_window(make_date("2025-02-09"), category);
            assert_eq!(window.start, make_datetime("2025-02-09", "09:00:00"));
            assert_eq!(window.end, make_datetime("2025-02-09", "17:00:00"));
        }
    }

    #[test]
    fn test_overnight_template_applies_on_any_weekday() {
        let window = expand_window(make_date("2025-02-11"), LeaveCategory::Overnight);
        assert_eq!(window.start, make_datetime("2025-02-11", "14:00:00"));
        assert_eq!(window.end, make_datetime("2025-02-12", "18:50:00"));
    }

    // ==========================================================================
    // DR-010: ranges take category times on each endpoint
    // ==========================================================================
    #[test]
    fn test_dr_010_range_uses_category_times() {
        let window = expand_range(
            make_date("2025-02-08"),
            make_date("2025-02-10"),
            LeaveCategory::Overnight,
        )
        .unwrap();
        assert_eq!(window.start, make_datetime("2025-02-08", "14:00:00"));
        assert_eq!(window.end, make_datetime("2025-02-10", "18:50:00"));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        assert!(
            expand_range(
                make_date("2025-02-10"),
                make_date("2025-02-08"),
                LeaveCategory::DayLeave
            )
            .is_none()
        );
    }
}
