//! Free-text leave request extraction.
//!
//! Each extraction step is an ordered table evaluated top to bottom; the
//! first entry that produces a value wins. The order of every table is
//! policy and must not be rearranged.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::dates;
use crate::models::{DateWindow, LeaveCategory};

/// The structured fields pulled out of a guardian's message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedRequest {
    /// Admin number or name fragment identifying the student.
    pub subject_identifier: Option<String>,
    /// Detected category.
    pub category: LeaveCategory,
    /// Resolved window, if any date was found.
    pub window: Option<DateWindow>,
    /// The message as received.
    pub raw_text: String,
}

/// One entry of the identifier table.
pub struct IdentifierPattern {
    /// Short label used in logs and tests.
    pub name: &'static str,
    regex: Regex,
}

impl IdentifierPattern {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).expect("invalid identifier pattern"),
        }
    }

    /// First capture of this pattern in `text`.
    pub fn extract(&self, text: &str) -> Option<String> {
        self.regex
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

static IDENTIFIER_PATTERNS: LazyLock<Vec<IdentifierPattern>> = LazyLock::new(|| {
    vec![
        IdentifierPattern::new("admin_number", r"\b(\d{5})\b"),
        IdentifierPattern::new(
            "for_full_name",
            r"\b(?i:for)\s+([A-Z][a-z]+\s+[A-Z][a-z]+)\b",
        ),
        IdentifierPattern::new("full_name", r"\b([A-Z][a-z]+\s+[A-Z][a-z]+)\b"),
        IdentifierPattern::new(
            "first_name",
            r"\b(?i:for|my son|student)\s+([A-Z][a-z]+)\b",
        ),
    ]
});

/// One entry of the category table: any keyword present selects `category`.
pub struct CategoryRule {
    /// Short label used in logs and tests.
    pub name: &'static str,
    /// Lowercase substrings to look for.
    pub keywords: &'static [&'static str],
    /// Category selected on a match.
    pub category: LeaveCategory,
}

impl CategoryRule {
    /// Returns true if any keyword occurs in the lowercased text.
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|keyword| lowered.contains(keyword))
    }
}

/// Category detection table, highest priority first.
pub const CATEGORY_RULES: [CategoryRule; 5] = [
    CategoryRule {
        name: "special",
        keywords: &["special leave", "special permission", "emergency", "urgent"],
        category: LeaveCategory::Special,
    },
    CategoryRule {
        name: "overnight",
        keywords: &[
            "overnight",
            "sleep over",
            "stay over",
            "saturday night",
            "weekend leave",
        ],
        category: LeaveCategory::Overnight,
    },
    CategoryRule {
        name: "friday_supper",
        keywords: &["friday supper", "supper", "friday evening", "friday night out"],
        category: LeaveCategory::FridaySupper,
    },
    CategoryRule {
        name: "day_leave",
        keywords: &["day leave", "day trip", "saturday out", "sunday out", "day out"],
        category: LeaveCategory::DayLeave,
    },
    CategoryRule {
        name: "weekend_mention",
        keywords: &["saturday", "sunday", "weekend"],
        category: LeaveCategory::DayLeave,
    },
];

/// Category used when nothing in [`CATEGORY_RULES`] matches.
pub const DEFAULT_CATEGORY: LeaveCategory = LeaveCategory::Overnight;

/// One entry of the single-date table.
pub struct DatePattern {
    /// Short label used in logs and tests.
    pub name: &'static str,
    regex: Regex,
}

impl DatePattern {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).expect("invalid date pattern"),
        }
    }

    /// The matched date expression in `lowered`, if any.
    pub fn find<'t>(&self, lowered: &'t str) -> Option<&'t str> {
        self.regex
            .captures(lowered)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

const WEEKDAYS: &str = "monday|tuesday|wednesday|thursday|friday|saturday|sunday|weekend";
const MONTHS: &str = "jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec";

static DATE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\d{1,2}[-/]\d{1,2}[-/]\d{2,4})\s*(?:to|-|until)\s*(\d{1,2}[-/]\d{1,2}[-/]\d{2,4})",
    )
    .expect("invalid date range pattern")
});

static DATE_PATTERNS: LazyLock<Vec<DatePattern>> = LazyLock::new(|| {
    vec![
        DatePattern::new("numeric", r"\b(\d{1,2}[-/]\d{1,2}[-/](?:\d{4}|\d{2}))\b"),
        DatePattern::new(
            "day_month",
            &format!(r"\b(\d{{1,2}}(?:st|nd|rd|th)?\s+(?:{MONTHS})[a-z]*\.?(?:\s+\d{{4}}\b|\s+\d{{2}}\b)?)"),
        ),
        DatePattern::new(
            "month_day",
            &format!(r"\b((?:{MONTHS})[a-z]*\.?\s+\d{{1,2}}(?:st|nd|rd|th)?\b(?:,?\s+\d{{4}}\b)?)"),
        ),
        DatePattern::new("this_weekday", &format!(r"\b(this\s+(?:{WEEKDAYS}))\b")),
        DatePattern::new("next_weekday", &format!(r"\b(next\s+(?:{WEEKDAYS}))\b")),
        DatePattern::new("tomorrow", r"\b(tomorrow)\b"),
        DatePattern::new("today", r"\b(today)\b"),
        DatePattern::new("weekday", &format!(r"\b({WEEKDAYS})\b")),
    ]
});

static ADMIN_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{5})\b").expect("invalid admin number pattern"));

/// Extracts a standalone five-digit admin number.
pub(crate) fn extract_admin_number(text: &str) -> Option<String> {
    ADMIN_NUMBER
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extracts the student identifier using the identifier table.
///
/// Runs on the original casing because the name patterns depend on it.
pub fn extract_identifier(text: &str) -> Option<String> {
    IDENTIFIER_PATTERNS
        .iter()
        .find_map(|pattern| pattern.extract(text))
}

/// Detects the leave category using the category table.
///
/// # Example
///
/// ```
/// use exeat_engine::models::LeaveCategory;
/// use exeat_engine::parsing::request::detect_category;
///
/// assert_eq!(detect_category("Overnight leave this Saturday"), LeaveCategory::Overnight);
/// assert_eq!(detect_category("day leave this Sunday"), LeaveCategory::DayLeave);
/// assert_eq!(detect_category("can he come home?"), LeaveCategory::Overnight);
/// ```
pub fn detect_category(text: &str) -> LeaveCategory {
    let lowered = text.to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|rule| rule.matches(&lowered))
        .map(|rule| rule.category)
        .unwrap_or(DEFAULT_CATEGORY)
}

/// Extracts a window for `category` from the text.
///
/// An explicit numeric range wins. Otherwise each single-date pattern is
/// tried in order; a pattern that matches but does not resolve to a real
/// date is skipped.
pub fn extract_window(
    text: &str,
    category: LeaveCategory,
    now: NaiveDateTime,
) -> Option<DateWindow> {
    let lowered = text.to_lowercase();

    if let Some(caps) = DATE_RANGE.captures(&lowered) {
        let start = dates::resolve_absolute(&caps[1], now.year());
        let end = dates::resolve_absolute(&caps[2], now.year());
        if let (Some(start), Some(end)) = (start, end) {
            if let Some(window) = dates::expand_range(start, end, category) {
                return Some(window);
            }
        }
    }

    DATE_PATTERNS.iter().find_map(|pattern| {
        let expression = pattern.find(&lowered)?;
        let date = dates::resolve(expression, now)?;
        Some(dates::expand_window(date, category))
    })
}

/// Parses a guardian's message against the reference instant `now`.
///
/// # Example
///
/// ```
/// use exeat_engine::models::LeaveCategory;
/// use exeat_engine::parsing::request::parse;
/// use chrono::NaiveDateTime;
///
/// // 2025-02-06 is a Thursday
/// let now = NaiveDateTime::parse_from_str("2025-02-06 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
/// let parsed = parse("Overnight leave for James Smith this Saturday", now);
///
/// assert_eq!(parsed.subject_identifier.as_deref(), Some("James Smith"));
/// assert_eq!(parsed.category, LeaveCategory::Overnight);
/// assert_eq!(parsed.window.unwrap().start.to_string(), "2025-02-08 14:00:00");
/// ```
pub fn parse(text: &str, now: NaiveDateTime) -> ParsedRequest {
    let category = detect_category(text);
    ParsedRequest {
        subject_identifier: extract_identifier(text),
        category,
        window: extract_window(text, category, now),
        raw_text: text.to_string(),
    }
}
