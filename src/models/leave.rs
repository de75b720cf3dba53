//! Leave categories, decision statuses and date windows.
//!
//! This module defines the closed set of leave categories recognised by the
//! engine, the lifecycle of a leave request's status, and the [`DateWindow`]
//! that every resolved request carries.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// The kind of leave being requested.
///
/// The category decides which time-of-day template is imposed on the
/// requested date and which balance, if any, is charged on approval.
///
/// # Example
///
/// ```
/// use exeat_engine::models::LeaveCategory;
///
/// assert!(LeaveCategory::Overnight.is_balanced());
/// assert!(!LeaveCategory::DayLeave.is_balanced());
/// assert_eq!(LeaveCategory::FridaySupper.to_string(), "Friday Supper");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveCategory {
    /// Saturday afternoon to Sunday evening, charged to the overnight balance.
    Overnight,
    /// Friday evening out, charged to the Friday supper balance.
    FridaySupper,
    /// Same-day leave; unlimited and never charged.
    DayLeave,
    /// Explicitly requested special leave; always routed for manual review.
    Special,
}

impl LeaveCategory {
    /// All categories in declaration order.
    pub const ALL: [LeaveCategory; 4] = [
        LeaveCategory::Overnight,
        LeaveCategory::FridaySupper,
        LeaveCategory::DayLeave,
        LeaveCategory::Special,
    ];

    /// Returns true if approving this category consumes a balance unit.
    pub fn is_balanced(self) -> bool {
        matches!(self, LeaveCategory::Overnight | LeaveCategory::FridaySupper)
    }

    /// Returns true if the category is subject to restriction periods.
    pub fn is_restrictable(self) -> bool {
        matches!(
            self,
            LeaveCategory::Overnight | LeaveCategory::FridaySupper | LeaveCategory::DayLeave
        )
    }

    /// The stable storage/wire code for this category.
    pub fn as_str(self) -> &'static str {
        match self {
            LeaveCategory::Overnight => "overnight",
            LeaveCategory::FridaySupper => "friday_supper",
            LeaveCategory::DayLeave => "day_leave",
            LeaveCategory::Special => "special",
        }
    }
}

impl fmt::Display for LeaveCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeaveCategory::Overnight => write!(f, "Overnight"),
            LeaveCategory::FridaySupper => write!(f, "Friday Supper"),
            LeaveCategory::DayLeave => write!(f, "Day Leave"),
            LeaveCategory::Special => write!(f, "Special"),
        }
    }
}

impl FromStr for LeaveCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        LeaveCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
            .ok_or_else(|| format!("unknown leave category '{value}'"))
    }
}

/// Status of a leave request or register entry.
///
/// A request starts `Pending` and is resolved exactly once by the engine.
/// The only later transition is an administrator cancelling an approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveStatus {
    /// Not yet decided.
    Pending,
    /// Approved and entered in the register.
    Approved,
    /// Rejected by policy.
    Rejected,
    /// Approved, then cancelled by an administrator.
    Cancelled,
    /// Awaiting manual adjudication.
    SpecialPending,
}

impl LeaveStatus {
    const ALL: [LeaveStatus; 5] = [
        LeaveStatus::Pending,
        LeaveStatus::Approved,
        LeaveStatus::Rejected,
        LeaveStatus::Cancelled,
        LeaveStatus::SpecialPending,
    ];

    /// Returns true if moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: LeaveStatus) -> bool {
        matches!(
            (self, next),
            (
                LeaveStatus::Pending,
                LeaveStatus::Approved | LeaveStatus::Rejected | LeaveStatus::SpecialPending
            ) | (LeaveStatus::Approved, LeaveStatus::Cancelled)
        )
    }

    /// The stable storage/wire code for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
            LeaveStatus::Cancelled => "cancelled",
            LeaveStatus::SpecialPending => "special_pending",
        }
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeaveStatus::Pending => write!(f, "Pending"),
            LeaveStatus::Approved => write!(f, "Approved"),
            LeaveStatus::Rejected => write!(f, "Rejected"),
            LeaveStatus::Cancelled => write!(f, "Cancelled"),
            LeaveStatus::SpecialPending => write!(f, "Special Leave Pending"),
        }
    }
}

impl FromStr for LeaveStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        LeaveStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| format!("unknown leave status '{value}'"))
    }
}

/// A resolved leave window.
///
/// Invariant: `start < end`. Construct through [`DateWindow::new`], which
/// enforces it.
///
/// # Example
///
/// ```
/// use exeat_engine::models::DateWindow;
/// use chrono::NaiveDateTime;
///
/// let start = NaiveDateTime::parse_from_str("2025-02-08 14:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
/// let end = NaiveDateTime::parse_from_str("2025-02-09 18:50:00", "%Y-%m-%d %H:%M:%S").unwrap();
/// let window = DateWindow::new(start, end).unwrap();
/// assert!(window.contains(start));
/// assert!(DateWindow::new(end, start).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    /// When the leave begins.
    pub start: NaiveDateTime,
    /// When the leave ends.
    pub end: NaiveDateTime,
}

impl DateWindow {
    /// Creates a window, rejecting empty or inverted ranges.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> EngineResult<Self> {
        if start >= end {
            return Err(EngineError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// The calendar date the window starts on.
    pub fn start_date(&self) -> NaiveDate {
        self.start.date()
    }

    /// The calendar date the window ends on.
    pub fn end_date(&self) -> NaiveDate {
        self.end.date()
    }

    /// Returns true if `instant` falls within the window, bounds included.
    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Inclusive calendar-day overlap with the period `[from, to]`.
    ///
    /// A period ending on the day the window starts overlaps it.
    pub fn overlaps_days(&self, from: NaiveDate, to: NaiveDate) -> bool {
        !(self.end_date() < from || self.start_date() > to)
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%A %d %B %Y at %H:%M"),
            self.end.format("%A %d %B %Y at %H:%M")
        )
    }
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

    fn overnight_window() -> DateWindow {
        DateWindow::new(
            make_datetime("2025-02-08", "14:00:00"),
            make_datetime("2025-02-09", "18:50:00"),
        )
        .unwrap()
    }

    #[test]
    fn test_category_serialization() {
        assert_eq!(
            serde_json::to_string(&LeaveCategory::FridaySupper).unwrap(),
            "\"friday_supper\""
        );
        assert_eq!(
            serde_json::to_string(&LeaveCategory::DayLeave).unwrap(),
            "\"day_leave\""
        );
    }

    #[test]
    fn test_category_round_trips_through_storage_code() {
        for category in LeaveCategory::ALL {
            assert_eq!(category.as_str().parse::<LeaveCategory>().unwrap(), category);
        }
        assert!("weekly".parse::<LeaveCategory>().is_err());
    }

    #[test]
    fn test_only_overnight_and_supper_are_balanced() {
        assert!(LeaveCategory::Overnight.is_balanced());
        assert!(LeaveCategory::FridaySupper.is_balanced());
        assert!(!LeaveCategory::DayLeave.is_balanced());
        assert!(!LeaveCategory::Special.is_balanced());
    }

    #[test]
    fn test_special_leave_is_not_restrictable() {
        assert!(LeaveCategory::DayLeave.is_restrictable());
        assert!(!LeaveCategory::Special.is_restrictable());
    }

    #[test]
    fn test_pending_resolves_once() {
        assert!(LeaveStatus::Pending.can_transition_to(LeaveStatus::Approved));
        assert!(LeaveStatus::Pending.can_transition_to(LeaveStatus::Rejected));
        assert!(LeaveStatus::Pending.can_transition_to(LeaveStatus::SpecialPending));
        assert!(!LeaveStatus::Approved.can_transition_to(LeaveStatus::Rejected));
        assert!(!LeaveStatus::Rejected.can_transition_to(LeaveStatus::Approved));
    }

    #[test]
    fn test_only_approvals_can_be_cancelled() {
        assert!(LeaveStatus::Approved.can_transition_to(LeaveStatus::Cancelled));
        assert!(!LeaveStatus::Cancelled.can_transition_to(LeaveStatus::Cancelled));
        assert!(!LeaveStatus::SpecialPending.can_transition_to(LeaveStatus::Cancelled));
    }

    #[test]
    fn test_status_storage_codes() {
        for status in LeaveStatus::ALL {
            assert_eq!(status.as_str().parse::<LeaveStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_window_rejects_inverted_range() {
        let result = DateWindow::new(
            make_datetime("2025-02-09", "18:50:00"),
            make_datetime("2025-02-08", "14:00:00"),
        );
        assert!(matches!(result, Err(EngineError::InvalidWindow { .. })));
    }

    #[test]
    fn test_window_rejects_empty_range() {
        let instant = make_datetime("2025-02-08", "14:00:00");
        assert!(DateWindow::new(instant, instant).is_err());
    }

    #[test]
    fn test_window_contains_is_inclusive() {
        let window = overnight_window();
        assert!(window.contains(make_datetime("2025-02-08", "14:00:00")));
        assert!(window.contains(make_datetime("2025-02-09", "18:50:00")));
        assert!(!window.contains(make_datetime("2025-02-09", "18:51:00")));
    }

    #[test]
    fn test_period_ending_on_start_day_overlaps() {
        let window = overnight_window();
        assert!(window.overlaps_days(make_date("2025-02-01"), make_date("2025-02-08")));
    }

    #[test]
    fn test_period_starting_on_end_day_overlaps() {
        let window = overnight_window();
        assert!(window.overlaps_days(make_date("2025-02-09"), make_date("2025-02-20")));
    }

    #[test]
    fn test_disjoint_period_does_not_overlap() {
        let window = overnight_window();
        assert!(!window.overlaps_days(make_date("2025-02-01"), make_date("2025-02-07")));
        assert!(!window.overlaps_days(make_date("2025-02-10"), make_date("2025-02-28")));
    }

    #[test]
    fn test_window_display() {
        let window = overnight_window();
        assert_eq!(
            window.to_string(),
            "Saturday 08 February 2025 at 14:00 to Sunday 09 February 2025 at 18:50"
        );
    }
}
