//! Configuration types for leave policy data.
//!
//! This module contains the strongly-typed structures deserialized from
//! `calendar.yaml` and `roster.yaml`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Balances, Cohort, DateWindow};

/// A school term.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Term {
    /// Display name, e.g. "Term 1 2025".
    pub name: String,
    /// First day of term.
    pub start: NaiveDate,
    /// Last day of term.
    pub end: NaiveDate,
}

/// A calendar interval during which ordinary leave is closed for some cohorts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClosedPeriod {
    /// Cohorts the closure applies to.
    pub cohorts: Vec<Cohort>,
    /// First closed day.
    pub start: NaiveDate,
    /// Last closed day.
    pub end: NaiveDate,
    /// Why leave is closed, e.g. "First weekend of term".
    pub reason: String,
}

/// Outcome of a date validity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum DateValidity {
    /// The window is permissible.
    Valid,
    /// The window hits a closed period for the cohort; needs manual review.
    ClosedPeriod(String),
    /// The window is not permissible for any other reason.
    Invalid(String),
}

impl DateValidity {
    /// Returns true for [`DateValidity::Valid`].
    pub fn is_valid(&self) -> bool {
        matches!(self, DateValidity::Valid)
    }
}

/// Term dates and cohort-specific closures (`calendar.yaml`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CalendarConfig {
    /// Terms, in any order.
    #[serde(default)]
    pub terms: Vec<Term>,
    /// Closed periods, in any order.
    #[serde(default)]
    pub closed_periods: Vec<ClosedPeriod>,
}

impl CalendarConfig {
    /// Decides whether `window` is permissible for `cohort`.
    ///
    /// The window must fall entirely inside one term; a calendar without
    /// terms imposes no term boundary. Closed periods for the cohort are
    /// checked after that, on calendar days inclusive at both ends.
    ///
    /// # Example
    ///
    /// ```
    /// use exeat_engine::config::{CalendarConfig, ClosedPeriod, DateValidity};
    /// use exeat_engine::models::{Cohort, DateWindow};
    /// use chrono::{NaiveDate, NaiveDateTime};
    ///
    /// let calendar = CalendarConfig {
    ///     terms: vec![],
    ///     closed_periods: vec![ClosedPeriod {
    ///         cohorts: vec![Cohort::E],
    ///         start: NaiveDate::from_ymd_opt(2025, 1, 18).unwrap(),
    ///         end: NaiveDate::from_ymd_opt(2025, 1, 19).unwrap(),
    ///         reason: "First weekend of term".to_string(),
    ///     }],
    /// };
    /// let start = NaiveDateTime::parse_from_str("2025-01-18 14:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
    /// let end = NaiveDateTime::parse_from_str("2025-01-19 18:50:00", "%Y-%m-%d %H:%M:%S").unwrap();
    /// let window = DateWindow::new(start, end).unwrap();
    ///
    /// assert!(matches!(calendar.check(Cohort::E, &window), DateValidity::ClosedPeriod(_)));
    /// assert!(calendar.check(Cohort::C, &window).is_valid());
    /// ```
    pub fn check(&self, cohort: Cohort, window: &DateWindow) -> DateValidity {
        if !self.terms.is_empty()
            && !self
                .terms
                .iter()
                .any(|term| term.start <= window.start_date() && window.end_date() <= term.end)
        {
            return DateValidity::Invalid("Dates fall outside of term dates".to_string());
        }

        if let Some(period) = self
            .closed_periods
            .iter()
            .find(|period| period.cohorts.contains(&cohort) && window.overlaps_days(period.start, period.end))
        {
            return DateValidity::ClosedPeriod(format!(
                "Falls on closed weekend for {cohort} Block ({})",
                period.reason
            ));
        }

        DateValidity::Valid
    }
}

/// A guardian allowed to request leave.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuardianRecord {
    /// Authorization id, e.g. "PARENT_001".
    pub auth_id: String,
    /// Display name.
    pub name: String,
    /// Phone number, digits only.
    #[serde(default)]
    pub phone: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Admin numbers of linked students.
    #[serde(default)]
    pub students: Vec<String>,
}

/// A house administrator allowed to issue commands.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AdministratorRecord {
    /// Administrator id, e.g. "HM_001".
    pub admin_id: String,
    /// House/unit they run.
    pub unit: String,
    /// Phone number, digits only.
    #[serde(default)]
    pub phone: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
}

/// A student and their opening balances.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StudentRecord {
    /// Five-digit admin number.
    pub admin_number: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// House/unit.
    pub house: String,
    /// Cohort.
    pub cohort: Cohort,
    /// Opening balances.
    #[serde(default)]
    pub balances: Balances,
}

/// A standing restriction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RestrictionRecord {
    /// Restricted student.
    pub admin_number: String,
    /// Issuing administrator.
    pub administrator_id: String,
    /// First restricted day.
    pub start: NaiveDate,
    /// Last restricted day.
    pub end: NaiveDate,
    /// Why it was imposed.
    pub reason: String,
}

/// People and standing restrictions (`roster.yaml`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RosterConfig {
    /// Guardians.
    #[serde(default)]
    pub guardians: Vec<GuardianRecord>,
    /// Administrators.
    #[serde(default)]
    pub administrators: Vec<AdministratorRecord>,
    /// Students.
    #[serde(default)]
    pub students: Vec<StudentRecord>,
    /// Restrictions in force at load time.
    #[serde(default)]
    pub restrictions: Vec<RestrictionRecord>,
}
