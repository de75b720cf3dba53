//! Leave requests, register entries and restrictions.
//!
//! A [`LeaveRequest`] lives for one engine invocation. [`RegisterEntry`] and
//! [`Restriction`] are durable records owned by the policy store.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cohort, DateWindow, Identity, LeaveCategory, LeaveStatus, Subject};

/// A parsed, linked request moving through the eligibility pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequest {
    /// The student the leave is for.
    pub subject: Subject,
    /// The guardian who asked.
    pub identity: Identity,
    /// Requested category.
    pub category: LeaveCategory,
    /// Resolved window.
    pub window: DateWindow,
    status: LeaveStatus,
}

impl LeaveRequest {
    /// Creates a pending request.
    pub fn new(
        subject: Subject,
        identity: Identity,
        category: LeaveCategory,
        window: DateWindow,
    ) -> Self {
        Self {
            subject,
            identity,
            category,
            window,
            status: LeaveStatus::Pending,
        }
    }

    /// Current status.
    pub fn status(&self) -> LeaveStatus {
        self.status
    }

    /// Moves the request to `next`.
    ///
    /// A request is resolved exactly once. An illegal move leaves the status
    /// unchanged and trips a debug assertion.
    pub fn transition(&mut self, next: LeaveStatus) {
        let legal = self.status.can_transition_to(next);
        debug_assert!(legal, "illegal leave transition {:?} -> {:?}", self.status, next);
        if legal {
            self.status = next;
        }
    }
}

/// A row in the leave register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterEntry {
    /// Register id.
    pub entry_id: Uuid,
    /// Student admin number.
    pub admin_number: String,
    /// Student display name at the time of the request.
    pub student_name: String,
    /// Student house.
    pub house: String,
    /// Student cohort.
    pub cohort: Cohort,
    /// Leave category.
    pub category: LeaveCategory,
    /// Leave window.
    pub window: DateWindow,
    /// Guardian auth id that requested the leave.
    pub requested_by: String,
    /// Current status.
    pub status: LeaveStatus,
    /// When the entry was recorded.
    pub recorded_at: NaiveDateTime,
    /// Why the request was routed for manual review, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_reason: Option<String>,
    /// When the student signed out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departed_at: Option<NaiveDateTime>,
    /// Identity document captured from the collecting driver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    /// Administrator who cancelled the entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<String>,
    /// Why it was cancelled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    /// When it was cancelled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<NaiveDateTime>,
}

impl RegisterEntry {
    /// Builds a fresh entry for `request` with the given status.
    pub fn for_request(
        request: &LeaveRequest,
        status: LeaveStatus,
        recorded_at: NaiveDateTime,
        trigger_reason: Option<String>,
    ) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            admin_number: request.subject.admin_number.clone(),
            student_name: request.subject.full_name(),
            house: request.subject.house.clone(),
            cohort: request.subject.cohort,
            category: request.category,
            window: request.window,
            requested_by: request.identity.auth_id.clone(),
            status,
            recorded_at,
            trigger_reason,
            departed_at: None,
            driver_id: None,
            cancelled_by: None,
            cancellation_reason: None,
            cancelled_at: None,
        }
    }

    /// Approved and the student has not yet left.
    pub fn is_cancellable(&self) -> bool {
        self.status == LeaveStatus::Approved && self.departed_at.is_none()
    }

    /// Approved, not departed, and `at` falls inside the window.
    pub fn is_active_at(&self, at: NaiveDateTime) -> bool {
        self.is_cancellable() && self.window.contains(at)
    }
}

/// A period during which a student may not take restrictable leave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restriction {
    /// Restriction id.
    pub restriction_id: Uuid,
    /// Restricted student.
    pub admin_number: String,
    /// Issuing administrator.
    pub administrator_id: String,
    /// Start of the period.
    pub start: NaiveDateTime,
    /// End of the period.
    pub end: NaiveDateTime,
    /// Why it was imposed.
    pub reason: String,
    /// Inactive restrictions are kept for history but never enforced.
    pub active: bool,
}

impl Restriction {
    /// Returns true if this restriction is active and blocks `window`.
    ///
    /// Overlap is evaluated on calendar days, inclusive at both ends.
    pub fn blocks(&self, window: &DateWindow) -> bool {
        self.active && window.overlaps_days(self.start.date(), self.end.date())
    }
}
