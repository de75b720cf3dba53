//! Special-leave notices and the delivery hook they are handed to.
//!
//! The engine only produces notice content. Transport belongs to whatever
//! [`Notifier`] the host wires in.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::{Cohort, DateWindow, LeaveCategory, LeaveRequest};

/// A request routed to the student's house administrator for manual review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialLeaveNotice {
    /// Register entry recorded for the pending request.
    pub entry_id: Uuid,
    /// House/unit whose administrator should review it.
    pub recipient_unit: String,
    /// Student display name.
    pub student_name: String,
    /// Student admin number.
    pub admin_number: String,
    /// Student cohort.
    pub cohort: Cohort,
    /// Guardian auth id.
    pub requested_by: String,
    /// Guardian contact the request arrived from.
    pub requester_contact: String,
    /// Requested category.
    pub category: LeaveCategory,
    /// Requested window.
    pub window: DateWindow,
    /// Why manual review is needed.
    pub trigger: String,
    /// Rendered message body.
    pub body: String,
}

impl SpecialLeaveNotice {
    /// Builds the notice for a request escalated because of `trigger`.
    pub fn for_request(request: &LeaveRequest, entry_id: Uuid, trigger: &str) -> Self {
        let subject = &request.subject;
        let body = format!(
            "Special Leave Request Forwarded\n\
             \n\
             Student: {name} ({admin})\n\
             House: {house}\n\
             Block: {cohort}\n\
             \n\
             Requesting Parent: {parent}\n\
             Contact: {contact}\n\
             \n\
             Leave Type: {category}\n\
             Dates: {start} to {end}\n\
             \n\
             Reason for Special Leave: {trigger}\n\
             \n\
             Please respond with \"APPROVE\" or \"REJECT\" to process this request.",
            name = subject.full_name(),
            admin = subject.admin_number,
            house = subject.house,
            cohort = subject.cohort,
            parent = request.identity.auth_id,
            contact = request.identity.contact,
            category = request.category,
            start = request.window.start.format("%d %B %Y %H:%M"),
            end = request.window.end.format("%d %B %Y %H:%M"),
        );

        Self {
            entry_id,
            recipient_unit: subject.house.clone(),
            student_name: subject.full_name(),
            admin_number: subject.admin_number.clone(),
            cohort: subject.cohort,
            requested_by: request.identity.auth_id.clone(),
            requester_contact: request.identity.contact.clone(),
            category: request.category,
            window: request.window,
            trigger: trigger.to_string(),
            body,
        }
    }
}

/// Notice dispatch error.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The transport could not accept the notice.
    #[error("notice transport unavailable: {0}")]
    Transport(String),
}

/// Outbound hook for special-leave notices.
pub trait Notifier: Send + Sync {
    /// Delivers `notice` to the administrator of its unit.
    fn notify(&self, notice: &SpecialLeaveNotice) -> Result<(), NotifyError>;
}

/// Writes notices to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &SpecialLeaveNotice) -> Result<(), NotifyError> {
        info!(
            unit = %notice.recipient_unit,
            admin_number = %notice.admin_number,
            entry_id = %notice.entry_id,
            trigger = %notice.trigger,
            "special leave notice\n{}",
            notice.body
        );
        Ok(())
    }
}

/// Keeps every notice in memory so callers can inspect what was sent.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<SpecialLeaveNotice>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices received so far, oldest first.
    pub fn notices(&self) -> Vec<SpecialLeaveNotice> {
        match self.notices.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &SpecialLeaveNotice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .map_err(|_| NotifyError::Transport("recorder lock poisoned".to_string()))?
            .push(notice.clone());
        Ok(())
    }
}
