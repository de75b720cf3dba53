//! Decision model returned by the eligibility engine.
//!
//! Every invocation of the engine yields exactly one [`Decision`], whether
//! the request was approved, rejected, escalated or failed part-way.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DateWindow, LeaveCategory, SubjectSummary};
use crate::notify::SpecialLeaveNotice;

/// The top-level verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    /// Approved and recorded.
    Approved,
    /// Rejected by policy.
    Rejected,
    /// Routed to an administrator for manual review.
    SpecialPending,
    /// The request could not be processed at all.
    Error,
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionStatus::Approved => write!(f, "approved"),
            DecisionStatus::Rejected => write!(f, "rejected"),
            DecisionStatus::SpecialPending => write!(f, "special_pending"),
            DecisionStatus::Error => write!(f, "error"),
        }
    }
}

/// Machine-readable reason behind a non-approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// Sender contact did not authenticate.
    AuthenticationFailed,
    /// The named student is not linked to the sender.
    StudentLinkageFailed,
    /// No student identifier could be extracted.
    ParseFailed,
    /// No date could be extracted.
    MissingDates,
    /// Window falls on a closed weekend for the student's cohort.
    ClosedPeriod,
    /// Window falls outside term or is otherwise invalid.
    DateInvalid,
    /// Overnight leave requested for a day other than Saturday.
    NonSaturdayOvernight,
    /// Student is under an active restriction.
    Restricted,
    /// No balance remaining for the category.
    InsufficientBalance,
    /// Guardian explicitly asked for special leave.
    ExplicitSpecialLeave,
    /// The policy store failed mid-request.
    PersistenceFailed,
}

impl ReasonCode {
    /// The stable wire code.
    pub fn as_str(self) -> &'static str {
        match self {
            ReasonCode::AuthenticationFailed => "authentication_failed",
            ReasonCode::StudentLinkageFailed => "student_linkage_failed",
            ReasonCode::ParseFailed => "parse_failed",
            ReasonCode::MissingDates => "missing_dates",
            ReasonCode::ClosedPeriod => "closed_period",
            ReasonCode::DateInvalid => "date_invalid",
            ReasonCode::NonSaturdayOvernight => "non_saturday_overnight",
            ReasonCode::Restricted => "restricted",
            ReasonCode::InsufficientBalance => "insufficient_balance",
            ReasonCode::ExplicitSpecialLeave => "explicit_special_leave",
            ReasonCode::PersistenceFailed => "persistence_failed",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rule evaluation recorded on the decision, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleStep {
    /// 1-based position in the chain.
    pub step_number: u32,
    /// Stable rule id.
    pub rule_id: String,
    /// Human-readable rule name.
    pub rule_name: String,
    /// What the rule concluded.
    pub outcome: String,
}

/// The engine's verdict on one inbound message.
///
/// `explanation` is always populated so a response layer can phrase a
/// reply without re-deriving anything.
///
/// # Example
///
/// ```
/// use exeat_engine::models::{Decision, DecisionStatus, ReasonCode};
///
/// let decision = Decision::error(ReasonCode::ParseFailed, "no student named");
/// assert_eq!(decision.status, DecisionStatus::Error);
/// assert_eq!(decision.reason_code, Some(ReasonCode::ParseFailed));
/// assert!(!decision.explanation.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Verdict.
    pub status: DecisionStatus,
    /// Set on everything but approvals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<ReasonCode>,
    /// Short reason text, e.g. `"restricted"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Sentence suitable for a reply to the sender.
    pub explanation: String,
    /// The linked student, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<SubjectSummary>,
    /// Parsed category, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<LeaveCategory>,
    /// Resolved window, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<DateWindow>,
    /// Balance left after an approval of a balanced category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_balance: Option<u32>,
    /// Register entry written for approvals and escalations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<Uuid>,
    /// Notice routed to the administrator on escalation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<SpecialLeaveNotice>,
    /// Rule evaluations in order.
    #[serde(default)]
    pub trace: Vec<RuleStep>,
}

impl Decision {
    fn bare(status: DecisionStatus, explanation: String) -> Self {
        Self {
            status,
            reason_code: None,
            reason: None,
            explanation,
            subject: None,
            category: None,
            window: None,
            remaining_balance: None,
            entry_id: None,
            notice: None,
            trace: Vec::new(),
        }
    }

    /// An approval.
    pub fn approved(explanation: impl Into<String>) -> Self {
        Self::bare(DecisionStatus::Approved, explanation.into())
    }

    /// A policy rejection.
    pub fn rejected(code: ReasonCode, reason: impl Into<String>, explanation: impl Into<String>) -> Self {
        let mut decision = Self::bare(DecisionStatus::Rejected, explanation.into());
        decision.reason_code = Some(code);
        decision.reason = Some(reason.into());
        decision
    }

    /// A manual-review escalation.
    pub fn special_pending(
        code: ReasonCode,
        reason: impl Into<String>,
        explanation: impl Into<String>,
    ) -> Self {
        let mut decision = Self::bare(DecisionStatus::SpecialPending, explanation.into());
        decision.reason_code = Some(code);
        decision.reason = Some(reason.into());
        decision
    }

    /// A processing failure.
    pub fn error(code: ReasonCode, explanation: impl Into<String>) -> Self {
        let mut decision = Self::bare(DecisionStatus::Error, explanation.into());
        decision.reason_code = Some(code);
        decision.reason = Some(code.as_str().to_string());
        decision
    }

    /// Returns true for approvals.
    pub fn is_approved(&self) -> bool {
        self.status == DecisionStatus::Approved
    }
}
