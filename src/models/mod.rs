//! Core data models for the exeat engine.
//!
//! This module contains the domain models shared by the parser, the
//! eligibility engine, the administrator interpreter and the policy store.

mod decision;
mod identity;
mod leave;
mod register;
mod subject;

pub use decision::{Decision, DecisionStatus, ReasonCode, RuleStep};
pub use identity::{Administrator, Channel, Identity};
pub use leave::{DateWindow, LeaveCategory, LeaveStatus};
pub use register::{LeaveRequest, RegisterEntry, Restriction};
pub use subject::{
    Balances, Cohort, IdentifierMatch, Subject, SubjectSummary, select_by_identifier,
};
