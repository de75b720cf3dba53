//! Exeat Engine for boarding-house leave requests
//!
//! This crate turns free-text leave requests from guardians into approve,
//! reject or special-review decisions against house policy, and runs the
//! commands housemasters issue against the leave register.

#![warn(missing_docs)]

pub mod admin;
pub mod api;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod models;
pub mod notify;
pub mod parsing;
pub mod store;
pub mod telemetry;
