//! The policy store boundary.
//!
//! The engine and the administrator handler depend only on [`PolicyStore`].
//! Two backends are provided: [`InMemoryPolicyStore`] for tests and demos,
//! and [`SqlitePolicyStore`] for durable deployments.
//!
//! Every method is individually atomic. In particular
//! [`PolicyStore::commit_approval`] performs the balance check, the
//! decrement and the register insert as one unit, so two concurrent
//! approvals can never both spend the last unit of a balance.

mod memory;
mod sqlite;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::models::{
    Administrator, Balances, Cohort, DateWindow, Identity, LeaveCategory, LeaveRequest,
    RegisterEntry, Restriction, Subject,
};

pub use crate::config::DateValidity;
pub use memory::InMemoryPolicyStore;
pub use sqlite::SqlitePolicyStore;

/// Default number of entries returned by history queries.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// A committed approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalReceipt {
    /// The register entry written.
    pub entry: RegisterEntry,
    /// Balance left after the deduction, for balanced categories.
    pub remaining_balance: Option<u32>,
}

/// Result of [`PolicyStore::commit_approval`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Register entry written and balance (if any) decremented.
    Committed(ApprovalReceipt),
    /// The balance was already zero at commit time; nothing was written.
    InsufficientBalance,
}

/// A committed cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationReceipt {
    /// The entry after cancellation.
    pub entry: RegisterEntry,
    /// Category refunded, if the entry's category carries a balance.
    pub refunded: Option<LeaveCategory>,
    /// The refunded balance after the refund.
    pub balance_after: Option<u32>,
}

/// Identity, linkage, calendar, balance and register operations the engine
/// consumes.
///
/// Unknown students surface as [`crate::error::StoreError::UnknownSubject`]
/// on writes and as `None` on lookups.
pub trait PolicyStore: Send + Sync {
    /// Authenticates a guardian by phone number.
    fn authenticate_by_phone(&self, phone: &str) -> StoreResult<Option<Identity>>;

    /// Authenticates a guardian by email address, case-insensitively.
    fn authenticate_by_email(&self, email: &str) -> StoreResult<Option<Identity>>;

    /// Authenticates an administrator by phone number or email address.
    fn authenticate_administrator(&self, contact: &str) -> StoreResult<Option<Administrator>>;

    /// Finds the student linked to `identity_id` that `identifier` refers to.
    fn link_subject(&self, identity_id: &str, identifier: &str) -> StoreResult<Option<Subject>>;

    /// Checks the window against term dates and the cohort's closed periods.
    fn check_date_validity(&self, cohort: Cohort, window: &DateWindow)
    -> StoreResult<DateValidity>;

    /// Returns true if an active restriction overlaps the window.
    fn check_restriction(&self, admin_number: &str, window: &DateWindow) -> StoreResult<bool>;

    /// Current balance for a balanced category; `None` for unlimited ones.
    fn get_balance(&self, admin_number: &str, category: LeaveCategory)
    -> StoreResult<Option<u32>>;

    /// Atomically decrements the balance (if the category has one) when it
    /// is at least one, and records an approved register entry.
    fn commit_approval(
        &self,
        request: &LeaveRequest,
        recorded_at: NaiveDateTime,
    ) -> StoreResult<CommitOutcome>;

    /// Records a request awaiting manual review. Balances are untouched.
    fn record_special_pending(
        &self,
        request: &LeaveRequest,
        trigger: &str,
        recorded_at: NaiveDateTime,
    ) -> StoreResult<RegisterEntry>;

    /// Cancels the latest-starting approved, not yet departed entry and
    /// refunds one unit of its category's balance. `None` when there is
    /// nothing to cancel.
    fn commit_cancellation(
        &self,
        admin_number: &str,
        administrator_id: &str,
        reason: &str,
        at: NaiveDateTime,
    ) -> StoreResult<Option<CancellationReceipt>>;

    /// Imposes a restriction over `window`.
    fn set_restriction(
        &self,
        administrator_id: &str,
        admin_number: &str,
        window: &DateWindow,
        reason: &str,
    ) -> StoreResult<Restriction>;

    /// Both balances; `None` for an unknown student.
    fn query_balances(&self, admin_number: &str) -> StoreResult<Option<Balances>>;

    /// Register entries for the student, newest first.
    fn query_history(&self, admin_number: &str, limit: usize) -> StoreResult<Vec<RegisterEntry>>;

    /// Marks the approved entry whose window contains `at` as departed.
    fn record_departure(
        &self,
        admin_number: &str,
        at: NaiveDateTime,
        driver_id: &str,
    ) -> StoreResult<Option<RegisterEntry>>;

    /// Approved, not yet departed entries whose window contains `at`.
    fn active_leaves(&self, admin_number: &str, at: NaiveDateTime)
    -> StoreResult<Vec<RegisterEntry>>;
}

/// Strips everything but digits from a phone number.
pub(crate) fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Returns true if `contact` names the same phone or email as the record.
pub(crate) fn contact_matches(
    contact: &str,
    phone: Option<&str>,
    email: Option<&str>,
) -> bool {
    let contact = contact.trim();
    if contact.contains('@') {
        return email.is_some_and(|email| email.trim().eq_ignore_ascii_case(contact));
    }
    let digits = normalize_phone(contact);
    !digits.is_empty() && phone.is_some_and(|phone| normalize_phone(phone) == digits)
}
