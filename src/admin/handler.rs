//! Executes interpreted administrator commands against the policy store.

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::StoreError;
use crate::models::{Administrator, Balances, DateWindow, RegisterEntry, Restriction};
use crate::store::{CancellationReceipt, DEFAULT_HISTORY_LIMIT, PolicyStore};

use super::interpreter::{
    AdminCommand, AdminIntent, DEFAULT_CANCEL_REASON, DEFAULT_RESTRICTION_REASON,
    RESTRICTION_DAYS, interpret,
};

/// Whether a command was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    /// Carried out.
    Success,
    /// Refused or failed; `message` says why.
    Error,
}

/// The result of one administrator command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminOutcome {
    /// Success or error.
    pub status: CommandStatus,
    /// Interpreted intent; absent when the sender did not authenticate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<AdminIntent>,
    /// Reply text for the administrator.
    pub message: String,
    /// Balances, for balance queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balances: Option<Balances>,
    /// Register entries, newest first, for history queries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<RegisterEntry>,
    /// The restriction imposed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restriction: Option<Restriction>,
    /// The cancellation committed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation: Option<CancellationReceipt>,
}

impl AdminOutcome {
    fn success(intent: AdminIntent, message: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Success,
            intent: Some(intent),
            message: message.into(),
            balances: None,
            history: Vec::new(),
            restriction: None,
            cancellation: None,
        }
    }

    fn error(intent: Option<AdminIntent>, message: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Error,
            intent,
            message: message.into(),
            balances: None,
            history: Vec::new(),
            restriction: None,
            cancellation: None,
        }
    }

    /// Returns true if the command was carried out.
    pub fn is_success(&self) -> bool {
        self.status == CommandStatus::Success
    }
}

/// Runs administrator commands.
pub struct AdminCommandHandler {
    store: Arc<dyn PolicyStore>,
}

impl AdminCommandHandler {
    /// Creates a handler over `store`.
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        Self { store }
    }

    /// Authenticates `contact`, interprets `text` and carries it out as of
    /// `now`. Failures are reported in the outcome, never returned.
    pub fn execute(&self, contact: &str, text: &str, now: NaiveDateTime) -> AdminOutcome {
        let administrator = match self.store.authenticate_administrator(contact) {
            Ok(Some(administrator)) => administrator,
            Ok(None) => {
                warn!(contact = %contact, "administrator not recognised");
                return AdminOutcome::error(
                    None,
                    "I couldn't verify your Housemaster credentials. Please ensure you're using your registered contact details.",
                );
            }
            Err(error) => {
                warn!(error = %error, "administrator authentication failed");
                return AdminOutcome::error(None, "The leave register is unavailable. Please try again later.");
            }
        };

        let command = interpret(text);
        let outcome = self.dispatch(&administrator, &command, now);
        info!(
            admin_id = %administrator.admin_id,
            intent = %command.intent,
            admin_number = command.admin_number.as_deref().unwrap_or("-"),
            success = outcome.is_success(),
            "administrator command handled"
        );
        outcome
    }

    fn dispatch(
        &self,
        administrator: &Administrator,
        command: &AdminCommand,
        now: NaiveDateTime,
    ) -> AdminOutcome {
        let intent = command.intent;
        if intent == AdminIntent::Unrecognized {
            return AdminOutcome::error(
                Some(intent),
                "I didn't understand your request. You can ask about leave balances, view leave history, cancel approved leaves, or set restrictions.",
            );
        }

        let Some(admin_number) = command.admin_number.as_deref() else {
            let action = match intent {
                AdminIntent::Cancel => "cancel their leave",
                AdminIntent::Restrict => "set a restriction",
                AdminIntent::BalanceQuery => "check their balance",
                _ => "view their leave history",
            };
            return AdminOutcome::error(
                Some(intent),
                format!("Please include the student's admin number to {action}."),
            );
        };

        let result = match intent {
            AdminIntent::Cancel => {
                let reason = command.reason.as_deref().unwrap_or(DEFAULT_CANCEL_REASON);
                self.cancel(administrator, admin_number, reason, now)
            }
            AdminIntent::Restrict => self.restrict(administrator, admin_number, now),
            AdminIntent::BalanceQuery => self.balances(admin_number),
            _ => self.history(admin_number),
        };

        result.unwrap_or_else(|error| match error {
            StoreError::UnknownSubject(_) => AdminOutcome::error(
                Some(intent),
                format!("No student with admin number {admin_number} was found."),
            ),
            other => {
                warn!(error = %other, admin_number = %admin_number, "administrator command failed");
                AdminOutcome::error(
                    Some(intent),
                    format!("The request for student {admin_number} could not be completed. Please try again later."),
                )
            }
        })
    }

    fn cancel(
        &self,
        administrator: &Administrator,
        admin_number: &str,
        reason: &str,
        now: NaiveDateTime,
    ) -> Result<AdminOutcome, StoreError> {
        let receipt =
            self.store
                .commit_cancellation(admin_number, &administrator.admin_id, reason, now)?;
        let Some(receipt) = receipt else {
            return Ok(AdminOutcome::error(
                Some(AdminIntent::Cancel),
                format!("Student {admin_number} has no approved leave that can be cancelled."),
            ));
        };

        let message = match receipt.refunded {
            Some(category) => format!(
                "Leave cancelled for student {admin_number}. The {category} balance has been refunded and the parent will be notified."
            ),
            None => format!(
                "Leave cancelled for student {admin_number}. The parent will be notified."
            ),
        };
        let mut outcome = AdminOutcome::success(AdminIntent::Cancel, message);
        outcome.cancellation = Some(receipt);
        Ok(outcome)
    }

    fn restrict(
        &self,
        administrator: &Administrator,
        admin_number: &str,
        now: NaiveDateTime,
    ) -> Result<AdminOutcome, StoreError> {
        let window = DateWindow::new(now, now + Duration::days(RESTRICTION_DAYS))
            .map_err(|error| StoreError::Corrupt(error.to_string()))?;
        let restriction = self.store.set_restriction(
            &administrator.admin_id,
            admin_number,
            &window,
            DEFAULT_RESTRICTION_REASON,
        )?;

        let mut outcome = AdminOutcome::success(
            AdminIntent::Restrict,
            format!(
                "Restriction placed on student {admin_number} from {} to {}.",
                window.start.format("%d %b"),
                window.end.format("%d %b")
            ),
        );
        outcome.restriction = Some(restriction);
        Ok(outcome)
    }

    fn balances(&self, admin_number: &str) -> Result<AdminOutcome, StoreError> {
        let balances = self
            .store
            .query_balances(admin_number)?
            .ok_or_else(|| StoreError::UnknownSubject(admin_number.to_string()))?;

        let mut outcome = AdminOutcome::success(
            AdminIntent::BalanceQuery,
            format!(
                "Leave Balance for Student {admin_number}:\nOvernight Leave: {} remaining\nFriday Supper Leave: {} remaining",
                balances.overnight, balances.friday_supper
            ),
        );
        outcome.balances = Some(balances);
        Ok(outcome)
    }

    fn history(&self, admin_number: &str) -> Result<AdminOutcome, StoreError> {
        let history = self.store.query_history(admin_number, DEFAULT_HISTORY_LIMIT)?;
        if history.is_empty() {
            return Ok(AdminOutcome::success(
                AdminIntent::HistoryQuery,
                format!("No leave history found for student {admin_number}."),
            ));
        }

        let mut message = format!("Leave History for Student {admin_number}:\n");
        for entry in &history {
            message.push_str(&format!(
                "\n- {}: {} to {} ({})",
                entry.category,
                entry.window.start.format("%Y-%m-%d %H:%M"),
                entry.window.end.format("%Y-%m-%d %H:%M"),
                entry.status
            ));
        }
        let mut outcome = AdminOutcome::success(AdminIntent::HistoryQuery, message);
        outcome.history = history;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::test_support::{create_test_store, make_datetime, request_for};
    use crate::models::{LeaveCategory, LeaveStatus};
    use crate::store::InMemoryPolicyStore;

    const FINNINGLEY: &str = "27831112222";

    fn now() -> NaiveDateTime {
        make_datetime("2025-02-06", "10:00:00")
    }

    fn create_handler() -> (AdminCommandHandler, Arc<InMemoryPolicyStore>) {
        let store = Arc::new(create_test_store());
        (AdminCommandHandler::new(store.clone()), store)
    }

    fn approve(store: &InMemoryPolicyStore, category: LeaveCategory, date: &str) {
        let request = request_for(store, "12345", category, date);
        store.commit_approval(&request, now()).unwrap();
    }

    // ==========================================================================
    // AH-001: cancel refunds the original category
    // ==========================================================================
    #[test]
    fn test_ah_001_cancel_refunds() {
        let (handler, store) = create_handler();
        approve(&store, LeaveCategory::Overnight, "2025-02-08");
        assert_eq!(store.query_balances("12345").unwrap().unwrap().overnight, 2);

        let outcome = handler.execute(
            FINNINGLEY,
            "cancel leave for 12345 because academic concerns",
            now(),
        );

        assert!(outcome.is_success());
        assert_eq!(outcome.intent, Some(AdminIntent::Cancel));
        assert_eq!(store.query_balances("12345").unwrap().unwrap().overnight, 3);
        let receipt = outcome.cancellation.unwrap();
        assert_eq!(receipt.entry.status, LeaveStatus::Cancelled);
        assert_eq!(receipt.entry.cancellation_reason.as_deref(), Some("academic concerns"));
        assert_eq!(receipt.entry.cancelled_by.as_deref(), Some("HM_001"));
    }

    #[test]
    fn test_cancel_without_leave_is_error() {
        let (handler, _) = create_handler();
        let outcome = handler.execute(FINNINGLEY, "cancel leave for 12345", now());
        assert_eq!(outcome.status, CommandStatus::Error);
        assert!(outcome.message.contains("no approved leave"));
    }

    #[test]
    fn test_cancel_day_leave_does_not_mention_refund() {
        let (handler, store) = create_handler();
        approve(&store, LeaveCategory::DayLeave, "2025-02-09");
        let outcome = handler.execute(FINNINGLEY, "revoke 12345", now());
        assert!(outcome.is_success());
        assert!(!outcome.message.contains("refunded"));
        assert_eq!(outcome.cancellation.unwrap().refunded, None);
    }

    // ==========================================================================
    // AH-002: restriction is fixed at fourteen days
    // ==========================================================================
    #[test]
    fn test_ah_002_restrict_fourteen_days() {
        let (handler, store) = create_handler();
        let outcome = handler.execute(
            "hm.finningley@michaelhouse.org",
            "Restrict 12345 from 1 March to 30 March for fighting",
            now(),
        );

        assert!(outcome.is_success());
        let restriction = outcome.restriction.unwrap();
        assert_eq!(restriction.start, now());
        assert_eq!(restriction.end, make_datetime("2025-02-20", "10:00:00"));
        assert_eq!(restriction.reason, DEFAULT_RESTRICTION_REASON);
        assert_eq!(outcome.message, "Restriction placed on student 12345 from 06 Feb to 20 Feb.");

        let saturday = request_for(&store, "12345", LeaveCategory::Overnight, "2025-02-08");
        assert!(store.check_restriction("12345", &saturday.window).unwrap());
    }

    // ==========================================================================
    // AH-003: queries
    // ==========================================================================
    #[test]
    fn test_ah_003_balance_query() {
        let (handler, _) = create_handler();
        let outcome = handler.execute(FINNINGLEY, "how many leaves does 67890 have?", now());
        assert!(outcome.is_success());
        assert_eq!(
            outcome.balances,
            Some(Balances { overnight: 2, friday_supper: 3 })
        );
        assert!(outcome.message.contains("Overnight Leave: 2 remaining"));
    }

    #[test]
    fn test_history_query() {
        let (handler, store) = create_handler();
        approve(&store, LeaveCategory::FridaySupper, "2025-02-07");
        approve(&store, LeaveCategory::Overnight, "2025-02-08");

        let outcome = handler.execute(FINNINGLEY, "show exeats for 12345", now());
        assert!(outcome.is_success());
        assert_eq!(outcome.history.len(), 2);
        assert!(outcome.message.starts_with("Leave History for Student 12345"));
    }

    #[test]
    fn test_empty_history() {
        let (handler, _) = create_handler();
        let outcome = handler.execute(FINNINGLEY, "leave history 12345", now());
        assert!(outcome.is_success());
        assert_eq!(outcome.message, "No leave history found for student 12345.");
    }

    // ==========================================================================
    // AH-004: refusals
    // ==========================================================================
    #[test]
    fn test_ah_004_unknown_administrator() {
        let (handler, _) = create_handler();
        let outcome = handler.execute("27603174174", "balance 12345", now());
        assert_eq!(outcome.status, CommandStatus::Error);
        assert_eq!(outcome.intent, None);
    }

    #[test]
    fn test_missing_admin_number() {
        let (handler, _) = create_handler();
        let outcome = handler.execute(FINNINGLEY, "cancel James's leave", now());
        assert_eq!(outcome.status, CommandStatus::Error);
        assert_eq!(
            outcome.message,
            "Please include the student's admin number to cancel their leave."
        );
    }

    #[test]
    fn test_unknown_student() {
        let (handler, _) = create_handler();
        for text in ["balance 99999", "restrict 99999", "cancel 99999"] {
            let outcome = handler.execute(FINNINGLEY, text, now());
            assert_eq!(outcome.status, CommandStatus::Error, "{text}");
            assert!(outcome.message.contains("99999"));
        }
    }

    #[test]
    fn test_unrecognized_command() {
        let (handler, _) = create_handler();
        let outcome = handler.execute(FINNINGLEY, "good morning", now());
        assert_eq!(outcome.intent, Some(AdminIntent::Unrecognized));
        assert!(outcome.message.starts_with("I didn't understand"));
    }
}
