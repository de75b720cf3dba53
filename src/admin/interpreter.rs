//! Free-text administrator commands.
//!
//! Intent is chosen from an ordered keyword table; the student is always
//! named by admin number. Restrictions always run for
//! [`RESTRICTION_DAYS`] from the moment the command is handled, whatever
//! dates the text mentions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::parsing::request::extract_admin_number;

/// Reason recorded on a cancellation that gives none.
pub const DEFAULT_CANCEL_REASON: &str = "Housemaster decision";

/// Reason recorded on every restriction issued by command.
pub const DEFAULT_RESTRICTION_REASON: &str = "Housemaster restriction";

/// Length of a restriction issued by command.
pub const RESTRICTION_DAYS: i64 = 14;

/// What an administrator asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminIntent {
    /// Cancel the student's current approved leave.
    Cancel,
    /// Restrict the student from leave.
    Restrict,
    /// Report the student's balances.
    BalanceQuery,
    /// List the student's recent register entries.
    HistoryQuery,
    /// Nothing recognisable.
    Unrecognized,
}

impl fmt::Display for AdminIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AdminIntent::Cancel => "cancel",
            AdminIntent::Restrict => "restrict",
            AdminIntent::BalanceQuery => "balance_query",
            AdminIntent::HistoryQuery => "history_query",
            AdminIntent::Unrecognized => "unrecognized",
        };
        f.write_str(label)
    }
}

/// One entry of the intent table.
pub struct IntentRule {
    /// Lowercase substrings to look for.
    pub keywords: &'static [&'static str],
    /// Intent selected on a match.
    pub intent: AdminIntent,
}

/// Intent table, highest priority first.
pub const INTENT_RULES: [IntentRule; 4] = [
    IntentRule {
        keywords: &["cancel", "revoke"],
        intent: AdminIntent::Cancel,
    },
    IntentRule {
        keywords: &["restrict", "restriction", "block"],
        intent: AdminIntent::Restrict,
    },
    IntentRule {
        keywords: &["balance", "how many"],
        intent: AdminIntent::BalanceQuery,
    },
    IntentRule {
        keywords: &["leave", "exeat"],
        intent: AdminIntent::HistoryQuery,
    },
];

/// A parsed administrator command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCommand {
    /// The selected intent.
    pub intent: AdminIntent,
    /// Five-digit admin number, if present.
    pub admin_number: Option<String>,
    /// Reason text; only cancellations carry one.
    pub reason: Option<String>,
}

const REASON_MARKERS: [&str; 2] = ["because", "reason:"];

/// Text after the first reason marker, trimmed, in its original casing.
fn extract_reason(text: &str) -> Option<String> {
    let lowered = text.to_ascii_lowercase();
    REASON_MARKERS.iter().find_map(|marker| {
        let at = lowered.find(marker)? + marker.len();
        let reason = text[at..].trim();
        (!reason.is_empty()).then(|| reason.to_string())
    })
}

/// Interprets an administrator's message.
///
/// # Example
///
/// ```
/// use exeat_engine::admin::{AdminIntent, interpret};
///
/// let command = interpret("Cancel leave for 12345 because academic concerns");
/// assert_eq!(command.intent, AdminIntent::Cancel);
/// assert_eq!(command.admin_number.as_deref(), Some("12345"));
/// assert_eq!(command.reason.as_deref(), Some("academic concerns"));
/// ```
pub fn interpret(text: &str) -> AdminCommand {
    let lowered = text.to_lowercase();
    let intent = INTENT_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|rule| rule.intent)
        .unwrap_or(AdminIntent::Unrecognized);

    let reason = match intent {
        AdminIntent::Cancel => {
            Some(extract_reason(text).unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_string()))
        }
        _ => None,
    };

    AdminCommand {
        intent,
        admin_number: extract_admin_number(text),
        reason,
    }
}
