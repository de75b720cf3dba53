//! Administrator (housemaster) commands.
//!
//! [`interpret`] turns a message into an [`AdminCommand`];
//! [`AdminCommandHandler`] authenticates the sender and carries the command
//! out against the policy store.

mod handler;
mod interpreter;

pub use handler::{AdminCommandHandler, AdminOutcome, CommandStatus};
pub use interpreter::{
    AdminCommand, AdminIntent, DEFAULT_CANCEL_REASON, DEFAULT_RESTRICTION_REASON, INTENT_RULES,
    IntentRule, RESTRICTION_DAYS, interpret,
};
