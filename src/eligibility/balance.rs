//! Remaining balance for balanced categories.

use crate::error::EngineResult;
use crate::models::ReasonCode;

use super::{EligibilityRule, RuleContext, RuleOutcome};

/// Rejects overnight and Friday supper requests with nothing left to spend.
///
/// This is an early read only; the authoritative check is the conditional
/// decrement in [`crate::store::PolicyStore::commit_approval`].
#[derive(Debug, Default, Clone, Copy)]
pub struct BalanceRule;

impl EligibilityRule for BalanceRule {
    fn id(&self) -> &'static str {
        "balance"
    }

    fn name(&self) -> &'static str {
        "Balance"
    }

    fn evaluate(&self, context: &RuleContext<'_>) -> EngineResult<RuleOutcome> {
        let request = context.request;
        let balance = context
            .store
            .get_balance(&request.subject.admin_number, request.category)?;
        Ok(match balance {
            Some(remaining) if remaining < 1 => RuleOutcome::reject(ReasonCode::InsufficientBalance),
            _ => RuleOutcome::Continue,
        })
    }
}
