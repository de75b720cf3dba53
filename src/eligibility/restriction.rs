//! Administrator-imposed restriction periods.

use crate::error::EngineResult;
use crate::models::ReasonCode;

use super::{EligibilityRule, RuleContext, RuleOutcome};

/// Rejects restrictable categories when an active restriction overlaps the
/// window, bounds included.
#[derive(Debug, Default, Clone, Copy)]
pub struct RestrictionRule;

impl EligibilityRule for RestrictionRule {
    fn id(&self) -> &'static str {
        "restriction"
    }

    fn name(&self) -> &'static str {
        "Restriction"
    }

    fn evaluate(&self, context: &RuleContext<'_>) -> EngineResult<RuleOutcome> {
        let request = context.request;
        if !request.category.is_restrictable() {
            return Ok(RuleOutcome::Continue);
        }
        if context
            .store
            .check_restriction(&request.subject.admin_number, &request.window)?
        {
            return Ok(RuleOutcome::reject(ReasonCode::Restricted));
        }
        Ok(RuleOutcome::Continue)
    }
}
