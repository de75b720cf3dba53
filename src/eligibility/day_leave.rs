//! Day leave is unlimited.

use crate::error::EngineResult;
use crate::models::LeaveCategory;

use super::{EligibilityRule, RuleContext, RuleOutcome};

/// Approves day leave outright, ahead of the restriction and balance checks.
#[derive(Debug, Default, Clone, Copy)]
pub struct DayLeaveExemptionRule;

impl EligibilityRule for DayLeaveExemptionRule {
    fn id(&self) -> &'static str {
        "day_leave_exemption"
    }

    fn name(&self) -> &'static str {
        "Day leave exemption"
    }

    fn evaluate(&self, context: &RuleContext<'_>) -> EngineResult<RuleOutcome> {
        Ok(match context.request.category {
            LeaveCategory::DayLeave => RuleOutcome::Approve,
            _ => RuleOutcome::Continue,
        })
    }
}
