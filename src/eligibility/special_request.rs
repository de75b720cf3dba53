//! Explicit special leave requests.

use crate::error::EngineResult;
use crate::models::{LeaveCategory, ReasonCode};

use super::{EligibilityRule, RuleContext, RuleOutcome};

/// Trigger text for requests that asked for special leave by name.
pub const EXPLICIT_SPECIAL_LEAVE: &str = "explicit special leave";

/// Routes every special leave request for manual review.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpecialRequestRule;

impl EligibilityRule for SpecialRequestRule {
    fn id(&self) -> &'static str {
        "special_request"
    }

    fn name(&self) -> &'static str {
        "Explicit special request"
    }

    fn evaluate(&self, context: &RuleContext<'_>) -> EngineResult<RuleOutcome> {
        if context.request.category == LeaveCategory::Special {
            return Ok(RuleOutcome::Escalate {
                code: ReasonCode::ExplicitSpecialLeave,
                trigger: EXPLICIT_SPECIAL_LEAVE.to_string(),
            });
        }
        Ok(RuleOutcome::Continue)
    }
}
