//! Term dates and cohort closed periods.

use crate::config::DateValidity;
use crate::error::EngineResult;
use crate::models::ReasonCode;

use super::{EligibilityRule, RuleContext, RuleOutcome};

/// Escalates windows on a closed period for the student's cohort and
/// rejects windows the calendar does not permit at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateValidityRule;

impl EligibilityRule for DateValidityRule {
    fn id(&self) -> &'static str {
        "date_validity"
    }

    fn name(&self) -> &'static str {
        "Date validity"
    }

    fn evaluate(&self, context: &RuleContext<'_>) -> EngineResult<RuleOutcome> {
        let request = context.request;
        let validity = context
            .store
            .check_date_validity(request.subject.cohort, &request.window)?;
        Ok(match validity {
            DateValidity::Valid => RuleOutcome::Continue,
            DateValidity::ClosedPeriod(reason) => RuleOutcome::Escalate {
                code: ReasonCode::ClosedPeriod,
                trigger: reason,
            },
            DateValidity::Invalid(reason) => RuleOutcome::Reject {
                code: ReasonCode::DateInvalid,
                reason,
            },
        })
    }
}
