//! Overnight leave starts on a Saturday.

use chrono::{Datelike, Weekday};

use crate::error::EngineResult;
use crate::models::{LeaveCategory, ReasonCode};

use super::{EligibilityRule, RuleContext, RuleOutcome};

/// Trigger text for overnight requests on any other day.
pub const NON_SATURDAY_OVERNIGHT: &str = "non-Saturday overnight";

/// Escalates overnight requests whose window does not start on a Saturday.
#[derive(Debug, Default, Clone, Copy)]
pub struct OvernightWeekdayRule;

impl EligibilityRule for OvernightWeekdayRule {
    fn id(&self) -> &'static str {
        "overnight_weekday"
    }

    fn name(&self) -> &'static str {
        "Overnight weekday"
    }

    fn evaluate(&self, context: &RuleContext<'_>) -> EngineResult<RuleOutcome> {
        let request = context.request;
        if request.category == LeaveCategory::Overnight
            && request.window.start_date().weekday() != Weekday::Sat
        {
            return Ok(RuleOutcome::Escalate {
                code: ReasonCode::NonSaturdayOvernight,
                trigger: NON_SATURDAY_OVERNIGHT.to_string(),
            });
        }
        Ok(RuleOutcome::Continue)
    }
}
