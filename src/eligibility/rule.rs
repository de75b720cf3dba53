//! The rule abstraction the eligibility chain is built from.

use std::fmt;

use crate::error::EngineResult;
use crate::models::{LeaveRequest, ReasonCode};
use crate::store::PolicyStore;

/// What a rule sees: the request under evaluation and the store to consult.
pub struct RuleContext<'a> {
    /// Policy data source.
    pub store: &'a dyn PolicyStore,
    /// The linked, dated request.
    pub request: &'a LeaveRequest,
}

/// The verdict of a single rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Not decisive; evaluate the next rule.
    Continue,
    /// Approve now, skipping any remaining rules.
    Approve,
    /// Reject with a policy reason.
    Reject {
        /// Machine-readable code.
        code: ReasonCode,
        /// Reason text carried on the decision.
        reason: String,
    },
    /// Route for manual review.
    Escalate {
        /// Machine-readable code.
        code: ReasonCode,
        /// Trigger text carried on the decision and the notice.
        trigger: String,
    },
}

impl RuleOutcome {
    /// A rejection whose reason text is the code itself.
    pub fn reject(code: ReasonCode) -> Self {
        RuleOutcome::Reject {
            code,
            reason: code.as_str().to_string(),
        }
    }

    /// Returns true if the chain stops here.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RuleOutcome::Continue)
    }
}

impl fmt::Display for RuleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleOutcome::Continue => write!(f, "continue"),
            RuleOutcome::Approve => write!(f, "approve"),
            RuleOutcome::Reject { reason, .. } => write!(f, "reject: {reason}"),
            RuleOutcome::Escalate { trigger, .. } => write!(f, "escalate: {trigger}"),
        }
    }
}

/// One step of the ordered eligibility chain.
pub trait EligibilityRule: Send + Sync {
    /// Stable identifier recorded in the decision trace.
    fn id(&self) -> &'static str;

    /// Human-readable name.
    fn name(&self) -> &'static str;

    /// Evaluates the rule. Store failures propagate as errors.
    fn evaluate(&self, context: &RuleContext<'_>) -> EngineResult<RuleOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_continue_is_non_terminal() {
        assert!(!RuleOutcome::Continue.is_terminal());
        assert!(RuleOutcome::Approve.is_terminal());
        assert!(RuleOutcome::reject(ReasonCode::Restricted).is_terminal());
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(
            RuleOutcome::reject(ReasonCode::InsufficientBalance).to_string(),
            "reject: insufficient_balance"
        );
        let escalate = RuleOutcome::Escalate {
            code: ReasonCode::NonSaturdayOvernight,
            trigger: "non-Saturday overnight".to_string(),
        };
        assert_eq!(escalate.to_string(), "escalate: non-Saturday overnight");
    }
}
