//! Eligibility decisions for guardian leave requests.
//!
//! The [`EligibilityEngine`] authenticates the sender, parses the message,
//! links the named student and then walks an ordered chain of
//! [`EligibilityRule`]s. The first rule that returns a terminal
//! [`RuleOutcome`] decides the request; if none does, it is approved.
//!
//! Default chain, in order:
//!
//! 1. [`DateValidityRule`]
//! 2. [`OvernightWeekdayRule`]
//! 3. [`DayLeaveExemptionRule`]
//! 4. [`RestrictionRule`]
//! 5. [`BalanceRule`]
//! 6. [`SpecialRequestRule`]

mod balance;
mod date_validity;
mod day_leave;
mod engine;
mod overnight_weekday;
mod restriction;
mod rule;
mod special_request;

pub use balance::BalanceRule;
pub use date_validity::DateValidityRule;
pub use day_leave::DayLeaveExemptionRule;
pub use engine::{EligibilityEngine, InboundMessage};
pub use overnight_weekday::{NON_SATURDAY_OVERNIGHT, OvernightWeekdayRule};
pub use restriction::RestrictionRule;
pub use rule::{EligibilityRule, RuleContext, RuleOutcome};
pub use special_request::{EXPLICIT_SPECIAL_LEAVE, SpecialRequestRule};

/// The standard rule chain.
pub fn default_rules() -> Vec<Box<dyn EligibilityRule>> {
    vec![
        Box::new(DateValidityRule),
        Box::new(OvernightWeekdayRule),
        Box::new(DayLeaveExemptionRule),
        Box::new(RestrictionRule),
        Box::new(BalanceRule),
        Box::new(SpecialRequestRule),
    ]
}
