//! The request pipeline: authenticate, parse, link, evaluate, commit.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    Channel, DateWindow, Decision, Identity, LeaveCategory, LeaveRequest, LeaveStatus, ReasonCode,
    RuleStep, SubjectSummary,
};
use crate::notify::{Notifier, SpecialLeaveNotice};
use crate::parsing::parse;
use crate::store::{CommitOutcome, PolicyStore};

use super::{EligibilityRule, RuleContext, RuleOutcome, default_rules};

/// A guardian message as delivered by a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Free-text message body.
    pub text: String,
    /// Phone number or email address of the sender.
    pub sender: String,
    /// Channel the message arrived on.
    pub channel: Channel,
}

/// Fields learned along the way, copied onto whatever decision is reached.
#[derive(Debug, Default)]
struct Progress {
    subject: Option<SubjectSummary>,
    category: Option<LeaveCategory>,
    window: Option<DateWindow>,
    trace: Vec<RuleStep>,
}

impl Progress {
    fn apply(self, mut decision: Decision) -> Decision {
        decision.subject = decision.subject.or(self.subject);
        decision.category = decision.category.or(self.category);
        decision.window = decision.window.or(self.window);
        decision.trace = self.trace;
        decision
    }
}

/// Decides guardian leave requests.
///
/// The engine holds no per-request state; concurrent calls are safe as long
/// as the store's operations are individually atomic.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use chrono::NaiveDateTime;
/// use exeat_engine::config::ConfigLoader;
/// use exeat_engine::eligibility::{EligibilityEngine, InboundMessage};
/// use exeat_engine::models::{Channel, DecisionStatus};
/// use exeat_engine::notify::LogNotifier;
/// use exeat_engine::store::InMemoryPolicyStore;
///
/// let config = ConfigLoader::load("config/michaelhouse").unwrap();
/// let engine = EligibilityEngine::new(
///     Arc::new(InMemoryPolicyStore::from_config(&config)),
///     Arc::new(LogNotifier),
/// );
/// let message = InboundMessage {
///     text: "Overnight leave for James this Saturday please".to_string(),
///     sender: "27603174174".to_string(),
///     channel: Channel::WhatsApp,
/// };
/// let now = NaiveDateTime::parse_from_str("2025-02-06 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
/// let decision = engine.process(&message, now);
/// assert_eq!(decision.status, DecisionStatus::Approved);
/// assert_eq!(decision.remaining_balance, Some(2));
/// ```
pub struct EligibilityEngine {
    store: Arc<dyn PolicyStore>,
    notifier: Arc<dyn Notifier>,
    rules: Vec<Box<dyn EligibilityRule>>,
}

impl EligibilityEngine {
    /// Creates an engine with the default rule chain.
    pub fn new(store: Arc<dyn PolicyStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_rules(store, notifier, default_rules())
    }

    /// Creates an engine with a custom rule chain.
    pub fn with_rules(
        store: Arc<dyn PolicyStore>,
        notifier: Arc<dyn Notifier>,
        rules: Vec<Box<dyn EligibilityRule>>,
    ) -> Self {
        Self {
            store,
            notifier,
            rules,
        }
    }

    /// The store decisions are committed to.
    pub fn store(&self) -> &Arc<dyn PolicyStore> {
        &self.store
    }

    /// Decides one message as of `now`.
    ///
    /// Never fails: every error becomes a terminal [`Decision`].
    pub fn process(&self, message: &InboundMessage, now: NaiveDateTime) -> Decision {
        let request_id = Uuid::new_v4();
        let span = info_span!("leave_request", %request_id, channel = %message.channel);
        let _guard = span.enter();

        let mut progress = Progress::default();
        let decision = match self.evaluate(message, now, &mut progress) {
            Ok(decision) => decision,
            Err(error) => {
                if error.reason_code() == ReasonCode::PersistenceFailed {
                    warn!(error = %error, "policy store failed");
                }
                failure_decision(error)
            }
        };
        let decision = progress.apply(decision);

        info!(
            status = %decision.status,
            reason = decision.reason.as_deref().unwrap_or("-"),
            admin_number = decision
                .subject
                .as_ref()
                .map(|subject| subject.admin_number.as_str())
                .unwrap_or("-"),
            "decision reached"
        );
        decision
    }

    fn evaluate(
        &self,
        message: &InboundMessage,
        now: NaiveDateTime,
        progress: &mut Progress,
    ) -> EngineResult<Decision> {
        let identity = self.authenticate(message)?;
        debug!(auth_id = %identity.auth_id, "sender authenticated");

        let parsed = parse(&message.text, now);
        progress.category = Some(parsed.category);
        progress.window = parsed.window;

        let identifier = parsed
            .subject_identifier
            .ok_or(EngineError::ParseFailure { missing: "student" })?;
        let subject = self
            .store
            .link_subject(&identity.auth_id, &identifier)?
            .ok_or(EngineError::LinkageFailure { identifier })?;
        progress.subject = Some(subject.summary());

        let window = parsed
            .window
            .ok_or(EngineError::ParseFailure { missing: "dates" })?;
        let mut request = LeaveRequest::new(subject, identity, parsed.category, window);
        debug!(
            admin_number = %request.subject.admin_number,
            category = %request.category,
            window = %request.window,
            "request parsed"
        );

        for (index, rule) in self.rules.iter().enumerate() {
            let outcome = rule.evaluate(&RuleContext {
                store: self.store.as_ref(),
                request: &request,
            })?;
            debug!(rule_id = rule.id(), outcome = %outcome, "rule evaluated");
            progress.trace.push(RuleStep {
                step_number: u32::try_from(index + 1).unwrap_or(u32::MAX),
                rule_id: rule.id().to_string(),
                rule_name: rule.name().to_string(),
                outcome: outcome.to_string(),
            });

            match outcome {
                RuleOutcome::Continue => {}
                RuleOutcome::Approve => return self.approve(&mut request, now),
                RuleOutcome::Reject { code, reason } => {
                    request.transition(LeaveStatus::Rejected);
                    return Err(EngineError::PolicyViolation { code, reason });
                }
                RuleOutcome::Escalate { code, trigger } => {
                    return self.escalate(&mut request, code, &trigger, now);
                }
            }
        }

        self.approve(&mut request, now)
    }

    fn authenticate(&self, message: &InboundMessage) -> EngineResult<Identity> {
        let identity = match message.channel {
            Channel::WhatsApp => self.store.authenticate_by_phone(&message.sender)?,
            Channel::Email => self.store.authenticate_by_email(&message.sender)?,
        };
        identity.ok_or_else(|| EngineError::AuthenticationFailure {
            contact: message.sender.clone(),
        })
    }

    fn approve(&self, request: &mut LeaveRequest, now: NaiveDateTime) -> EngineResult<Decision> {
        match self.store.commit_approval(request, now)? {
            CommitOutcome::Committed(receipt) => {
                request.transition(LeaveStatus::Approved);
                let mut explanation = format!(
                    "{} leave approved for {}: {}.",
                    request.category,
                    request.subject.full_name(),
                    request.window
                );
                if let Some(remaining) = receipt.remaining_balance {
                    explanation.push_str(&format!(" {remaining} remaining this term."));
                }
                let mut decision = Decision::approved(explanation);
                decision.remaining_balance = receipt.remaining_balance;
                decision.entry_id = Some(receipt.entry.entry_id);
                Ok(decision)
            }
            CommitOutcome::InsufficientBalance => {
                // Another request spent the last unit after the balance rule ran.
                request.transition(LeaveStatus::Rejected);
                Err(EngineError::PolicyViolation {
                    code: ReasonCode::InsufficientBalance,
                    reason: ReasonCode::InsufficientBalance.as_str().to_string(),
                })
            }
        }
    }

    fn escalate(
        &self,
        request: &mut LeaveRequest,
        code: ReasonCode,
        trigger: &str,
        now: NaiveDateTime,
    ) -> EngineResult<Decision> {
        let entry = self.store.record_special_pending(request, trigger, now)?;
        request.transition(LeaveStatus::SpecialPending);

        let notice = SpecialLeaveNotice::for_request(request, entry.entry_id, trigger);
        if let Err(error) = self.notifier.notify(&notice) {
            warn!(entry_id = %entry.entry_id, error = %error, "special leave notice not delivered");
        }

        let mut decision = Decision::special_pending(
            code,
            trigger,
            format!(
                "The request for {} has been forwarded to the {} housemaster for review ({}).",
                request.subject.full_name(),
                request.subject.house,
                trigger
            ),
        );
        decision.entry_id = Some(entry.entry_id);
        decision.notice = Some(notice);
        Ok(decision)
    }
}

fn describe(code: ReasonCode) -> &'static str {
    match code {
        ReasonCode::Restricted => "The student is under a leave restriction for these dates",
        ReasonCode::InsufficientBalance => "No leave of this type remains for the student",
        ReasonCode::DateInvalid => "Leave is not permitted on these dates",
        ReasonCode::ClosedPeriod => "These dates fall on a closed weekend",
        ReasonCode::NonSaturdayOvernight => "Overnight leave must start on a Saturday",
        _ => "The request does not meet leave policy",
    }
}

/// Maps an error to the terminal decision it stands for.
fn failure_decision(error: EngineError) -> Decision {
    let code = error.reason_code();
    match error {
        EngineError::PolicyViolation { code, reason } => {
            let explanation = if reason == code.as_str() {
                format!("{}.", describe(code))
            } else {
                format!("{}: {reason}.", describe(code))
            };
            Decision::rejected(code, reason, explanation)
        }
        failure @ (EngineError::AuthenticationFailure { .. } | EngineError::LinkageFailure { .. }) => {
            Decision::rejected(code, code.as_str(), failure.to_string())
        }
        other => Decision::error(code, other.to_string()),
    }
}
