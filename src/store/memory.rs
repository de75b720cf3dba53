//! In-memory policy store.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDateTime, NaiveTime};
use uuid::Uuid;

use super::{
    ApprovalReceipt, CancellationReceipt, CommitOutcome, DateValidity, PolicyStore,
    contact_matches,
};
use crate::config::{
    AdministratorRecord, CalendarConfig, ConfigLoader, GuardianRecord, RosterConfig,
};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    Administrator, Balances, Channel, Cohort, DateWindow, Identity, LeaveCategory, LeaveRequest,
    LeaveStatus, RegisterEntry, Restriction, Subject, select_by_identifier,
};

#[derive(Debug, Default)]
struct State {
    guardians: Vec<GuardianRecord>,
    administrators: Vec<AdministratorRecord>,
    students: BTreeMap<String, Subject>,
    restrictions: Vec<Restriction>,
    register: Vec<RegisterEntry>,
}

impl State {
    fn student_mut(&mut self, admin_number: &str) -> StoreResult<&mut Subject> {
        self.students
            .get_mut(admin_number)
            .ok_or_else(|| StoreError::UnknownSubject(admin_number.to_string()))
    }
}

/// A [`PolicyStore`] holding everything behind a single mutex.
///
/// Each trait method takes the lock once, so every operation is atomic with
/// respect to every other.
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    calendar: CalendarConfig,
    state: Mutex<State>,
}

impl InMemoryPolicyStore {
    /// An empty store with no calendar constraints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a store from roster and calendar data.
    pub fn from_roster(roster: &RosterConfig, calendar: CalendarConfig) -> Self {
        let students = roster
            .students
            .iter()
            .map(|record| {
                (
                    record.admin_number.clone(),
                    Subject {
                        admin_number: record.admin_number.clone(),
                        first_name: record.first_name.clone(),
                        last_name: record.last_name.clone(),
                        house: record.house.clone(),
                        cohort: record.cohort,
                        balances: record.balances,
                    },
                )
            })
            .collect();

        let restrictions = roster
            .restrictions
            .iter()
            .map(|record| Restriction {
                restriction_id: Uuid::new_v4(),
                admin_number: record.admin_number.clone(),
                administrator_id: record.administrator_id.clone(),
                start: record.start.and_time(NaiveTime::MIN),
                end: record.end.and_hms_opt(23, 59, 59).unwrap_or(record.end.and_time(NaiveTime::MIN)),
                reason: record.reason.clone(),
                active: true,
            })
            .collect();

        Self {
            calendar,
            state: Mutex::new(State {
                guardians: roster.guardians.clone(),
                administrators: roster.administrators.clone(),
                students,
                restrictions,
                register: Vec::new(),
            }),
        }
    }

    /// Seeds a store from loaded configuration.
    pub fn from_config(config: &ConfigLoader) -> Self {
        Self::from_roster(config.roster(), config.calendar().clone())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    /// Overwrites a student's balances.
    pub fn set_balances(&self, admin_number: &str, balances: Balances) -> StoreResult<()> {
        self.lock()?.student_mut(admin_number)?.balances = balances;
        Ok(())
    }

    /// A snapshot of the whole register, in insertion order.
    pub fn register(&self) -> StoreResult<Vec<RegisterEntry>> {
        Ok(self.lock()?.register.clone())
    }

    fn authenticate_guardian(&self, contact: &str, channel: Channel) -> StoreResult<Option<Identity>> {
        let state = self.lock()?;
        Ok(state
            .guardians
            .iter()
            .find(|guardian| {
                let (phone, email) = match channel {
                    Channel::WhatsApp => (guardian.phone.as_deref(), None),
                    Channel::Email => (None, guardian.email.as_deref()),
                };
                contact_matches(contact, phone, email)
            })
            .map(|guardian| Identity {
                auth_id: guardian.auth_id.clone(),
                channel,
                contact: contact.trim().to_string(),
            }))
    }
}

impl PolicyStore for InMemoryPolicyStore {
    fn authenticate_by_phone(&self, phone: &str) -> StoreResult<Option<Identity>> {
        self.authenticate_guardian(phone, Channel::WhatsApp)
    }

    fn authenticate_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        self.authenticate_guardian(email, Channel::Email)
    }

    fn authenticate_administrator(&self, contact: &str) -> StoreResult<Option<Administrator>> {
        let state = self.lock()?;
        Ok(state
            .administrators
            .iter()
            .find(|admin| contact_matches(contact, admin.phone.as_deref(), admin.email.as_deref()))
            .map(|admin| Administrator {
                admin_id: admin.admin_id.clone(),
                unit: admin.unit.clone(),
            }))
    }

    fn link_subject(&self, identity_id: &str, identifier: &str) -> StoreResult<Option<Subject>> {
        let state = self.lock()?;
        let Some(guardian) = state.guardians.iter().find(|g| g.auth_id == identity_id) else {
            return Ok(None);
        };
        let linked = guardian
            .students
            .iter()
            .filter_map(|admin_number| state.students.get(admin_number))
            .cloned();
        Ok(select_by_identifier(linked, identifier))
    }

    fn check_date_validity(
        &self,
        cohort: Cohort,
        window: &DateWindow,
    ) -> StoreResult<DateValidity> {
        Ok(self.calendar.check(cohort, window))
    }

    fn check_restriction(&self, admin_number: &str, window: &DateWindow) -> StoreResult<bool> {
        let state = self.lock()?;
        Ok(state
            .restrictions
            .iter()
            .any(|r| r.admin_number == admin_number && r.blocks(window)))
    }

    fn get_balance(
        &self,
        admin_number: &str,
        category: LeaveCategory,
    ) -> StoreResult<Option<u32>> {
        let state = self.lock()?;
        let subject = state
            .students
            .get(admin_number)
            .ok_or_else(|| StoreError::UnknownSubject(admin_number.to_string()))?;
        Ok(subject.balances.for_category(category))
    }

    fn commit_approval(
        &self,
        request: &LeaveRequest,
        recorded_at: NaiveDateTime,
    ) -> StoreResult<CommitOutcome> {
        let mut state = self.lock()?;
        let subject = state.student_mut(&request.subject.admin_number)?;

        let remaining_balance = match request.category {
            LeaveCategory::Overnight => {
                if subject.balances.overnight < 1 {
                    return Ok(CommitOutcome::InsufficientBalance);
                }
                subject.balances.overnight -= 1;
                Some(subject.balances.overnight)
            }
            LeaveCategory::FridaySupper => {
                if subject.balances.friday_supper < 1 {
                    return Ok(CommitOutcome::InsufficientBalance);
                }
                subject.balances.friday_supper -= 1;
                Some(subject.balances.friday_supper)
            }
            LeaveCategory::DayLeave | LeaveCategory::Special => None,
        };

        let entry = RegisterEntry::for_request(request, LeaveStatus::Approved, recorded_at, None);
        state.register.push(entry.clone());
        Ok(CommitOutcome::Committed(ApprovalReceipt {
            entry,
            remaining_balance,
        }))
    }

    fn record_special_pending(
        &self,
        request: &LeaveRequest,
        trigger: &str,
        recorded_at: NaiveDateTime,
    ) -> StoreResult<RegisterEntry> {
        let mut state = self.lock()?;
        state.student_mut(&request.subject.admin_number)?;
        let entry = RegisterEntry::for_request(
            request,
            LeaveStatus::SpecialPending,
            recorded_at,
            Some(trigger.to_string()),
        );
        state.register.push(entry.clone());
        Ok(entry)
    }

    fn commit_cancellation(
        &self,
        admin_number: &str,
        administrator_id: &str,
        reason: &str,
        at: NaiveDateTime,
    ) -> StoreResult<Option<CancellationReceipt>> {
        let mut state = self.lock()?;
        state.student_mut(admin_number)?;

        let Some(index) = state
            .register
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.admin_number == admin_number && entry.is_cancellable())
            .max_by_key(|(_, entry)| entry.window.start)
            .map(|(index, _)| index)
        else {
            return Ok(None);
        };

        let entry = &mut state.register[index];
        entry.status = LeaveStatus::Cancelled;
        entry.cancelled_by = Some(administrator_id.to_string());
        entry.cancellation_reason = Some(reason.to_string());
        entry.cancelled_at = Some(at);
        let entry = entry.clone();

        let subject = state.student_mut(admin_number)?;
        let balance_after = match entry.category {
            LeaveCategory::Overnight => {
                subject.balances.overnight += 1;
                Some(subject.balances.overnight)
            }
            LeaveCategory::FridaySupper => {
                subject.balances.friday_supper += 1;
                Some(subject.balances.friday_supper)
            }
            LeaveCategory::DayLeave | LeaveCategory::Special => None,
        };

        Ok(Some(CancellationReceipt {
            refunded: balance_after.map(|_| entry.category),
            entry,
            balance_after,
        }))
    }

    fn set_restriction(
        &self,
        administrator_id: &str,
        admin_number: &str,
        window: &DateWindow,
        reason: &str,
    ) -> StoreResult<Restriction> {
        let mut state = self.lock()?;
        state.student_mut(admin_number)?;
        let restriction = Restriction {
            restriction_id: Uuid::new_v4(),
            admin_number: admin_number.to_string(),
            administrator_id: administrator_id.to_string(),
            start: window.start,
            end: window.end,
            reason: reason.to_string(),
            active: true,
        };
        state.restrictions.push(restriction.clone());
        Ok(restriction)
    }

    fn query_balances(&self, admin_number: &str) -> StoreResult<Option<Balances>> {
        let state = self.lock()?;
        Ok(state.students.get(admin_number).map(|s| s.balances))
    }

    fn query_history(&self, admin_number: &str, limit: usize) -> StoreResult<Vec<RegisterEntry>> {
        let state = self.lock()?;
        let mut entries: Vec<RegisterEntry> = state
            .register
            .iter()
            .filter(|entry| entry.admin_number == admin_number)
            .cloned()
            .collect();
        // Newest first; ties keep reverse insertion order.
        entries.reverse();
        entries.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        entries.truncate(limit);
        Ok(entries)
    }

    fn record_departure(
        &self,
        admin_number: &str,
        at: NaiveDateTime,
        driver_id: &str,
    ) -> StoreResult<Option<RegisterEntry>> {
        let mut state = self.lock()?;
        let Some(entry) = state
            .register
            .iter_mut()
            .find(|entry| entry.admin_number == admin_number && entry.is_active_at(at))
        else {
            return Ok(None);
        };
        entry.departed_at = Some(at);
        entry.driver_id = Some(driver_id.to_string());
        Ok(Some(entry.clone()))
    }

    fn active_leaves(
        &self,
        admin_number: &str,
        at: NaiveDateTime,
    ) -> StoreResult<Vec<RegisterEntry>> {
        let state = self.lock()?;
        Ok(state
            .register
            .iter()
            .filter(|entry| entry.admin_number == admin_number && entry.is_active_at(at))
            .cloned()
            .collect())
    }
}
