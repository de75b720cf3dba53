//! [`SqlitePolicyStore`], the SQLite implementation of [`PolicyStore`].

mod encode;
mod schema;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDateTime, NaiveTime};
use rusqlite::{Connection, OptionalExtension as _, Transaction, params};
use tracing::debug;
use uuid::Uuid;

use super::{
    ApprovalReceipt, CancellationReceipt, CommitOutcome, DateValidity, PolicyStore,
    normalize_phone,
};
use crate::config::{CalendarConfig, ConfigLoader, RosterConfig};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    Administrator, Balances, Channel, Cohort, DateWindow, Identity, LeaveCategory, LeaveRequest,
    LeaveStatus, RegisterEntry, Restriction, Subject, select_by_identifier,
};

use encode::{
    ENTRY_COLUMNS, RESTRICTION_COLUMNS, RawEntry, RawRestriction, decode_parsed, encode_dt,
    encode_uuid,
};
use schema::SCHEMA;

/// The balance column charged for `category`, if any.
fn balance_column(category: LeaveCategory) -> Option<&'static str> {
    match category {
        LeaveCategory::Overnight => Some("overnight_remaining"),
        LeaveCategory::FridaySupper => Some("friday_supper_remaining"),
        LeaveCategory::DayLeave | LeaveCategory::Special => None,
    }
}

/// A policy store backed by a single SQLite database.
///
/// Balance deductions use a conditional `UPDATE ... WHERE col >= 1` inside
/// the same transaction as the register insert.
pub struct SqlitePolicyStore {
    conn: Mutex<Connection>,
    calendar: CalendarConfig,
}

impl SqlitePolicyStore {
    /// Opens (or creates) a store at `path` and runs schema initialisation.
    pub fn open(path: impl AsRef<Path>, calendar: CalendarConfig) -> StoreResult<Self> {
        Self::init(Connection::open(path)?, calendar)
    }

    /// Opens an in-memory database; useful for tests.
    pub fn open_in_memory(calendar: CalendarConfig) -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?, calendar)
    }

    /// Opens a store and seeds it from loaded configuration.
    pub fn from_config(path: Option<&Path>, config: &ConfigLoader) -> StoreResult<Self> {
        let store = match path {
            Some(path) => Self::open(path, config.calendar().clone())?,
            None => Self::open_in_memory(config.calendar().clone())?,
        };
        store.seed(config.roster())?;
        Ok(store)
    }

    fn init(conn: Connection, calendar: CalendarConfig) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            calendar,
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("sqlite connection lock poisoned".to_string()))
    }

    /// Loads roster data.
    ///
    /// Existing students keep their stored balances; contact details are
    /// refreshed; identical restrictions are not duplicated.
    pub fn seed(&self, roster: &RosterConfig) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        for student in &roster.students {
            tx.execute(
                "INSERT INTO students (admin_number, first_name, last_name, house, cohort,
                                       overnight_remaining, friday_supper_remaining)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(admin_number) DO UPDATE SET
                     first_name = excluded.first_name,
                     last_name  = excluded.last_name,
                     house      = excluded.house,
                     cohort     = excluded.cohort",
                params![
                    student.admin_number,
                    student.first_name,
                    student.last_name,
                    student.house,
                    student.cohort.to_string(),
                    student.balances.overnight,
                    student.balances.friday_supper,
                ],
            )?;
        }

        for guardian in &roster.guardians {
            tx.execute(
                "INSERT INTO guardians (auth_id, name, phone, email) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(auth_id) DO UPDATE SET
                     name = excluded.name, phone = excluded.phone, email = excluded.email",
                params![
                    guardian.auth_id,
                    guardian.name,
                    guardian.phone.as_deref().map(normalize_phone),
                    guardian.email,
                ],
            )?;
            for (position, admin_number) in guardian.students.iter().enumerate() {
                tx.execute(
                    "INSERT OR IGNORE INTO guardian_students (auth_id, admin_number, position)
                     VALUES (?1, ?2, ?3)",
                    params![guardian.auth_id, admin_number, position as i64],
                )?;
            }
        }

        for admin in &roster.administrators {
            tx.execute(
                "INSERT INTO administrators (admin_id, unit, phone, email) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(admin_id) DO UPDATE SET
                     unit = excluded.unit, phone = excluded.phone, email = excluded.email",
                params![
                    admin.admin_id,
                    admin.unit,
                    admin.phone.as_deref().map(normalize_phone),
                    admin.email,
                ],
            )?;
        }

        for restriction in &roster.restrictions {
            let start = encode_dt(restriction.start.and_time(NaiveTime::MIN));
            let end = encode_dt(
                restriction
                    .end
                    .and_hms_opt(23, 59, 59)
                    .unwrap_or(restriction.end.and_time(NaiveTime::MIN)),
            );
            tx.execute(
                "INSERT INTO restrictions
                     (restriction_id, admin_number, administrator_id, start_at, end_at, reason, active)
                 SELECT ?1, ?2, ?3, ?4, ?5, ?6, 1
                 WHERE NOT EXISTS (
                     SELECT 1 FROM restrictions
                     WHERE admin_number = ?2 AND administrator_id = ?3
                       AND start_at = ?4 AND end_at = ?5 AND reason = ?6)",
                params![
                    encode_uuid(Uuid::new_v4()),
                    restriction.admin_number,
                    restriction.administrator_id,
                    start,
                    end,
                    restriction.reason,
                ],
            )?;
        }

        tx.commit()?;
        debug!(
            students = roster.students.len(),
            guardians = roster.guardians.len(),
            "seeded sqlite policy store"
        );
        Ok(())
    }

    fn authenticate_guardian(&self, contact: &str, channel: Channel) -> StoreResult<Option<Identity>> {
        let conn = self.lock()?;
        let auth_id: Option<String> = match channel {
            Channel::WhatsApp => {
                let digits = normalize_phone(contact);
                if digits.is_empty() || contact.contains('@') {
                    return Ok(None);
                }
                conn.query_row(
                    "SELECT auth_id FROM guardians WHERE phone = ?1",
                    params![digits],
                    |r| r.get(0),
                )
                .optional()?
            }
            Channel::Email => conn
                .query_row(
                    "SELECT auth_id FROM guardians WHERE lower(email) = lower(?1)",
                    params![contact.trim()],
                    |r| r.get(0),
                )
                .optional()?,
        };
        Ok(auth_id.map(|auth_id| Identity {
            auth_id,
            channel,
            contact: contact.trim().to_string(),
        }))
    }

    fn student_exists(tx: &Transaction<'_>, admin_number: &str) -> StoreResult<bool> {
        Ok(tx
            .query_row(
                "SELECT 1 FROM students WHERE admin_number = ?1",
                params![admin_number],
                |_| Ok(()),
            )
            .optional()?
            .is_some())
    }

    fn require_student(tx: &Transaction<'_>, admin_number: &str) -> StoreResult<()> {
        if Self::student_exists(tx, admin_number)? {
            Ok(())
        } else {
            Err(StoreError::UnknownSubject(admin_number.to_string()))
        }
    }

    fn insert_entry(tx: &Transaction<'_>, entry: &RegisterEntry) -> StoreResult<()> {
        tx.execute(
            &format!(
                "INSERT INTO leave_register ({ENTRY_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
            ),
            params![
                encode_uuid(entry.entry_id),
                entry.admin_number,
                entry.student_name,
                entry.house,
                entry.cohort.to_string(),
                entry.category.as_str(),
                encode_dt(entry.window.start),
                encode_dt(entry.window.end),
                entry.requested_by,
                entry.status.as_str(),
                encode_dt(entry.recorded_at),
                entry.trigger_reason,
                entry.departed_at.map(encode_dt),
                entry.driver_id,
                entry.cancelled_by,
                entry.cancellation_reason,
                entry.cancelled_at.map(encode_dt),
            ],
        )?;
        Ok(())
    }

    fn entries_where(
        conn: &Connection,
        clause: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> StoreResult<Vec<RegisterEntry>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM leave_register WHERE {clause}"
        ))?;
        let raws = stmt
            .query_map(params, RawEntry::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawEntry::decode).collect()
    }
}

impl PolicyStore for SqlitePolicyStore {
    fn authenticate_by_phone(&self, phone: &str) -> StoreResult<Option<Identity>> {
        self.authenticate_guardian(phone, Channel::WhatsApp)
    }

    fn authenticate_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        self.authenticate_guardian(email, Channel::Email)
    }

    fn authenticate_administrator(&self, contact: &str) -> StoreResult<Option<Administrator>> {
        let conn = self.lock()?;
        let contact = contact.trim();
        let row: Option<(String, String)> = if contact.contains('@') {
            conn.query_row(
                "SELECT admin_id, unit FROM administrators WHERE lower(email) = lower(?1)",
                params![contact],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?
        } else {
            let digits = normalize_phone(contact);
            if digits.is_empty() {
                return Ok(None);
            }
            conn.query_row(
                "SELECT admin_id, unit FROM administrators WHERE phone = ?1",
                params![digits],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?
        };
        Ok(row.map(|(admin_id, unit)| Administrator { admin_id, unit }))
    }

    fn link_subject(&self, identity_id: &str, identifier: &str) -> StoreResult<Option<Subject>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT s.admin_number, s.first_name, s.last_name, s.house, s.cohort,
                    s.overnight_remaining, s.friday_supper_remaining
             FROM guardian_students gs
             JOIN students s ON s.admin_number = gs.admin_number
             WHERE gs.auth_id = ?1
             ORDER BY gs.position",
        )?;
        let rows = stmt
            .query_map(params![identity_id], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, u32>(5)?,
                    r.get::<_, u32>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut linked = Vec::with_capacity(rows.len());
        for (admin_number, first_name, last_name, house, cohort, overnight, friday_supper) in rows {
            linked.push(Subject {
                admin_number,
                first_name,
                last_name,
                house,
                cohort: decode_parsed(&cohort)?,
                balances: Balances {
                    overnight,
                    friday_supper,
                },
            });
        }
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
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RESTRICTION_COLUMNS} FROM restrictions WHERE admin_number = ?1 AND active = 1"
        ))?;
        let raws = stmt
            .query_map(params![admin_number], RawRestriction::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for raw in raws {
            if raw.decode()?.blocks(window) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn get_balance(
        &self,
        admin_number: &str,
        category: LeaveCategory,
    ) -> StoreResult<Option<u32>> {
        let conn = self.lock()?;
        let balances: Option<(u32, u32)> = conn
            .query_row(
                "SELECT overnight_remaining, friday_supper_remaining
                 FROM students WHERE admin_number = ?1",
                params![admin_number],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        let (overnight, friday_supper) =
            balances.ok_or_else(|| StoreError::UnknownSubject(admin_number.to_string()))?;
        Ok(Balances {
            overnight,
            friday_supper,
        }
        .for_category(category))
    }

    fn commit_approval(
        &self,
        request: &LeaveRequest,
        recorded_at: NaiveDateTime,
    ) -> StoreResult<CommitOutcome> {
        let admin_number = request.subject.admin_number.as_str();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let remaining_balance = match balance_column(request.category) {
            Some(column) => {
                let updated = tx.execute(
                    &format!(
                        "UPDATE students SET {column} = {column} - 1
                         WHERE admin_number = ?1 AND {column} >= 1"
                    ),
                    params![admin_number],
                )?;
                if updated == 0 {
                    Self::require_student(&tx, admin_number)?;
                    return Ok(CommitOutcome::InsufficientBalance);
                }
                let remaining: u32 = tx.query_row(
                    &format!("SELECT {column} FROM students WHERE admin_number = ?1"),
                    params![admin_number],
                    |r| r.get(0),
                )?;
                Some(remaining)
            }
            None => {
                Self::require_student(&tx, admin_number)?;
                None
            }
        };

        let entry = RegisterEntry::for_request(request, LeaveStatus::Approved, recorded_at, None);
        Self::insert_entry(&tx, &entry)?;
        tx.commit()?;

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
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::require_student(&tx, &request.subject.admin_number)?;
        let entry = RegisterEntry::for_request(
            request,
            LeaveStatus::SpecialPending,
            recorded_at,
            Some(trigger.to_string()),
        );
        Self::insert_entry(&tx, &entry)?;
        tx.commit()?;
        Ok(entry)
    }

    fn commit_cancellation(
        &self,
        admin_number: &str,
        administrator_id: &str,
        reason: &str,
        at: NaiveDateTime,
    ) -> StoreResult<Option<CancellationReceipt>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::require_student(&tx, admin_number)?;

        let raw = tx
            .query_row(
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM leave_register
                     WHERE admin_number = ?1 AND status = ?2 AND departed_at IS NULL
                     ORDER BY start_at DESC LIMIT 1"
                ),
                params![admin_number, LeaveStatus::Approved.as_str()],
                RawEntry::from_row,
            )
            .optional()?;
        let Some(mut entry) = raw.map(RawEntry::decode).transpose()? else {
            return Ok(None);
        };

        tx.execute(
            "UPDATE leave_register
             SET status = ?2, cancelled_by = ?3, cancellation_reason = ?4, cancelled_at = ?5
             WHERE entry_id = ?1",
            params![
                encode_uuid(entry.entry_id),
                LeaveStatus::Cancelled.as_str(),
                administrator_id,
                reason,
                encode_dt(at),
            ],
        )?;
        entry.status = LeaveStatus::Cancelled;
        entry.cancelled_by = Some(administrator_id.to_string());
        entry.cancellation_reason = Some(reason.to_string());
        entry.cancelled_at = Some(at);

        let balance_after = match balance_column(entry.category) {
            Some(column) => {
                tx.execute(
                    &format!("UPDATE students SET {column} = {column} + 1 WHERE admin_number = ?1"),
                    params![admin_number],
                )?;
                let balance: u32 = tx.query_row(
                    &format!("SELECT {column} FROM students WHERE admin_number = ?1"),
                    params![admin_number],
                    |r| r.get(0),
                )?;
                Some(balance)
            }
            None => None,
        };
        tx.commit()?;

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
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::require_student(&tx, admin_number)?;
        let restriction = Restriction {
            restriction_id: Uuid::new_v4(),
            admin_number: admin_number.to_string(),
            administrator_id: administrator_id.to_string(),
            start: window.start,
            end: window.end,
            reason: reason.to_string(),
            active: true,
        };
        tx.execute(
            &format!(
                "INSERT INTO restrictions ({RESTRICTION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            ),
            params![
                encode_uuid(restriction.restriction_id),
                restriction.admin_number,
                restriction.administrator_id,
                encode_dt(restriction.start),
                encode_dt(restriction.end),
                restriction.reason,
                restriction.active,
            ],
        )?;
        tx.commit()?;
        Ok(restriction)
    }

    fn query_balances(&self, admin_number: &str) -> StoreResult<Option<Balances>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT overnight_remaining, friday_supper_remaining
                 FROM students WHERE admin_number = ?1",
                params![admin_number],
                |r| {
                    Ok(Balances {
                        overnight: r.get(0)?,
                        friday_supper: r.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    fn query_history(&self, admin_number: &str, limit: usize) -> StoreResult<Vec<RegisterEntry>> {
        let conn = self.lock()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        Self::entries_where(
            &conn,
            "admin_number = ?1 ORDER BY recorded_at DESC, rowid DESC LIMIT ?2",
            params![admin_number, limit],
        )
    }

    fn record_departure(
        &self,
        admin_number: &str,
        at: NaiveDateTime,
        driver_id: &str,
    ) -> StoreResult<Option<RegisterEntry>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let at_str = encode_dt(at);
        let raw = tx
            .query_row(
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM leave_register
                     WHERE admin_number = ?1 AND status = ?2 AND departed_at IS NULL
                       AND start_at <= ?3 AND end_at >= ?3
                     ORDER BY start_at LIMIT 1"
                ),
                params![admin_number, LeaveStatus::Approved.as_str(), at_str],
                RawEntry::from_row,
            )
            .optional()?;
        let Some(mut entry) = raw.map(RawEntry::decode).transpose()? else {
            return Ok(None);
        };

        tx.execute(
            "UPDATE leave_register SET departed_at = ?2, driver_id = ?3 WHERE entry_id = ?1",
            params![encode_uuid(entry.entry_id), at_str, driver_id],
        )?;
        tx.commit()?;

        entry.departed_at = Some(at);
        entry.driver_id = Some(driver_id.to_string());
        Ok(Some(entry))
    }

    fn active_leaves(
        &self,
        admin_number: &str,
        at: NaiveDateTime,
    ) -> StoreResult<Vec<RegisterEntry>> {
        let conn = self.lock()?;
        Self::entries_where(
            &conn,
            "admin_number = ?1 AND status = ?2 AND departed_at IS NULL
             AND start_at <= ?3 AND end_at >= ?3 ORDER BY start_at",
            params![admin_number, LeaveStatus::Approved.as_str(), encode_dt(at)],
        )
    }
}
