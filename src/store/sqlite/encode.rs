//! Conversions between domain types and the plain-text SQLite columns.
//!
//! Timestamps are stored as `YYYY-MM-DDTHH:MM:SS`, which sorts
//! lexicographically in time order. UUIDs are hyphenated lowercase strings.

use chrono::NaiveDateTime;
use rusqlite::Row;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::{DateWindow, RegisterEntry, Restriction};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Column list matching [`RawEntry::from_row`].
pub const ENTRY_COLUMNS: &str = "entry_id, admin_number, student_name, house, cohort, category, \
     start_at, end_at, requested_by, status, recorded_at, trigger_reason, departed_at, driver_id, \
     cancelled_by, cancellation_reason, cancelled_at";

/// Column list matching [`RawRestriction::from_row`].
pub const RESTRICTION_COLUMNS: &str =
    "restriction_id, admin_number, administrator_id, start_at, end_at, reason, active";

pub fn encode_dt(dt: NaiveDateTime) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

pub fn decode_dt(s: &str) -> StoreResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {s:?}: {e}")))
}

fn decode_opt_dt(s: Option<String>) -> StoreResult<Option<NaiveDateTime>> {
    s.as_deref().map(decode_dt).transpose()
}

pub fn encode_uuid(id: Uuid) -> String {
    id.hyphenated().to_string()
}

pub fn decode_uuid(s: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::Corrupt(format!("bad uuid {s:?}: {e}")))
}

/// Parses a column through the type's `FromStr`.
pub fn decode_parsed<T>(s: &str) -> StoreResult<T>
where
    T: std::str::FromStr<Err = String>,
{
    s.parse().map_err(StoreError::Corrupt)
}

/// A register row as read, before decoding.
pub struct RawEntry {
    entry_id: String,
    admin_number: String,
    student_name: String,
    house: String,
    cohort: String,
    category: String,
    start_at: String,
    end_at: String,
    requested_by: String,
    status: String,
    recorded_at: String,
    trigger_reason: Option<String>,
    departed_at: Option<String>,
    driver_id: Option<String>,
    cancelled_by: Option<String>,
    cancellation_reason: Option<String>,
    cancelled_at: Option<String>,
}

impl RawEntry {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            entry_id: row.get(0)?,
            admin_number: row.get(1)?,
            student_name: row.get(2)?,
            house: row.get(3)?,
            cohort: row.get(4)?,
            category: row.get(5)?,
            start_at: row.get(6)?,
            end_at: row.get(7)?,
            requested_by: row.get(8)?,
            status: row.get(9)?,
            recorded_at: row.get(10)?,
            trigger_reason: row.get(11)?,
            departed_at: row.get(12)?,
            driver_id: row.get(13)?,
            cancelled_by: row.get(14)?,
            cancellation_reason: row.get(15)?,
            cancelled_at: row.get(16)?,
        })
    }

    pub fn decode(self) -> StoreResult<RegisterEntry> {
        let window = DateWindow::new(decode_dt(&self.start_at)?, decode_dt(&self.end_at)?)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(RegisterEntry {
            entry_id: decode_uuid(&self.entry_id)?,
            admin_number: self.admin_number,
            student_name: self.student_name,
            house: self.house,
            cohort: decode_parsed(&self.cohort)?,
            category: decode_parsed(&self.category)?,
            window,
            requested_by: self.requested_by,
            status: decode_parsed(&self.status)?,
            recorded_at: decode_dt(&self.recorded_at)?,
            trigger_reason: self.trigger_reason,
            departed_at: decode_opt_dt(self.departed_at)?,
            driver_id: self.driver_id,
            cancelled_by: self.cancelled_by,
            cancellation_reason: self.cancellation_reason,
            cancelled_at: decode_opt_dt(self.cancelled_at)?,
        })
    }
}

/// A restriction row as read, before decoding.
pub struct RawRestriction {
    restriction_id: String,
    admin_number: String,
    administrator_id: String,
    start_at: String,
    end_at: String,
    reason: String,
    active: bool,
}

impl RawRestriction {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            restriction_id: row.get(0)?,
            admin_number: row.get(1)?,
            administrator_id: row.get(2)?,
            start_at: row.get(3)?,
            end_at: row.get(4)?,
            reason: row.get(5)?,
            active: row.get(6)?,
        })
    }

    pub fn decode(self) -> StoreResult<Restriction> {
        Ok(Restriction {
            restriction_id: decode_uuid(&self.restriction_id)?,
            admin_number: self.admin_number,
            administrator_id: self.administrator_id,
            start: decode_dt(&self.start_at)?,
            end: decode_dt(&self.end_at)?,
            reason: self.reason,
            active: self.active,
        })
    }
}
