//! SQL schema for the SQLite policy store.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS students (
    admin_number            TEXT PRIMARY KEY,
    first_name              TEXT NOT NULL,
    last_name               TEXT NOT NULL,
    house                   TEXT NOT NULL,
    cohort                  TEXT NOT NULL,   -- 'A'..'E'
    overnight_remaining     INTEGER NOT NULL CHECK (overnight_remaining >= 0),
    friday_supper_remaining INTEGER NOT NULL CHECK (friday_supper_remaining >= 0)
);

CREATE TABLE IF NOT EXISTS guardians (
    auth_id TEXT PRIMARY KEY,
    name    TEXT NOT NULL,
    phone   TEXT,                            -- digits only
    email   TEXT
);

CREATE TABLE IF NOT EXISTS guardian_students (
    auth_id      TEXT NOT NULL REFERENCES guardians(auth_id),
    admin_number TEXT NOT NULL REFERENCES students(admin_number),
    position     INTEGER NOT NULL,
    PRIMARY KEY (auth_id, admin_number)
);

CREATE TABLE IF NOT EXISTS administrators (
    admin_id TEXT PRIMARY KEY,
    unit     TEXT NOT NULL,
    phone    TEXT,                           -- digits only
    email    TEXT
);

CREATE TABLE IF NOT EXISTS restrictions (
    restriction_id   TEXT PRIMARY KEY,
    admin_number     TEXT NOT NULL REFERENCES students(admin_number),
    administrator_id TEXT NOT NULL,
    start_at         TEXT NOT NULL,
    end_at           TEXT NOT NULL,
    reason           TEXT NOT NULL,
    active           INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS leave_register (
    entry_id            TEXT PRIMARY KEY,
    admin_number        TEXT NOT NULL REFERENCES students(admin_number),
    student_name        TEXT NOT NULL,
    house               TEXT NOT NULL,
    cohort              TEXT NOT NULL,
    category            TEXT NOT NULL,   -- LeaveCategory::as_str
    start_at            TEXT NOT NULL,
    end_at              TEXT NOT NULL,
    requested_by        TEXT NOT NULL,
    status              TEXT NOT NULL,   -- LeaveStatus::as_str
    recorded_at         TEXT NOT NULL,
    trigger_reason      TEXT,
    departed_at         TEXT,
    driver_id           TEXT,
    cancelled_by        TEXT,
    cancellation_reason TEXT,
    cancelled_at        TEXT
);

CREATE INDEX IF NOT EXISTS register_student_idx     ON leave_register(admin_number);
CREATE INDEX IF NOT EXISTS restrictions_student_idx ON restrictions(admin_number);
";
