//! SQLite schema for the stay store.
//!
//! - `rooms` holds one row per stay, keyed by room number
//! - `cleaning_schedule` holds one row per stay day
//!
//! Dates are stored as `YYYY-MM-DD` text. Version 1 is the table layout of
//! the databases already in use, so those files open and upgrade in place.

/// Migration v1: stay and schedule tables.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS rooms (
    room_number TEXT PRIMARY KEY,
    guest_name TEXT,
    check_in_date DATE,
    cleaning_days INTEGER,
    is_ecodoor BOOLEAN,
    is_ecoplan BOOLEAN
);

CREATE TABLE IF NOT EXISTS cleaning_schedule (
    room_number TEXT,
    cleaning_date DATE,
    cleaning_status TEXT
);
";

/// Migration v2: stay origin, hand-edited schedule days, lookup index.
pub const MIGRATION_V2_SQL: &str = r"
ALTER TABLE rooms ADD COLUMN origin TEXT NOT NULL DEFAULT 'form';
ALTER TABLE rooms ADD COLUMN import_status TEXT;
ALTER TABLE cleaning_schedule ADD COLUMN is_override INTEGER NOT NULL DEFAULT 0;

CREATE INDEX IF NOT EXISTS idx_cleaning_schedule_room_date
    ON cleaning_schedule(room_number, cleaning_date);
";

/// Indexes expected after all migrations.
pub const REQUIRED_INDEXES: &[&str] = &["idx_cleaning_schedule_room_date"];

/// `rooms.origin` value for form-registered stays.
pub const ORIGIN_FORM: &str = "form";
/// `rooms.origin` value for feed-imported stays.
pub const ORIGIN_FEED_IMPORT: &str = "feed-import";

/// Date format of every date column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
