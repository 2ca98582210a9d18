//! Stay persistence keyed by room number.
//!
//! Every stay is written as one `rooms` row plus its full set of
//! `cleaning_schedule` rows. Writes of a single stay and deletes of a whole
//! retirement set each run in one transaction.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::schema::{DATE_FORMAT, ORIGIN_FEED_IMPORT, ORIGIN_FORM};
use super::{configure_connection, migrations, open_store};
use crate::error::{Error, Result};
use crate::model::{CleaningStatus, Origin, RoomId, ScheduleEntry, Stay, StayRecord};

/// Backup file name prefix; the stamp and `.db` follow.
pub const BACKUP_PREFIX: &str = "hotel_cleaning_backup_";
const BACKUP_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Outcome of a batch delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    /// Rooms whose stay row was removed.
    pub removed: Vec<RoomId>,
    /// Requested rooms that had no stay row.
    pub missing: Vec<RoomId>,
}

/// A batch item that was not written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub room: RoomId,
    pub code: &'static str,
    pub reason: String,
}

/// Per-item outcome of a batch upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub saved: Vec<RoomId>,
    pub failed: Vec<ItemFailure>,
}

impl BatchReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub(crate) fn record(&mut self, room: &RoomId, outcome: Result<()>) {
        match outcome {
            Ok(()) => self.saved.push(room.clone()),
            Err(e) => {
                tracing::warn!(room = %room, error = %e, "stay not saved");
                self.failed.push(ItemFailure {
                    room: room.clone(),
                    code: e.code().code(),
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// Handle to the stay database.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

struct RoomRow {
    room: String,
    guest: Option<String>,
    check_in: Option<String>,
    days: Option<i64>,
    door_eco: Option<bool>,
    plan_eco: Option<bool>,
    origin: String,
    import_status: Option<String>,
}

struct ScheduleRow {
    date: String,
    status: Option<String>,
    is_override: bool,
}

const ROOM_COLUMNS: &str = "room_number, guest_name, check_in_date, cleaning_days, \
                            is_ecodoor, is_ecoplan, origin, import_status";

fn room_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RoomRow> {
    Ok(RoomRow {
        room: row.get(0)?,
        guest: row.get(1)?,
        check_in: row.get(2)?,
        days: row.get(3)?,
        door_eco: row.get(4)?,
        plan_eco: row.get(5)?,
        origin: row.get(6)?,
        import_status: row.get(7)?,
    })
}

fn corrupt(room: &str, detail: impl Into<String>) -> Error {
    Error::Corrupt {
        room: room.to_string(),
        detail: detail.into(),
    }
}

fn parse_date(room: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|e| corrupt(room, format!("bad date '{raw}': {e}")))
}

fn parse_status(room: &str, raw: Option<&str>) -> Result<Option<CleaningStatus>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(code) => CleaningStatus::from_code(code)
            .map(Some)
            .ok_or_else(|| corrupt(room, format!("unknown status code '{code}'"))),
    }
}

fn parse_room(raw: &str) -> Result<RoomId> {
    RoomId::parse(raw).map_err(|e| corrupt(raw, e.to_string()))
}

impl RoomRow {
    fn decode(self, schedule: Vec<ScheduleRow>) -> Result<StayRecord> {
        let id = &self.room;
        let room = parse_room(id)?;
        let check_in = self
            .check_in
            .as_deref()
            .ok_or_else(|| corrupt(id, "missing check-in date"))
            .and_then(|raw| parse_date(id, raw))?;
        let nights = self
            .days
            .ok_or_else(|| corrupt(id, "missing stay length"))
            .and_then(|d| {
                u32::try_from(d).map_err(|_| corrupt(id, format!("bad stay length {d}")))
            })?;
        let origin = match self.origin.as_str() {
            ORIGIN_FORM => Origin::Form,
            ORIGIN_FEED_IMPORT => {
                let interior = parse_status(id, self.import_status.as_deref())?
                    .ok_or_else(|| corrupt(id, "feed-import stay without interior status"))?;
                Origin::FeedImport { interior }
            }
            other => return Err(corrupt(id, format!("unknown origin '{other}'"))),
        };

        let schedule = schedule
            .into_iter()
            .map(|row| -> Result<ScheduleEntry> {
                Ok(ScheduleEntry {
                    date: parse_date(id, &row.date)?,
                    status: parse_status(id, row.status.as_deref())?,
                    overridden: row.is_override,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(StayRecord {
            stay: Stay {
                room,
                guest: self.guest.unwrap_or_default(),
                check_in,
                nights,
                door_eco: self.door_eco.unwrap_or(false),
                plan_eco: self.plan_eco.unwrap_or(false),
                origin,
            },
            schedule,
        })
    }
}

fn load_schedule(conn: &Connection, room: &str) -> Result<Vec<ScheduleRow>> {
    let mut stmt = conn.prepare_cached(
        "SELECT cleaning_date, cleaning_status, is_override
         FROM cleaning_schedule
         WHERE room_number = ?1
         ORDER BY cleaning_date",
    )?;
    let rows = stmt
        .query_map(params![room], |row| {
            Ok(ScheduleRow {
                date: row.get(0)?,
                status: row.get(1)?,
                is_override: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn write_record(tx: &Transaction<'_>, record: &StayRecord) -> rusqlite::Result<()> {
    let stay = &record.stay;
    let import_status = match stay.origin {
        Origin::Form => None,
        Origin::FeedImport { interior } => Some(interior.as_str()),
    };
    tx.execute(
        &format!(
            "INSERT OR REPLACE INTO rooms ({ROOM_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        ),
        params![
            stay.room.as_str(),
            stay.guest,
            stay.check_in.format(DATE_FORMAT).to_string(),
            i64::from(stay.nights),
            stay.door_eco,
            stay.plan_eco,
            stay.origin.as_str(),
            import_status,
        ],
    )?;
    tx.execute(
        "DELETE FROM cleaning_schedule WHERE room_number = ?1",
        params![stay.room.as_str()],
    )?;

    let mut insert = tx.prepare_cached(
        "INSERT INTO cleaning_schedule (room_number, cleaning_date, cleaning_status, is_override)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for entry in &record.schedule {
        insert.execute(params![
            stay.room.as_str(),
            entry.date.format(DATE_FORMAT).to_string(),
            entry.status.map(CleaningStatus::as_str),
            entry.overridden,
        ])?;
    }
    Ok(())
}

impl Store {
    /// Open the store file, creating and migrating it as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            conn: open_store(path)?,
            path: Some(path.to_path_buf()),
        })
    }

    /// Private in-memory store, used by tests and dry runs.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        configure_connection(&conn)?;
        migrations::migrate(&mut conn)?;
        Ok(Self { conn, path: None })
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Every stay with its schedule, ordered by room number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on query failure and [`Error::Corrupt`] for a
    /// row that cannot be decoded.
    pub fn all(&self) -> Result<Vec<StayRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ROOM_COLUMNS} FROM rooms ORDER BY room_number"))?;
        let rooms = stmt
            .query_map([], room_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut records = rooms
            .into_iter()
            .map(|row| {
                let schedule = load_schedule(&self.conn, &row.room)?;
                row.decode(schedule)
            })
            .collect::<Result<Vec<_>>>()?;
        records.sort_by_key(|r| r.room().sort_key());
        Ok(records)
    }

    /// One stay, or `None` when the room is not registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] or [`Error::Corrupt`] as for [`Self::all`].
    pub fn get(&self, room: &RoomId) -> Result<Option<StayRecord>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE room_number = ?1"),
                params![room.as_str()],
                room_row,
            )
            .optional()?;
        row.map(|row| {
            let schedule = load_schedule(&self.conn, &row.room)?;
            row.decode(schedule)
        })
        .transpose()
    }

    /// # Errors
    ///
    /// Returns [`Error::Store`] on query failure.
    pub fn contains(&self, room: &RoomId) -> Result<bool> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM rooms WHERE room_number = ?1)",
            params![room.as_str()],
            |row| row.get(0),
        )?)
    }

    /// Registered room ids.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on query failure and [`Error::Corrupt`] for an
    /// unusable room id.
    pub fn room_ids(&self) -> Result<BTreeSet<RoomId>> {
        let mut stmt = self.conn.prepare("SELECT room_number FROM rooms")?;
        let raw = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw.iter().map(|r| parse_room(r)).collect()
    }

    /// Replace the stay row and its whole schedule in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the write fails; nothing is changed.
    pub fn upsert(&mut self, record: &StayRecord) -> Result<()> {
        let tx = self.conn.transaction()?;
        write_record(&tx, record)?;
        tx.commit()?;
        tracing::debug!(
            room = %record.room(),
            entries = record.schedule.len(),
            "stay saved"
        );
        Ok(())
    }

    /// Upsert each record independently and report per-item outcomes.
    pub fn upsert_many(&mut self, records: &[StayRecord]) -> BatchReport {
        let mut report = BatchReport::default();
        for record in records {
            let outcome = self.upsert(record);
            report.record(record.room(), outcome);
        }
        report
    }

    /// Delete every listed stay and its schedule in one transaction.
    ///
    /// For each room the schedule rows go first, then the stay row. Any
    /// failure rolls back the whole set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if a statement or the commit fails.
    pub fn delete_many(&mut self, rooms: &BTreeSet<RoomId>) -> Result<DeleteReport> {
        let mut report = DeleteReport::default();
        if rooms.is_empty() {
            return Ok(report);
        }

        let tx = self.conn.transaction()?;
        {
            let mut drop_schedule =
                tx.prepare_cached("DELETE FROM cleaning_schedule WHERE room_number = ?1")?;
            let mut drop_room = tx.prepare_cached("DELETE FROM rooms WHERE room_number = ?1")?;
            for room in rooms {
                drop_schedule.execute(params![room.as_str()])?;
                if drop_room.execute(params![room.as_str()])? > 0 {
                    report.removed.push(room.clone());
                } else {
                    report.missing.push(room.clone());
                }
            }
        }
        tx.commit()?;

        tracing::info!(
            removed = report.removed.len(),
            missing = report.missing.len(),
            "stays deleted"
        );
        Ok(report)
    }

    /// Rooms due for status-based retirement at `cutoff` (inclusive).
    ///
    /// A room qualifies when it has a `C/O` day on or before the cutoff,
    /// when it has no schedule rows at all, or when any schedule row has an
    /// empty status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on query failure and [`Error::Corrupt`] for an
    /// unusable room id.
    pub fn status_retirement_candidates(&self, cutoff: NaiveDate) -> Result<BTreeSet<RoomId>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.room_number
             FROM cleaning_schedule s
             JOIN rooms r ON r.room_number = s.room_number
             WHERE trim(s.cleaning_status) = ?1 AND s.cleaning_date <= ?2
             UNION
             SELECT r.room_number
             FROM rooms r
             WHERE NOT EXISTS (
                 SELECT 1 FROM cleaning_schedule s WHERE s.room_number = r.room_number
             )
             UNION
             SELECT s.room_number
             FROM cleaning_schedule s
             JOIN rooms r ON r.room_number = s.room_number
             WHERE s.cleaning_status IS NULL OR trim(s.cleaning_status) = ''",
        )?;
        let raw = stmt
            .query_map(
                params![
                    CleaningStatus::CheckOut.as_str(),
                    cutoff.format(DATE_FORMAT).to_string()
                ],
                |row| row.get::<_, String>(0),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw.iter().map(|r| parse_room(r)).collect()
    }

    /// Copy the database file to `dir/hotel_cleaning_backup_<stamp>.db`.
    ///
    /// The WAL is checkpointed first so the copy is self-contained.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backup`] if the store has no file, the directory
    /// cannot be created or the copy fails.
    pub fn backup(&self, dir: &Path, stamp: NaiveDateTime) -> Result<PathBuf> {
        let Some(source) = self.path.as_deref() else {
            return Err(Error::Backup("in-memory store has no file to copy".into()));
        };
        self.conn
            .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;

        std::fs::create_dir_all(dir)
            .map_err(|e| Error::Backup(format!("create {}: {e}", dir.display())))?;
        let target = dir.join(format!(
            "{BACKUP_PREFIX}{}.db",
            stamp.format(BACKUP_STAMP_FORMAT)
        ));
        std::fs::copy(source, &target).map_err(|e| {
            Error::Backup(format!(
                "copy {} to {}: {e}",
                source.display(),
                target.display()
            ))
        })?;

        tracing::info!(backup = %target.display(), "store backed up");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn room(id: &str) -> RoomId {
        RoomId::parse(id).expect("room")
    }

    fn record(id: &str, check_in: NaiveDate, nights: u32) -> StayRecord {
        StayRecord::generate(Stay {
            room: room(id),
            guest: format!("guest {id}"),
            check_in,
            nights,
            door_eco: false,
            plan_eco: true,
            origin: Origin::Form,
        })
        .expect("generate")
    }

    #[test]
    fn upsert_then_get_preserves_the_record() {
        let mut store = Store::open_in_memory().expect("store");
        let mut rec = record("305", date(2024, 7, 10), 5);
        rec.schedule[2].status = Some(CleaningStatus::EcoDoor);
        rec.schedule[2].overridden = true;
        store.upsert(&rec).expect("upsert");

        let loaded = store.get(&room("305")).expect("get").expect("present");
        assert_eq!(loaded, rec);
        assert!(store.get(&room("999")).expect("get").is_none());
    }

    #[test]
    fn upsert_replaces_the_whole_schedule() {
        let mut store = Store::open_in_memory().expect("store");
        store.upsert(&record("101", date(2024, 7, 1), 6)).expect("first");
        store.upsert(&record("101", date(2024, 7, 3), 2)).expect("second");

        let loaded = store.get(&room("101")).expect("get").expect("present");
        assert_eq!(loaded.schedule.len(), 3);
        assert_eq!(loaded.schedule[0].date, date(2024, 7, 3));
    }

    #[test]
    fn feed_import_origin_round_trips() {
        let mut store = Store::open_in_memory().expect("store");
        let rec = StayRecord::generate(Stay {
            room: room("206"),
            guest: String::new(),
            check_in: date(2024, 7, 1),
            nights: 2,
            door_eco: true,
            plan_eco: false,
            origin: Origin::FeedImport {
                interior: CleaningStatus::EcoDoor,
            },
        })
        .expect("generate");
        store.upsert(&rec).expect("upsert");
        assert_eq!(store.get(&room("206")).expect("get"), Some(rec));
    }

    #[test]
    fn all_orders_numeric_rooms_first() {
        let mut store = Store::open_in_memory().expect("store");
        for id in ["B1", "1001", "205", "A1"] {
            store.upsert(&record(id, date(2024, 7, 1), 2)).expect("upsert");
        }
        let ids: Vec<String> = store
            .all()
            .expect("all")
            .iter()
            .map(|r| r.room().to_string())
            .collect();
        assert_eq!(ids, vec!["205", "1001", "A1", "B1"]);
    }

    #[test]
    fn unknown_status_code_is_corrupt() {
        let mut store = Store::open_in_memory().expect("store");
        store.upsert(&record("101", date(2024, 7, 1), 2)).expect("upsert");
        store
            .connection()
            .execute(
                "UPDATE cleaning_schedule SET cleaning_status = 'vacuum' WHERE cleaning_date = '2024-07-02'",
                [],
            )
            .expect("tamper");
        assert!(matches!(store.all(), Err(Error::Corrupt { .. })));
    }

    #[test]
    fn empty_status_loads_as_none() {
        let mut store = Store::open_in_memory().expect("store");
        store.upsert(&record("101", date(2024, 7, 1), 2)).expect("upsert");
        store
            .connection()
            .execute(
                "UPDATE cleaning_schedule SET cleaning_status = '  ' WHERE cleaning_date = '2024-07-02'",
                [],
            )
            .expect("tamper");
        let loaded = store.get(&room("101")).expect("get").expect("present");
        assert_eq!(loaded.schedule[1].status, None);
    }

    #[test]
    fn delete_many_reports_removed_and_missing() {
        let mut store = Store::open_in_memory().expect("store");
        store.upsert(&record("101", date(2024, 7, 1), 2)).expect("upsert");
        store.upsert(&record("102", date(2024, 7, 1), 2)).expect("upsert");

        let report = store
            .delete_many(&BTreeSet::from([room("101"), room("999")]))
            .expect("delete");
        assert_eq!(report.removed, vec![room("101")]);
        assert_eq!(report.missing, vec![room("999")]);

        let orphans: i64 = store
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM cleaning_schedule WHERE room_number = '101'",
                [],
                |row| row.get(0),
            )
            .expect("count");
        assert_eq!(orphans, 0);
        assert_eq!(store.room_ids().expect("ids"), BTreeSet::from([room("102")]));
    }

    #[test]
    fn failed_delete_rolls_back_the_whole_set() {
        let mut store = Store::open_in_memory().expect("store");
        store.upsert(&record("101", date(2024, 7, 1), 2)).expect("upsert");
        store.upsert(&record("102", date(2024, 7, 1), 3)).expect("upsert");
        store
            .connection()
            .execute_batch(
                "CREATE TRIGGER keep_102 BEFORE DELETE ON rooms
                 WHEN OLD.room_number = '102'
                 BEGIN SELECT RAISE(ABORT, 'boom'); END;",
            )
            .expect("trigger");

        let count = |store: &Store, table: &str| -> i64 {
            store
                .connection()
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .expect("count")
        };
        let rooms_before = count(&store, "rooms");
        let schedule_before = count(&store, "cleaning_schedule");

        let err = store
            .delete_many(&BTreeSet::from([room("101"), room("102")]))
            .expect_err("trigger aborts the second delete");
        assert!(matches!(err, Error::Store(_)), "{err:?}");

        // 101 was deleted first inside the transaction and must be back
        assert_eq!(count(&store, "rooms"), rooms_before);
        assert_eq!(count(&store, "cleaning_schedule"), schedule_before);
        assert_eq!(
            store.get(&room("101")).expect("get"),
            Some(record("101", date(2024, 7, 1), 2))
        );
    }

    #[test]
    fn status_candidates_cover_all_three_rules() {
        let mut store = Store::open_in_memory().expect("store");
        // checked out on the cutoff
        store.upsert(&record("101", date(2024, 7, 10), 5)).expect("upsert");
        // still in house
        store.upsert(&record("102", date(2024, 7, 14), 3)).expect("upsert");
        // starts after the cutoff
        store.upsert(&record("103", date(2024, 7, 20), 2)).expect("upsert");
        // no schedule rows
        store.upsert(&record("104", date(2024, 7, 20), 2)).expect("upsert");
        store
            .connection()
            .execute("DELETE FROM cleaning_schedule WHERE room_number = '104'", [])
            .expect("strip schedule");
        // one empty status
        store.upsert(&record("105", date(2024, 7, 20), 2)).expect("upsert");
        store
            .connection()
            .execute(
                "UPDATE cleaning_schedule SET cleaning_status = NULL
                 WHERE room_number = '105' AND cleaning_date = '2024-07-21'",
                [],
            )
            .expect("blank status");

        let due = store
            .status_retirement_candidates(date(2024, 7, 15))
            .expect("candidates");
        assert_eq!(due, BTreeSet::from([room("101"), room("104"), room("105")]));
    }

    #[test]
    fn backup_copies_the_database_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut store = Store::open(&dir.path().join("hotel_cleaning.db")).expect("store");
        store.upsert(&record("101", date(2024, 7, 1), 2)).expect("upsert");

        let stamp = date(2024, 7, 15).and_hms_opt(9, 30, 5).expect("time");
        let backup = store
            .backup(&dir.path().join("backups"), stamp)
            .expect("backup");
        assert_eq!(
            backup.file_name().and_then(|n| n.to_str()),
            Some("hotel_cleaning_backup_20240715_093005.db")
        );

        let copy = Store::open(&backup).expect("open backup");
        assert_eq!(copy.room_ids().expect("ids"), BTreeSet::from([room("101")]));
    }

    #[test]
    fn in_memory_store_cannot_be_backed_up() {
        let store = Store::open_in_memory().expect("store");
        let dir = tempfile::tempdir().expect("temp dir");
        let stamp = date(2024, 7, 15).and_hms_opt(0, 0, 0).expect("time");
        assert!(matches!(
            store.backup(dir.path(), stamp),
            Err(Error::Backup(_))
        ));
    }
}
