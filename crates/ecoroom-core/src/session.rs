//! Working set of stays for one front-end session.
//!
//! The [`Session`] is a cache of the store plus stays proposed but not yet
//! saved. The store stays the owner of record: every mutating operation
//! writes through to it, and every retirement pass reloads the cache.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::calendar::apply_overrides;
use crate::db::{BatchReport, DeleteReport, Store};
use crate::error::{Error, Result};
use crate::feed::ImportCandidate;
use crate::grid;
use crate::model::{CleaningStatus, Origin, RoomId, Stay, StayRecord};
use crate::reconcile::{self, ConsistencyWarning};

/// Fields collected by the add form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StayForm {
    pub room: String,
    pub guest: String,
    pub check_in: NaiveDate,
    pub nights: u32,
    pub door_eco: bool,
    pub plan_eco: bool,
}

/// Changes to an existing stay. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditRequest {
    pub guest: Option<String>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub door_eco: Option<bool>,
    pub plan_eco: Option<bool>,
    /// Hand-picked statuses for interior days.
    pub overrides: BTreeMap<NaiveDate, CleaningStatus>,
}

/// Where a retirement pass gets its deletion set from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "kebab-case")]
pub enum RetirementSource {
    Grid(PathBuf),
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetireRequest {
    pub source: RetirementSource,
    pub reference: NaiveDate,
    /// Copy the store here first; `None` skips the backup.
    pub backup_dir: Option<PathBuf>,
    /// Timestamp used in the backup file name.
    pub stamp: NaiveDateTime,
    /// Run status hygiene at this date once the backup exists.
    pub hygiene: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetirementReport {
    pub source: RetirementSource,
    pub reference: NaiveDate,
    pub backup: Option<PathBuf>,
    /// Stays removed by status hygiene after the backup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hygiene: Option<DeleteReport>,
    pub candidates: BTreeSet<RoomId>,
    pub deleted: DeleteReport,
    pub warnings: Vec<ConsistencyWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub path: PathBuf,
    pub sheets: Vec<String>,
    pub rooms: usize,
}

/// Outcome of the save, publish and retire cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub saved: BatchReport,
    pub published: PublishReport,
    pub retired: RetirementReport,
}

#[derive(Debug, Default)]
pub struct Session {
    records: Vec<StayRecord>,
    pending: BTreeSet<RoomId>,
}

impl Session {
    /// Start a session from the store's current contents.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be read.
    pub fn load(store: &Store) -> Result<Self> {
        Ok(Self {
            records: store.all()?,
            pending: BTreeSet::new(),
        })
    }

    /// Replace the cache with the store's contents. Unsaved proposals are
    /// kept.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be read; the cache is left as it was.
    pub fn reload(&mut self, store: &Store) -> Result<()> {
        let mut records = store.all()?;
        let stored: BTreeSet<RoomId> = records.iter().map(|r| r.room().clone()).collect();
        let pending_records: Vec<StayRecord> = self
            .records
            .drain(..)
            .filter(|r| self.pending.contains(r.room()) && !stored.contains(r.room()))
            .collect();
        self.pending = pending_records.iter().map(|r| r.room().clone()).collect();
        records.extend(pending_records);
        self.records = records;
        Ok(())
    }

    #[must_use]
    pub fn records(&self) -> &[StayRecord] {
        &self.records
    }

    #[must_use]
    pub fn record(&self, room: &RoomId) -> Option<&StayRecord> {
        self.records.iter().find(|r| r.room() == room)
    }

    /// Proposed stays not yet written to the store.
    pub fn pending(&self) -> impl Iterator<Item = &StayRecord> {
        self.records
            .iter()
            .filter(|r| self.pending.contains(r.room()))
    }

    fn is_known(&self, store: &Store, room: &RoomId) -> Result<bool> {
        Ok(self.record(room).is_some() || store.contains(room)?)
    }

    /// Validate a form submission and queue the stay.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty room id, a zero-night stay or
    /// a room that is already registered or queued.
    pub fn propose(&mut self, store: &Store, form: StayForm) -> Result<&StayRecord> {
        let room = RoomId::parse(&form.room)?;
        if form.nights == 0 {
            return Err(Error::invalid("stay length must be at least 1 night"));
        }
        if self.is_known(store, &room)? {
            return Err(Error::duplicate(&room));
        }

        let record = StayRecord::generate(Stay {
            room: room.clone(),
            guest: form.guest.trim().to_string(),
            check_in: form.check_in,
            nights: form.nights,
            door_eco: form.door_eco,
            plan_eco: form.plan_eco,
            origin: Origin::Form,
        })?;
        tracing::debug!(room = %room, nights = form.nights, "stay proposed");
        self.pending.insert(room);
        self.records.push(record);
        Ok(&self.records[self.records.len() - 1])
    }

    /// Queue the selected import candidates. Rooms already in the working
    /// set are skipped. Returns the rooms queued.
    pub fn propose_imported(&mut self, candidates: Vec<ImportCandidate>) -> Vec<RoomId> {
        let mut queued = Vec::new();
        for candidate in candidates.into_iter().filter(|c| c.selected) {
            let room = candidate.record.room().clone();
            if self.record(&room).is_some() {
                tracing::debug!(room = %room, "imported room already in session");
                continue;
            }
            self.pending.insert(room.clone());
            self.records.push(candidate.record);
            queued.push(room);
        }
        queued
    }

    /// Write one queued stay, returning the store's own error on failure.
    /// The stay stays queued when the write fails.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if `room` is not queued, or the error from the
    /// store write.
    pub fn save(&mut self, store: &mut Store, room: &RoomId) -> Result<()> {
        let record = self
            .pending()
            .find(|r| r.room() == room)
            .ok_or_else(|| Error::NotFound(room.clone()))?;
        store.upsert(record)?;
        self.pending.remove(room);
        tracing::info!(room = %room, "stay saved");
        Ok(())
    }

    /// Write every queued stay, each on its own. Failed items stay queued.
    pub fn commit(&mut self, store: &mut Store) -> BatchReport {
        let mut report = BatchReport::default();
        for record in self
            .records
            .iter()
            .filter(|r| self.pending.contains(r.room()))
        {
            let outcome = store.upsert(record);
            report.record(record.room(), outcome);
        }
        for room in &report.saved {
            self.pending.remove(room);
        }
        tracing::info!(
            saved = report.saved.len(),
            failed = report.failed.len(),
            "pending stays committed"
        );
        report
    }

    /// Change a stored stay and rewrite its schedule.
    ///
    /// Hand-edited days that are still interior days of the new dates keep
    /// their status; `request.overrides` are applied on top.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for an unknown room, a validation error for bad
    /// dates or overrides, or a store error; nothing is written on error.
    pub fn edit(
        &mut self,
        store: &mut Store,
        room: &RoomId,
        request: EditRequest,
    ) -> Result<StayRecord> {
        let current = store
            .get(room)?
            .ok_or_else(|| Error::NotFound(room.clone()))?;
        let stay = &current.stay;

        let check_in = request.check_in.unwrap_or(stay.check_in);
        let check_out = match request.check_out.or_else(|| stay.check_out()) {
            Some(date) => date,
            None => return Err(Error::invalid("check-out date is out of range")),
        };
        if check_out <= check_in {
            return Err(Error::invalid(format!(
                "check-out {check_out} must be after check-in {check_in}"
            )));
        }
        let nights = u32::try_from(check_out.signed_duration_since(check_in).num_days())
            .map_err(|_| Error::invalid("stay is too long"))?;

        let mut record = StayRecord::generate(Stay {
            room: room.clone(),
            guest: request
                .guest
                .map_or_else(|| stay.guest.clone(), |g| g.trim().to_string()),
            check_in,
            nights,
            door_eco: request.door_eco.unwrap_or(stay.door_eco),
            plan_eco: request.plan_eco.unwrap_or(stay.plan_eco),
            origin: stay.origin,
        })?;

        let last = record.schedule.len().saturating_sub(1);
        let interior: BTreeSet<NaiveDate> = record
            .schedule
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != 0 && *idx != last)
            .map(|(_, e)| e.date)
            .collect();
        let mut overrides: BTreeMap<NaiveDate, CleaningStatus> = current
            .schedule
            .iter()
            .filter(|e| e.overridden && interior.contains(&e.date))
            .filter_map(|e| e.status.map(|s| (e.date, s)))
            .collect();
        overrides.extend(request.overrides);
        apply_overrides(&mut record.schedule, &overrides)?;

        store.upsert(&record)?;
        tracing::info!(room = %room, nights, overrides = overrides.len(), "stay edited");

        self.pending.remove(room);
        match self.records.iter_mut().find(|r| r.room() == room) {
            Some(slot) => *slot = record.clone(),
            None => self.records.push(record.clone()),
        }
        Ok(record)
    }

    /// Remove one stay from the store and the working set.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the store has no such room.
    pub fn delete(&mut self, store: &mut Store, room: &RoomId) -> Result<DeleteReport> {
        let report = store.delete_many(&BTreeSet::from([room.clone()]))?;
        if report.removed.is_empty() {
            return Err(Error::NotFound(room.clone()));
        }
        self.records.retain(|r| r.room() != room);
        self.pending.remove(room);
        Ok(report)
    }

    /// Project every stored stay and save the grid document to `path`.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be read or the document cannot be written.
    pub fn publish_grid(&self, store: &Store, path: &Path) -> Result<PublishReport> {
        let records = store.all()?;
        let doc = grid::project(&records);
        doc.save(path)?;
        let report = PublishReport {
            path: path.to_path_buf(),
            sheets: doc.sheets.iter().map(|s| s.title.clone()).collect(),
            rooms: records.len(),
        };
        tracing::info!(
            path = %path.display(),
            sheets = report.sheets.len(),
            rooms = report.rooms,
            "grid published"
        );
        Ok(report)
    }

    /// Back up (when asked), run hygiene (when asked), compute the deletion
    /// set, apply it and reload.
    ///
    /// A failed backup aborts before anything is deleted.
    ///
    /// # Errors
    ///
    /// [`Error::Backup`] if the backup fails, or a store error from the
    /// query or delete; the store is unchanged on error.
    pub fn retire(&mut self, store: &mut Store, request: RetireRequest) -> Result<RetirementReport> {
        let backup = request
            .backup_dir
            .as_deref()
            .map(|dir| store.backup(dir, request.stamp))
            .transpose()?;
        let hygiene = request
            .hygiene
            .map(|today| self.startup_hygiene(store, today))
            .transpose()?;

        let mut warnings = Vec::new();
        let candidates = match &request.source {
            RetirementSource::Grid(path) => match reconcile::load_grid_for_retirement(path) {
                Some(doc) => {
                    warnings = reconcile::check_consistency(&doc, &store.all()?);
                    reconcile::retire_by_grid(&doc, request.reference)
                }
                None => BTreeSet::new(),
            },
            RetirementSource::Status => reconcile::retire_by_status(store, request.reference)?,
        };

        let deleted = reconcile::apply(store, &candidates)?;
        self.reload(store)?;

        tracing::info!(
            reference = %request.reference,
            candidates = candidates.len(),
            removed = deleted.removed.len(),
            "retirement pass finished"
        );
        Ok(RetirementReport {
            source: request.source,
            reference: request.reference,
            backup,
            hygiene,
            candidates,
            deleted,
            warnings,
        })
    }

    /// Status-based retirement at `today`, run when the store is opened for
    /// writing. Takes no backup of its own.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be queried or the delete fails.
    pub fn startup_hygiene(&mut self, store: &mut Store, today: NaiveDate) -> Result<DeleteReport> {
        let due = reconcile::retire_by_status(store, today)?;
        let report = reconcile::apply(store, &due)?;
        if !report.removed.is_empty() {
            self.reload(store)?;
            tracing::info!(removed = report.removed.len(), "startup hygiene retired stays");
        }
        Ok(report)
    }

    /// The full sheet cycle: back up, run hygiene at `hygiene` (when given),
    /// save queued stays, publish the grid, then retire by the freshly
    /// published grid at `reference`.
    ///
    /// # Errors
    ///
    /// A failed backup aborts before anything is written. Later failures are
    /// returned as they occur; queued items that failed to save are reported
    /// in the batch report rather than as an error.
    pub fn publish_and_retire(
        &mut self,
        store: &mut Store,
        grid_path: &Path,
        reference: NaiveDate,
        backup_dir: Option<&Path>,
        stamp: NaiveDateTime,
        hygiene: Option<NaiveDate>,
    ) -> Result<CycleReport> {
        let backup = backup_dir.map(|dir| store.backup(dir, stamp)).transpose()?;
        let hygiene = hygiene
            .map(|today| self.startup_hygiene(store, today))
            .transpose()?;
        let saved = self.commit(store);
        let published = self.publish_grid(store, grid_path)?;
        let mut retired = self.retire(
            store,
            RetireRequest {
                source: RetirementSource::Grid(grid_path.to_path_buf()),
                reference,
                backup_dir: None,
                stamp,
                hygiene: None,
            },
        )?;
        retired.backup = backup;
        retired.hygiene = hygiene;
        Ok(CycleReport {
            saved,
            published,
            retired,
        })
    }
}
