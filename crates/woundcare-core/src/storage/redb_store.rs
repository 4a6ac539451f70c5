//! # redb-backed Wound Storage
//!
//! A disk-backed [`WoundStore`] using the redb embedded database.
//!
//! - ACID transactions (every write is one transaction)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Records are encoded with postcard. Treatments are keyed by
//! `(wound_id, treatment_id)` so a wound's history is one range scan and
//! a cascade delete stays inside the wound's key range.

use crate::store::{StageWrite, WoundStore};
use crate::system::ClinicalStage;
use crate::{
    NewTreatment, NewWound, Treatment, TreatmentId, Wound, WoundId, WoundcareError,
    sort_most_recent_first,
};
use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for wounds: WoundId(u64) -> serialized Wound bytes
const WOUNDS: TableDefinition<u64, &[u8]> = TableDefinition::new("wounds");

/// Table for treatments: (wound_id, treatment_id) -> serialized Treatment bytes
const TREATMENTS: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("treatments");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const NEXT_WOUND_ID: &str = "next_wound_id";
const NEXT_TREATMENT_ID: &str = "next_treatment_id";

fn io_err(e: impl std::fmt::Display) -> WoundcareError {
    WoundcareError::IoError(e.to_string())
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, WoundcareError> {
    postcard::to_allocvec(value).map_err(|e| WoundcareError::SerializationError(e.to_string()))
}

fn decode<'a, T: serde::Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, WoundcareError> {
    postcard::from_bytes(bytes).map_err(|e| WoundcareError::DeserializationError(e.to_string()))
}

/// A disk-backed wound store using redb.
pub struct RedbStore {
    /// The redb database handle.
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a wound database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WoundcareError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        let write_txn = db.begin_write().map_err(io_err)?;
        {
            let _ = write_txn.open_table(WOUNDS).map_err(io_err)?;
            let _ = write_txn.open_table(TREATMENTS).map_err(io_err)?;
            let _ = write_txn.open_table(METADATA).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;

        Ok(Self { db })
    }

    /// Allocate the next id for `key` inside an open write transaction.
    fn next_id(txn: &redb::WriteTransaction, key: &str) -> Result<u64, WoundcareError> {
        let mut meta = txn.open_table(METADATA).map_err(io_err)?;
        let current = meta
            .get(key)
            .map_err(io_err)?
            .map(|v| v.value())
            .unwrap_or(0);
        meta.insert(key, current.saturating_add(1))
            .map_err(io_err)?;
        Ok(current)
    }
}

// =============================================================================
// WOUNDSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl WoundStore for RedbStore {
    fn insert_wound(
        &mut self,
        new: NewWound,
        now: DateTime<Utc>,
    ) -> Result<Wound, WoundcareError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let id = WoundId(Self::next_id(&write_txn, NEXT_WOUND_ID)?);
        let wound = Wound::register(id, new, now);
        let bytes = encode(&wound)?;
        {
            let mut table = write_txn.open_table(WOUNDS).map_err(io_err)?;
            table.insert(id.0, bytes.as_slice()).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(wound)
    }

    fn get_wound(&self, id: WoundId) -> Result<Option<Wound>, WoundcareError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(WOUNDS).map_err(io_err)?;
        match table.get(id.0).map_err(io_err)? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    fn list_wounds(&self) -> Result<Vec<Wound>, WoundcareError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(WOUNDS).map_err(io_err)?;

        let mut wounds = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            wounds.push(decode(value.value())?);
        }
        Ok(wounds)
    }

    fn replace_wound(&mut self, wound: &Wound) -> Result<(), WoundcareError> {
        let bytes = encode(wound)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(WOUNDS).map_err(io_err)?;
            let exists = table.get(wound.id.0).map_err(io_err)?.is_some();
            if !exists {
                return Err(WoundcareError::WoundNotFound(wound.id));
            }
            table.insert(wound.id.0, bytes.as_slice()).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }

    fn delete_wound(&mut self, id: WoundId) -> Result<bool, WoundcareError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut wounds = write_txn.open_table(WOUNDS).map_err(io_err)?;
            let removed = wounds.remove(id.0).map_err(io_err)?.is_some();
            if !removed {
                return Ok(false);
            }

            let mut treatments = write_txn.open_table(TREATMENTS).map_err(io_err)?;
            let mut keys = Vec::new();
            for entry in treatments
                .range((id.0, 0)..=(id.0, u64::MAX))
                .map_err(io_err)?
            {
                let (key, _) = entry.map_err(io_err)?;
                keys.push(key.value());
            }
            for key in keys {
                treatments.remove(key).map_err(io_err)?;
            }
        }
        write_txn.commit().map_err(io_err)?;
        Ok(true)
    }

    fn insert_treatment(
        &mut self,
        wound_id: WoundId,
        new: NewTreatment,
        now: DateTime<Utc>,
    ) -> Result<Treatment, WoundcareError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let wounds = write_txn.open_table(WOUNDS).map_err(io_err)?;
            if wounds.get(wound_id.0).map_err(io_err)?.is_none() {
                return Err(WoundcareError::WoundNotFound(wound_id));
            }
        }

        let id = TreatmentId(Self::next_id(&write_txn, NEXT_TREATMENT_ID)?);
        let treatment = Treatment {
            id,
            wound_id,
            created_at: now,
            notes: new.notes,
            performed_by: new.performed_by,
        };
        let bytes = encode(&treatment)?;
        {
            let mut table = write_txn.open_table(TREATMENTS).map_err(io_err)?;
            table
                .insert((wound_id.0, id.0), bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(treatment)
    }

    fn list_treatments_by_wound(&self, id: WoundId) -> Result<Vec<Treatment>, WoundcareError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(TREATMENTS).map_err(io_err)?;

        let mut list = Vec::new();
        for entry in table.range((id.0, 0)..=(id.0, u64::MAX)).map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            list.push(decode::<Treatment>(value.value())?);
        }
        sort_most_recent_first(&mut list);
        Ok(list)
    }

    fn set_stage_if(
        &mut self,
        id: WoundId,
        expected: ClinicalStage,
        stage: ClinicalStage,
        now: DateTime<Utc>,
    ) -> Result<StageWrite, WoundcareError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let outcome = {
            let mut table = write_txn.open_table(WOUNDS).map_err(io_err)?;
            let stored = table
                .get(id.0)
                .map_err(io_err)?
                .map(|guard| decode::<Wound>(guard.value()))
                .transpose()?;

            match stored {
                None => StageWrite::Missing,
                Some(wound) if wound.clinical_stage != expected => StageWrite::Conflict {
                    current: wound.clinical_stage,
                },
                Some(mut wound) => {
                    wound.clinical_stage = stage;
                    wound.updated_at = now;
                    let bytes = encode(&wound)?;
                    table.insert(id.0, bytes.as_slice()).map_err(io_err)?;
                    StageWrite::Applied
                }
            }
        };

        if outcome == StageWrite::Applied {
            write_txn.commit().map_err(io_err)?;
        } else {
            write_txn.abort().map_err(io_err)?;
        }
        Ok(outcome)
    }

    fn wound_count(&self) -> Result<usize, WoundcareError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(WOUNDS).map_err(io_err)?;
        Ok(table.len().map_err(io_err)? as usize)
    }

    fn treatment_count(&self) -> Result<usize, WoundcareError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(TREATMENTS).map_err(io_err)?;
        Ok(table.len().map_err(io_err)? as usize)
    }
}

// =============================================================================
// TESTS
// =============================================================================
