//! The canonical dictionary: an in-memory view over a backing store.
//!
//! Reads go to the cached view under a read lock. Every mutation goes through
//! a [`DictionaryWriter`], which holds the single writer lock for the whole
//! check, slot, write, read-back and commit sequence.

use crate::error::{DictionaryError, DuplicateError, StoreError};
use crate::row::{CdrRow, RowKey};
use crate::store::{DictionaryStore, MemoryStore};
use cdr_ids::{RowUid, SlotId};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, info, warn};

pub struct CanonicalDictionary {
    store: Arc<dyn DictionaryStore>,
    rows: RwLock<Vec<CdrRow>>,
    writer: Mutex<()>,
}

impl std::fmt::Debug for CanonicalDictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanonicalDictionary")
            .field("store", &self.store.describe())
            .field("rows", &self.len())
            .finish()
    }
}

impl CanonicalDictionary {
    /// Load the dictionary from `store`, rejecting duplicate triples or uids.
    pub fn open(store: Arc<dyn DictionaryStore>) -> Result<Self, DictionaryError> {
        let rows = store.load_all()?;
        check_integrity(&rows)?;
        info!(store = %store.describe(), rows = rows.len(), "Opened dictionary");
        Ok(Self {
            store,
            rows: RwLock::new(rows),
            writer: Mutex::new(()),
        })
    }

    /// Empty dictionary over a [`MemoryStore`] (for testing).
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            rows: RwLock::new(Vec::new()),
            writer: Mutex::new(()),
        }
    }

    /// Dictionary over a [`MemoryStore`] seeded with `rows`.
    pub fn with_rows(rows: Vec<CdrRow>) -> Result<Self, DictionaryError> {
        Self::open(Arc::new(MemoryStore::with_rows(rows)))
    }

    pub fn describe(&self) -> String {
        self.store.describe()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<CdrRow>> {
        self.rows.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rows under (concept, context), in insertion order.
    pub fn filter(&self, concept: &str, context: &str) -> Vec<CdrRow> {
        self.read()
            .iter()
            .filter(|row| row.in_scope(concept, context))
            .cloned()
            .collect()
    }

    pub fn find(&self, key: &RowKey) -> Option<CdrRow> {
        self.read().iter().find(|row| row.has_key(key)).cloned()
    }

    pub fn find_by_uid(&self, uid: &RowUid) -> Option<CdrRow> {
        self.read().iter().find(|row| row.uid() == uid).cloned()
    }

    /// Snapshot of every row.
    pub fn rows(&self) -> Vec<CdrRow> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Distinct concepts, first-seen order.
    pub fn concepts(&self) -> Vec<String> {
        let rows = self.read();
        let mut seen = HashSet::new();
        rows.iter()
            .filter(|row| seen.insert(row.concept()))
            .map(|row| row.concept().to_string())
            .collect()
    }

    /// Distinct contexts of `concept`, first-seen order.
    pub fn contexts(&self, concept: &str) -> Vec<String> {
        let rows = self.read();
        let mut seen = HashSet::new();
        rows.iter()
            .filter(|row| row.concept() == concept && seen.insert(row.context()))
            .map(|row| row.context().to_string())
            .collect()
    }

    /// Next free slot, computed from the backing store at call time.
    pub fn next_available_slot(&self) -> Result<SlotId, DictionaryError> {
        Ok(SlotId::new(self.store.row_count()?))
    }

    /// Take the writer lock, reconciling the cached view with the store first.
    pub fn lock_for_write(&self) -> Result<DictionaryWriter<'_>, DictionaryError> {
        let guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let stored = self.store.row_count()?;
        let cached = self.len() as u64;
        if stored != cached {
            let rows = self.store.load_all()?;
            check_integrity(&rows)?;
            debug!(cached, stored, "Dictionary store changed underneath; reloaded");
            *self.rows.write().unwrap_or_else(PoisonError::into_inner) = rows;
        }

        Ok(DictionaryWriter {
            dictionary: self,
            _guard: guard,
        })
    }

    /// Append a row: uniqueness check, write, verify, commit.
    pub fn append(&self, row: CdrRow) -> Result<SlotId, DictionaryError> {
        let writer = self.lock_for_write()?;
        writer.ensure_unique(&row)?;

        let slot = writer.next_slot()?;
        writer.write(slot, &row)?;

        match writer.read_back(slot)? {
            Some(stored) if stored == row => {}
            other => {
                writer.rollback(slot)?;
                return Err(DictionaryError::Integrity(match other {
                    Some(stored) => format!(
                        "slot {} holds '{}' after writing '{}'",
                        slot,
                        stored.long_name(),
                        row.long_name()
                    ),
                    None => format!("slot {} is empty after writing '{}'", slot, row.long_name()),
                }));
            }
        }

        writer.commit(row);
        Ok(slot)
    }
}

/// Exclusive write access to a [`CanonicalDictionary`].
///
/// Dropping the writer without [`DictionaryWriter::commit`] leaves the cached
/// view untouched.
pub struct DictionaryWriter<'a> {
    dictionary: &'a CanonicalDictionary,
    _guard: MutexGuard<'a, ()>,
}

impl DictionaryWriter<'_> {
    /// Fail if the row's triple or uid is already present.
    pub fn ensure_unique(&self, row: &CdrRow) -> Result<(), DuplicateError> {
        let rows = self.dictionary.read();
        for existing in rows.iter() {
            if existing.long_name() == row.long_name() {
                return Err(DuplicateError::Field {
                    long_name: row.long_name().to_string(),
                    existing_uid: existing.uid().clone(),
                });
            }
            if existing.uid() == row.uid() {
                return Err(DuplicateError::Uid {
                    uid: row.uid().clone(),
                    long_name: existing.long_name().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Slot for the next row. Fails with [`StoreError::SlotConflict`] if the
    /// store grew since the uniqueness check ran against the cached view.
    pub fn next_slot(&self) -> Result<SlotId, StoreError> {
        let next = SlotId::new(self.dictionary.store.row_count()?);
        let expected = SlotId::after(self.dictionary.len());
        if next != expected {
            return Err(StoreError::SlotConflict {
                requested: expected,
                next,
            });
        }
        Ok(next)
    }

    pub fn write(&self, slot: SlotId, row: &CdrRow) -> Result<(), StoreError> {
        self.dictionary.store.write_row(slot, row)
    }

    pub fn read_back(&self, slot: SlotId) -> Result<Option<CdrRow>, StoreError> {
        self.dictionary.store.read_row(slot)
    }

    /// Remove the row written at `slot`. Refuses if later rows exist.
    pub fn rollback(&self, slot: SlotId) -> Result<(), StoreError> {
        warn!(slot = %slot, "Rolling back dictionary write");
        self.dictionary.store.rollback(slot)
    }

    /// Publish a verified row to readers.
    pub fn commit(self, row: CdrRow) {
        info!(long_name = row.long_name(), uid = %row.uid(), "Committed canonical row");
        self.dictionary
            .rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(row);
    }
}

fn check_integrity(rows: &[CdrRow]) -> Result<(), DictionaryError> {
    let mut names = HashSet::new();
    let mut uids = HashSet::new();
    for (idx, row) in rows.iter().enumerate() {
        if !names.insert(row.long_name()) {
            return Err(DictionaryError::Integrity(format!(
                "duplicate field '{}' at slot #{}",
                row.long_name(),
                idx
            )));
        }
        if !uids.insert(row.uid()) {
            return Err(DictionaryError::Integrity(format!(
                "duplicate uid '{}' at slot #{}",
                row.uid(),
                idx
            )));
        }
    }
    Ok(())
}
