//! Backing store abstraction for the canonical dictionary.
//!
//! A store is an append-only table addressed by zero-based slots. Slot
//! assignment is compare-and-swap: `write_row` succeeds only for the slot
//! equal to the current row count, so two writers that computed the same
//! slot cannot both land a row there.

use crate::error::StoreError;
use crate::row::CdrRow;
use cdr_ids::SlotId;
use std::sync::Mutex;

/// Tabular storage behind a [`crate::CanonicalDictionary`].
pub trait DictionaryStore: Send + Sync {
    /// Human-readable location, used in logs.
    fn describe(&self) -> String;

    /// Load every row in slot order.
    fn load_all(&self) -> Result<Vec<CdrRow>, StoreError>;

    /// Number of rows currently stored.
    fn row_count(&self) -> Result<u64, StoreError>;

    /// Write `row` at `slot`. Fails with [`StoreError::SlotConflict`] unless
    /// `slot` is exactly the current end of the table.
    fn write_row(&self, slot: SlotId, row: &CdrRow) -> Result<(), StoreError>;

    /// Read the row stored at `slot`, if any.
    fn read_row(&self, slot: SlotId) -> Result<Option<CdrRow>, StoreError>;

    /// Undo a write at `slot` that failed verification.
    ///
    /// Only the last row may be removed: if the store ends exactly at `slot`
    /// nothing was written and this is a no-op, and if rows exist past `slot`
    /// the call fails with [`StoreError::RollbackRefused`] and leaves the
    /// store untouched. The count check and the removal happen under one lock.
    fn rollback(&self, slot: SlotId) -> Result<(), StoreError>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<CdrRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<CdrRow>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }
}

impl DictionaryStore for MemoryStore {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn load_all(&self) -> Result<Vec<CdrRow>, StoreError> {
        let rows = self.rows.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(rows.clone())
    }

    fn row_count(&self) -> Result<u64, StoreError> {
        let rows = self.rows.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(rows.len() as u64)
    }

    fn write_row(&self, slot: SlotId, row: &CdrRow) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().map_err(|_| StoreError::Poisoned)?;
        let next = SlotId::after(rows.len());
        if slot != next {
            return Err(StoreError::SlotConflict {
                requested: slot,
                next,
            });
        }
        rows.push(row.clone());
        Ok(())
    }

    fn read_row(&self, slot: SlotId) -> Result<Option<CdrRow>, StoreError> {
        let rows = self.rows.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(usize::try_from(slot.index())
            .ok()
            .and_then(|idx| rows.get(idx).cloned()))
    }

    fn rollback(&self, slot: SlotId) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().map_err(|_| StoreError::Poisoned)?;
        match rollback_action(slot, rows.len() as u64)? {
            RollbackAction::Nothing => {}
            RollbackAction::DropLast => {
                rows.pop();
            }
        }
        Ok(())
    }
}

/// What a rollback of `slot` must do given the current row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RollbackAction {
    Nothing,
    DropLast,
}

pub(crate) fn rollback_action(slot: SlotId, rows: u64) -> Result<RollbackAction, StoreError> {
    if rows == slot.index() {
        Ok(RollbackAction::Nothing)
    } else if slot.index().checked_add(1) == Some(rows) {
        Ok(RollbackAction::DropLast)
    } else {
        Err(StoreError::RollbackRefused { slot, rows })
    }
}
