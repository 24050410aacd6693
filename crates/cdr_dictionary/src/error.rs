//! Error types for dictionary storage and mutation.

use crate::row::RowError;
use cdr_ids::{RowUid, SlotId};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A row would collide with an existing canonical entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DuplicateError {
    #[error("field '{long_name}' already exists (uid {existing_uid})")]
    Field {
        long_name: String,
        existing_uid: RowUid,
    },

    #[error("uid '{uid}' is already assigned to '{long_name}'")]
    Uid { uid: RowUid, long_name: String },
}

/// Errors from a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to acquire store lock {}: {source}", .path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unexpected header in {}: '{found}'", .path.display())]
    Header { path: PathBuf, found: String },

    #[error("Slot {requested} is not the next free slot (next is {next})")]
    SlotConflict { requested: SlotId, next: SlotId },

    #[error("Corrupt record at {location}: {source}")]
    Corrupt {
        location: String,
        #[source]
        source: RowError,
    },

    #[error("Refusing to roll back slot {slot}: store holds {rows} rows, another writer appended after it")]
    RollbackRefused { slot: SlotId, rows: u64 },

    #[error("Store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised by [`crate::CanonicalDictionary`].
#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error(transparent)]
    Duplicate(#[from] DuplicateError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Dictionary integrity violated: {0}")]
    Integrity(String),
}
