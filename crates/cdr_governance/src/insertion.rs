//! Approved insertion of new canonical rows.
//!
//! Every step runs under the dictionary writer lock: validate, re-check
//! uniqueness, compute the slot, write, read back and compare, then commit.
//! A failed write or verification is rolled back before returning, so no
//! error path leaves a partially written row behind. A write refused because
//! another writer took the slot is returned as is.

use cdr_dictionary::naming::is_camel_case;
use cdr_dictionary::{
    derive_long_name, CanonicalDictionary, CdrRow, DataType, DictionaryError, DictionaryWriter,
    DuplicateError, StoreError,
};
use cdr_ids::{RowUid, SlotId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// A steward-approved request to add a canonical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertionRequest {
    pub concept: String,
    pub context: String,
    pub field_name: String,
    pub definition: String,
    pub data_type: DataType,
    /// Issued by the steward; never generated.
    pub uid: String,
    /// When supplied, must equal the derived long name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
}

impl InsertionRequest {
    pub fn new(
        concept: impl Into<String>,
        context: impl Into<String>,
        field_name: impl Into<String>,
        definition: impl Into<String>,
        data_type: DataType,
        uid: impl Into<String>,
    ) -> Self {
        Self {
            concept: concept.into(),
            context: context.into(),
            field_name: field_name.into(),
            definition: definition.into(),
            data_type,
            uid: uid.into(),
            long_name: None,
            approved_by: None,
        }
    }

    pub fn with_long_name(mut self, long_name: impl Into<String>) -> Self {
        self.long_name = Some(long_name.into());
        self
    }

    pub fn approved_by(mut self, approver: impl Into<String>) -> Self {
        self.approved_by = Some(approver.into());
        self
    }

    pub fn derived_long_name(&self) -> String {
        derive_long_name(&self.concept, &self.context, &self.field_name)
    }
}

/// Outcome of a committed insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertionReceipt {
    pub row: CdrRow,
    pub slot: SlotId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    pub committed_at: DateTime<Utc>,
}

/// The write could not be completed and verified.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Dictionary unavailable: {0}")]
    Unavailable(#[source] DictionaryError),

    #[error("Write to slot {slot} failed: {source}")]
    WriteFailed {
        slot: SlotId,
        #[source]
        source: StoreError,
    },

    #[error("Read-back of slot {slot} failed: {source}")]
    ReadbackFailed {
        slot: SlotId,
        #[source]
        source: StoreError,
    },

    #[error("Slot {slot} is empty after writing '{expected}'")]
    ReadbackMissing { slot: SlotId, expected: String },

    #[error("Slot {slot} holds '{found}' after writing '{expected}'")]
    ReadbackMismatch {
        slot: SlotId,
        expected: String,
        found: String,
    },

    #[error("Rollback of slot {slot} failed after '{cause}': {source}")]
    RollbackFailed {
        slot: SlotId,
        cause: String,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Error)]
pub enum InsertionError {
    #[error("Invalid insertion request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Duplicate(#[from] DuplicateError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Mediates approved insertions into the dictionary.
#[derive(Debug, Clone)]
pub struct InsertionCoordinator {
    dictionary: Arc<CanonicalDictionary>,
}

impl InsertionCoordinator {
    pub fn new(dictionary: Arc<CanonicalDictionary>) -> Self {
        Self { dictionary }
    }

    pub fn insert(&self, request: &InsertionRequest) -> Result<InsertionReceipt, InsertionError> {
        let row = build_row(request)?;

        let writer = self
            .dictionary
            .lock_for_write()
            .map_err(|e| match e {
                DictionaryError::Duplicate(dup) => InsertionError::Duplicate(dup),
                other => PersistenceError::Unavailable(other).into(),
            })?;

        if let Err(dup) = writer.ensure_unique(&row) {
            warn!(long_name = row.long_name(), uid = %row.uid(), "Insertion rejected: {}", dup);
            return Err(dup.into());
        }

        let slot = writer.next_slot().map_err(|source| {
            PersistenceError::Unavailable(DictionaryError::Store(source))
        })?;

        if let Err(source) = writer.write(slot, &row) {
            // A refused slot belongs to another writer; nothing of ours landed.
            let refused = matches!(source, StoreError::SlotConflict { .. });
            let failure = PersistenceError::WriteFailed { slot, source };
            if refused {
                error!(slot = %slot, "Insertion lost its slot to another writer");
                return Err(failure.into());
            }
            return Err(rollback(&writer, slot, failure).into());
        }

        let verified = match writer.read_back(slot) {
            Ok(Some(stored)) if stored == row => Ok(()),
            Ok(Some(stored)) => Err(PersistenceError::ReadbackMismatch {
                slot,
                expected: describe(&row),
                found: describe(&stored),
            }),
            Ok(None) => Err(PersistenceError::ReadbackMissing {
                slot,
                expected: describe(&row),
            }),
            Err(source) => Err(PersistenceError::ReadbackFailed { slot, source }),
        };
        if let Err(failure) = verified {
            return Err(rollback(&writer, slot, failure).into());
        }

        writer.commit(row.clone());
        info!(
            long_name = row.long_name(),
            uid = %row.uid(),
            slot = %slot,
            approved_by = request.approved_by.as_deref().unwrap_or("unknown"),
            "Inserted canonical field"
        );

        Ok(InsertionReceipt {
            row,
            slot,
            approved_by: request.approved_by.clone(),
            committed_at: Utc::now(),
        })
    }
}

fn describe(row: &CdrRow) -> String {
    format!(
        "{} [{}, uid {}]",
        row.long_name(),
        row.data_type(),
        row.uid()
    )
}

/// Undo a failed write. Returns the error to report: the original failure,
/// or a rollback failure that wraps it.
fn rollback(writer: &DictionaryWriter<'_>, slot: SlotId, failure: PersistenceError) -> PersistenceError {
    match writer.rollback(slot) {
        Ok(()) => {
            warn!(slot = %slot, "Rolled back failed insertion: {}", failure);
            failure
        }
        Err(source) => {
            error!(slot = %slot, "Rollback failed: {}", source);
            PersistenceError::RollbackFailed {
                slot,
                cause: failure.to_string(),
                source,
            }
        }
    }
}

fn build_row(request: &InsertionRequest) -> Result<CdrRow, InsertionError> {
    let invalid = |msg: String| InsertionError::InvalidRequest(msg);

    for (field, value) in [
        ("concept", &request.concept),
        ("context", &request.context),
        ("field_name", &request.field_name),
        ("definition", &request.definition),
        ("uid", &request.uid),
    ] {
        if value.trim().is_empty() {
            return Err(invalid(format!("{} is required", field)));
        }
    }

    if !is_camel_case(&request.field_name) {
        return Err(invalid(format!(
            "field name '{}' is not camelCase",
            request.field_name
        )));
    }

    let uid = RowUid::parse(&request.uid).map_err(|e| invalid(e.to_string()))?;

    let row = CdrRow::new(
        request.concept.clone(),
        request.context.clone(),
        request.field_name.clone(),
        request.definition.clone(),
        request.data_type,
        uid,
    )
    .map_err(|e| invalid(e.to_string()))?;

    if let Some(supplied) = &request.long_name {
        if supplied != row.long_name() {
            return Err(invalid(format!(
                "long name '{}' does not match derived '{}'",
                supplied,
                row.long_name()
            )));
        }
    }

    Ok(row)
}
