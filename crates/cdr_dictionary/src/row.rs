//! Canonical dictionary rows.
//!
//! A row is the unit of governance: one Data Requirement under a
//! Concept/Context pair. Its long name is always derived from the triple and
//! cannot be set independently.

use cdr_ids::RowUid;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Separator between the parts of a long name.
pub const LONG_NAME_SEPARATOR: char = ':';

/// Errors raised when row data violates the row invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} '{value}' has surrounding whitespace")]
    Padded { field: &'static str, value: String },

    #[error("{field} '{value}' must not contain '{LONG_NAME_SEPARATOR}'")]
    Separator { field: &'static str, value: String },

    #[error("long name '{got}' does not match derived '{expected}'")]
    LongNameMismatch { expected: String, got: String },

    #[error("unknown data type '{0}' (expected one of: string, boolean, datetime, enum, object, array)")]
    UnknownDataType(String),

    #[error("invalid uid: {0}")]
    Uid(String),
}

/// Controlled vocabulary of canonical data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Boolean,
    Datetime,
    Enum,
    Object,
    Array,
}

impl DataType {
    pub const ALL: [DataType; 6] = [
        DataType::String,
        DataType::Boolean,
        DataType::Datetime,
        DataType::Enum,
        DataType::Object,
        DataType::Array,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Boolean => "boolean",
            DataType::Datetime => "datetime",
            DataType::Enum => "enum",
            DataType::Object => "object",
            DataType::Array => "array",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DataType {
    type Err = RowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        DataType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| RowError::UnknownDataType(s.to_string()))
    }
}

/// The (concept, context, data requirement) triple that identifies a row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowKey {
    pub concept: String,
    pub context: String,
    pub data_requirement: String,
}

impl RowKey {
    pub fn new(
        concept: impl Into<String>,
        context: impl Into<String>,
        data_requirement: impl Into<String>,
    ) -> Self {
        Self {
            concept: concept.into(),
            context: context.into(),
            data_requirement: data_requirement.into(),
        }
    }

    pub fn long_name(&self) -> String {
        derive_long_name(&self.concept, &self.context, &self.data_requirement)
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.long_name())
    }
}

/// Derive the long name `"{concept}:{context}:{data_requirement}"`.
pub fn derive_long_name(concept: &str, context: &str, data_requirement: &str) -> String {
    format!(
        "{concept}{sep}{context}{sep}{data_requirement}",
        sep = LONG_NAME_SEPARATOR
    )
}

/// One canonical field definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CdrRecord")]
pub struct CdrRow {
    concept: String,
    context: String,
    data_requirement: String,
    long_name: String,
    definition: String,
    data_type: DataType,
    uid: RowUid,
}

impl CdrRow {
    /// Build a row, deriving its long name.
    pub fn new(
        concept: impl Into<String>,
        context: impl Into<String>,
        data_requirement: impl Into<String>,
        definition: impl Into<String>,
        data_type: DataType,
        uid: RowUid,
    ) -> Result<Self, RowError> {
        let concept = concept.into();
        let context = context.into();
        let data_requirement = data_requirement.into();

        check_part("concept", &concept)?;
        check_part("context", &context)?;
        check_part("data_requirement", &data_requirement)?;

        let long_name = derive_long_name(&concept, &context, &data_requirement);
        Ok(Self {
            concept,
            context,
            data_requirement,
            long_name,
            definition: definition.into(),
            data_type,
            uid,
        })
    }

    pub fn concept(&self) -> &str {
        &self.concept
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn data_requirement(&self) -> &str {
        &self.data_requirement
    }

    pub fn long_name(&self) -> &str {
        &self.long_name
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn uid(&self) -> &RowUid {
        &self.uid
    }

    pub fn key(&self) -> RowKey {
        RowKey::new(&self.concept, &self.context, &self.data_requirement)
    }

    /// True when the row lives under the given (concept, context) pair.
    pub fn in_scope(&self, concept: &str, context: &str) -> bool {
        self.concept == concept && self.context == context
    }

    pub fn has_key(&self, key: &RowKey) -> bool {
        self.concept == key.concept
            && self.context == key.context
            && self.data_requirement == key.data_requirement
    }
}

fn check_part(field: &'static str, value: &str) -> Result<(), RowError> {
    if value.trim().is_empty() {
        return Err(RowError::Empty { field });
    }
    if value.trim() != value {
        return Err(RowError::Padded {
            field,
            value: value.to_string(),
        });
    }
    if value.contains(LONG_NAME_SEPARATOR) {
        return Err(RowError::Separator {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Wire shape of a row as stored in tabular exports.
///
/// `long_name` is optional on input; when present it must agree with the
/// derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdrRecord {
    pub concept: String,
    pub context: String,
    pub data_requirement: String,
    #[serde(default)]
    pub long_name: Option<String>,
    #[serde(default)]
    pub definition: String,
    pub data_type: String,
    pub uid: String,
}

impl TryFrom<CdrRecord> for CdrRow {
    type Error = RowError;

    fn try_from(record: CdrRecord) -> Result<Self, Self::Error> {
        let data_type = record.data_type.parse::<DataType>()?;
        let uid = RowUid::parse(&record.uid).map_err(|e| RowError::Uid(e.to_string()))?;
        let row = CdrRow::new(
            record.concept,
            record.context,
            record.data_requirement,
            record.definition,
            data_type,
            uid,
        )?;

        if let Some(stored) = record.long_name.filter(|name| !name.is_empty()) {
            if stored != row.long_name {
                return Err(RowError::LongNameMismatch {
                    expected: row.long_name,
                    got: stored,
                });
            }
        }

        Ok(row)
    }
}

impl From<&CdrRow> for CdrRecord {
    fn from(row: &CdrRow) -> Self {
        Self {
            concept: row.concept.clone(),
            context: row.context.clone(),
            data_requirement: row.data_requirement.clone(),
            long_name: Some(row.long_name.clone()),
            definition: row.definition.clone(),
            data_type: row.data_type.as_str().to_string(),
            uid: row.uid.to_string(),
        }
    }
}
