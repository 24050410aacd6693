//! Canonical Data Requirements (CDR) dictionary.
//!
//! Fields live under a two-level namespace (Concept -> Context) and are
//! identified by their long name `Concept:Context:dataRequirement` and by a
//! steward-issued uid. Rows are append-only: they are never edited or removed
//! once committed.
//!
//! # Usage
//!
//! ```
//! use cdr_dictionary::{CanonicalDictionary, CdrRow, DataType};
//! use cdr_ids::RowUid;
//!
//! let dictionary = CanonicalDictionary::in_memory();
//! let row = CdrRow::new(
//!     "Customer",
//!     "Contact",
//!     "emailAddress",
//!     "Primary email address",
//!     DataType::String,
//!     RowUid::parse("CDR-0001").unwrap(),
//! )
//! .unwrap();
//! dictionary.append(row).unwrap();
//!
//! assert_eq!(dictionary.filter("Customer", "Contact").len(), 1);
//! ```

pub mod csv_store;
pub mod dictionary;
pub mod error;
pub mod naming;
pub mod row;
pub mod store;

pub use csv_store::{lock_path_for, CsvStore, CSV_HEADER};
pub use dictionary::{CanonicalDictionary, DictionaryWriter};
pub use error::{DictionaryError, DuplicateError, StoreError};
pub use row::{derive_long_name, CdrRecord, CdrRow, DataType, RowError, RowKey};
pub use store::{DictionaryStore, MemoryStore};
