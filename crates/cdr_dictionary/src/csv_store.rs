//! CSV-backed dictionary store.
//!
//! The file is the tabular export of the dictionary with a fixed header.
//! Writers in separate processes serialize through an exclusive advisory lock
//! on `<file>.lock` (fs2; `std::fs::File::lock` needs Rust 1.89+). Readers
//! take the same lock shared so they never observe a half-written line.

use crate::error::StoreError;
use crate::row::{CdrRecord, CdrRow};
use crate::store::{rollback_action, DictionaryStore, RollbackAction};
use cdr_ids::SlotId;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Column order of the dictionary file.
pub const CSV_HEADER: [&str; 7] = [
    "concept",
    "context",
    "data_requirement",
    "long_name",
    "definition",
    "data_type",
    "uid",
];

/// Lock file path for a dictionary file (`cdr.csv` -> `cdr.csv.lock`).
pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Dictionary rows stored in a CSV file.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
    lock_path: PathBuf,
}

enum LockMode {
    Shared,
    Exclusive,
}

/// Holds the advisory lock until dropped.
struct StoreLock {
    file: File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl CsvStore {
    /// Open the store at `path`, creating the file with its header if missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let store = Self {
            lock_path: lock_path_for(&path),
            path,
        };

        if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let _lock = store.lock(LockMode::Exclusive)?;
        let needs_header = match fs::metadata(&store.path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(StoreError::io(&store.path, e)),
        };
        if needs_header {
            let mut writer = csv::Writer::from_path(&store.path)?;
            writer.write_record(CSV_HEADER)?;
            writer.flush().map_err(|e| StoreError::io(&store.path, e))?;
            info!(path = %store.path.display(), "Created dictionary file");
        } else {
            store.check_header()?;
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self, mode: LockMode) -> Result<StoreLock, StoreError> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&self.lock_path)
            .map_err(|e| StoreError::Lock {
                path: self.lock_path.clone(),
                source: e,
            })?;
        let acquired = match mode {
            LockMode::Shared => file.lock_shared(),
            LockMode::Exclusive => file.lock_exclusive(),
        };
        acquired.map_err(|e| StoreError::Lock {
            path: self.lock_path.clone(),
            source: e,
        })?;
        Ok(StoreLock { file })
    }

    fn check_header(&self) -> Result<(), StoreError> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let headers = reader.headers()?;
        let matches = headers.len() == CSV_HEADER.len()
            && headers.iter().zip(CSV_HEADER).all(|(got, want)| got.trim() == want);
        if !matches {
            return Err(StoreError::Header {
                path: self.path.clone(),
                found: headers.iter().collect::<Vec<_>>().join(","),
            });
        }
        Ok(())
    }

    fn read_rows_unlocked(&self) -> Result<Vec<CdrRow>, StoreError> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut rows = Vec::new();
        for (idx, record) in reader.deserialize::<CdrRecord>().enumerate() {
            let record = record?;
            let row = CdrRow::try_from(record).map_err(|source| StoreError::Corrupt {
                location: format!("{} slot #{}", self.path.display(), idx),
                source,
            })?;
            rows.push(row);
        }
        Ok(rows)
    }

    fn count_unlocked(&self) -> Result<u64, StoreError> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut count = 0u64;
        for record in reader.records() {
            record?;
            count += 1;
        }
        Ok(count)
    }

    fn append_unlocked(&self, row: &CdrRow) -> Result<(), StoreError> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;

        // A file edited by hand may lack the final newline.
        if !ends_with_newline(&mut file).map_err(|e| StoreError::io(&self.path, e))? {
            file.write_all(b"\n")
                .map_err(|e| StoreError::io(&self.path, e))?;
        }

        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut file);
            writer.serialize(CdrRecord::from(row))?;
            writer.flush().map_err(|e| StoreError::io(&self.path, e))?;
        }
        file.sync_all().map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }

    fn rewrite_unlocked(&self, rows: &[CdrRow]) -> Result<(), StoreError> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let temp_path = parent.join(format!(".tmp_{}", uuid::Uuid::new_v4()));

        let written = (|| -> Result<(), StoreError> {
            let mut writer = csv::Writer::from_path(&temp_path)?;
            writer.write_record(CSV_HEADER)?;
            for row in rows {
                writer.serialize(CdrRecord::from(row))?;
            }
            writer.flush().map_err(|e| StoreError::io(&temp_path, e))?;
            Ok(())
        })();

        if let Err(err) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(err);
        }

        fs::rename(&temp_path, &self.path).map_err(|e| StoreError::io(&self.path, e))
    }
}

fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

impl DictionaryStore for CsvStore {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load_all(&self) -> Result<Vec<CdrRow>, StoreError> {
        let _lock = self.lock(LockMode::Shared)?;
        self.read_rows_unlocked()
    }

    fn row_count(&self) -> Result<u64, StoreError> {
        let _lock = self.lock(LockMode::Shared)?;
        self.count_unlocked()
    }

    fn write_row(&self, slot: SlotId, row: &CdrRow) -> Result<(), StoreError> {
        let _lock = self.lock(LockMode::Exclusive)?;
        let next = SlotId::new(self.count_unlocked()?);
        if slot != next {
            warn!(
                path = %self.path.display(),
                requested = %slot,
                next = %next,
                "Slot conflict on dictionary append"
            );
            return Err(StoreError::SlotConflict {
                requested: slot,
                next,
            });
        }
        self.append_unlocked(row)?;
        debug!(path = %self.path.display(), slot = %slot, long_name = row.long_name(), "Appended row");
        Ok(())
    }

    fn read_row(&self, slot: SlotId) -> Result<Option<CdrRow>, StoreError> {
        let _lock = self.lock(LockMode::Shared)?;
        let mut reader = csv::Reader::from_path(&self.path)?;
        let Some(record) = reader
            .deserialize::<CdrRecord>()
            .nth(usize::try_from(slot.index()).unwrap_or(usize::MAX))
        else {
            return Ok(None);
        };
        let row = CdrRow::try_from(record?).map_err(|source| StoreError::Corrupt {
            location: format!("{} slot {}", self.path.display(), slot),
            source,
        })?;
        Ok(Some(row))
    }

    fn rollback(&self, slot: SlotId) -> Result<(), StoreError> {
        let _lock = self.lock(LockMode::Exclusive)?;
        let rows = self.read_rows_unlocked()?;
        match rollback_action(slot, rows.len() as u64) {
            Ok(RollbackAction::Nothing) => Ok(()),
            Ok(RollbackAction::DropLast) => {
                self.rewrite_unlocked(&rows[..rows.len() - 1])?;
                warn!(path = %self.path.display(), slot = %slot, "Rolled back dictionary row");
                Ok(())
            }
            Err(err) => {
                warn!(path = %self.path.display(), slot = %slot, rows = rows.len(), "Rollback refused, rows follow the slot");
                Err(err)
            }
        }
    }
}
