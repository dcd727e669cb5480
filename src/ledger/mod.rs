//! Backup ledger
//!
//! Append-only JSON record of every backup artifact this tool has produced.
//! The file is the only shared mutable state between invocations; every
//! append runs under [`LedgerLock`] and replaces the file atomically.

// brutility/src/ledger/mod.rs
pub(crate) mod lock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::errors::{AppError, Result};
use lock::LedgerLock;

pub const DEFAULT_LEDGER_FILE: &str = "backup_records.json";

/// One completed backup artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub timestamp: String,
    pub file: String,
    pub storage: String,
    /// Keys written by other tools or by hand; carried through rewrites untouched.
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl BackupRecord {
    pub fn new(timestamp: impl Into<String>, file: impl Into<String>, storage: impl Into<String>) -> Self {
        BackupRecord {
            timestamp: timestamp.into(),
            file: file.into(),
            storage: storage.into(),
            extra: Map::new(),
        }
    }

    pub fn file_path(&self) -> &Path {
        Path::new(&self.file)
    }
}

/// A stored ledger entry. Entries that are not well-formed records are kept
/// verbatim so that a rewrite never loses history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LedgerEntry {
    Record(BackupRecord),
    Malformed(Value),
}

impl LedgerEntry {
    #[cfg(test)]
    pub fn as_record(&self) -> Option<&BackupRecord> {
        match self {
            LedgerEntry::Record(record) => Some(record),
            LedgerEntry::Malformed(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Ledger { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Returns every stored entry in insertion order.
    ///
    /// A missing ledger file is an empty ledger. A file that exists but does
    /// not hold a UTF-8 JSON array is reported as [`AppError::StoreCorrupt`].
    pub fn load(&self) -> Result<Vec<LedgerEntry>> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(ledger = %self.path.display(), "ledger file not found, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice::<Vec<LedgerEntry>>(&content).map_err(|e| AppError::StoreCorrupt {
            path: self.path.clone(),
            reason: format!("expected a JSON array of backup records ({})", e),
        })
    }

    /// Well-formed records with their 0-based position in the ledger.
    #[cfg(test)]
    pub fn records(&self) -> Result<Vec<(usize, BackupRecord)>> {
        Ok(self
            .load()?
            .into_iter()
            .enumerate()
            .filter_map(|(pos, entry)| match entry {
                LedgerEntry::Record(record) => Some((pos, record)),
                LedgerEntry::Malformed(_) => None,
            })
            .collect())
    }

    /// Appends `record` and rewrites the ledger in one locked, atomic step.
    pub fn append(&self, record: BackupRecord) -> Result<()> {
        let lock = LedgerLock::acquire(&self.path)?;
        let mut entries = self.load()?;
        entries.push(LedgerEntry::Record(record));
        self.write_all(&entries)?;
        info!(ledger = %self.path.display(), entries = entries.len(), "backup record appended");
        debug!(lock = %lock.path().display(), "releasing ledger lock");
        Ok(())
    }

    fn write_all(&self, entries: &[LedgerEntry]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        {
            let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
            let mut ser = serde_json::Serializer::with_formatter(tmp.as_file_mut(), formatter);
            entries.serialize(&mut ser)?;
        }
        tmp.as_file_mut().write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| AppError::Io(e.error))?;
        Ok(())
    }
}
