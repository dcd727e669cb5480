// brutility/src/report/inventory.rs
use chrono::{Duration, NaiveDateTime};
use std::fs;
use std::io;
use std::path::Path;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::{debug, warn};

use crate::errors::{AppError, Result};
use crate::ledger::{BackupRecord, Ledger, LedgerEntry};
use crate::report::format::{kilobytes, megabytes, parse_timestamp, relative_age};

/// Marker between the database name and the timestamp in backup file names.
pub const BACKUP_NAME_MARKER: &str = "_backup_";
pub const NO_FORMAT: &str = "None";

#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct InventoryRow {
    #[tabled(rename = "No.")]
    pub index: usize,
    #[tabled(rename = "Database Name")]
    pub database: String,
    #[tabled(rename = "Timestamp")]
    pub timestamp: String,
    #[tabled(rename = "Time Ago")]
    pub age: String,
    #[tabled(rename = "Storage Type")]
    pub storage: String,
    #[tabled(rename = "File Size", display_with = "display_kb")]
    pub size_bytes: u64,
    #[tabled(rename = "Compression Format")]
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct FormatSummary {
    #[tabled(rename = "Format")]
    pub format: String,
    #[tabled(rename = "Total Backups")]
    pub count: usize,
    #[tabled(rename = "Total Size (MB)", display_with = "display_mb")]
    pub total_bytes: u64,
}

fn display_kb(bytes: &u64) -> String {
    kilobytes(*bytes)
}

fn display_mb(bytes: &u64) -> String {
    megabytes(*bytes)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackupStats {
    pub total_size_bytes: u64,
    /// Valid backups younger than seven days.
    pub weekly_count: usize,
    /// Valid backups younger than thirty days.
    pub monthly_count: usize,
    /// Size of the most recently recorded valid backup.
    pub last_backup_size_bytes: u64,
    pub stale_count: usize,
    pub malformed_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerState {
    Absent,
    Empty,
    Populated,
}

/// Everything derived from one pass over the ledger.
#[derive(Debug, Clone)]
pub struct Inventory {
    pub state: LedgerState,
    /// Records whose artifact still exists, in ledger order. Restore
    /// selection indexes into this list.
    pub records: Vec<BackupRecord>,
    pub rows: Vec<InventoryRow>,
    pub formats: Vec<FormatSummary>,
    pub stats: BackupStats,
}

impl Inventory {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Text shown by the `list` action.
    pub fn render(&self) -> String {
        match self.state {
            LedgerState::Absent => return "No backups found.".to_string(),
            LedgerState::Empty => return "No backup records found.".to_string(),
            LedgerState::Populated => {}
        }
        if self.records.is_empty() {
            return format!(
                "No backup files found on disk ({} stale, {} malformed ledger entries skipped).",
                self.stats.stale_count, self.stats.malformed_count
            );
        }

        let mut table = Table::new(&self.rows);
        table.with(Style::ascii());
        let mut summary = Table::new(&self.formats);
        summary.with(Style::ascii());

        format!(
            "{}\n\nSummary of Backups by Format:\n{}\n\n💾 Overall Total Backup Size: {}",
            table,
            summary,
            megabytes(self.stats.total_size_bytes)
        )
    }
}

/// Compression format tag of a backup file: the file name's text after its
/// last `.`, or `None`.
pub fn format_tag(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext.to_string()))
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| NO_FORMAT.to_string())
}

/// Database name encoded in a backup file name (`{db}_backup_{timestamp}...`).
pub fn database_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.split_once(BACKUP_NAME_MARKER) {
        Some((db, _)) => db.to_string(),
        None => name,
    }
}

fn file_size(path: &Path) -> Result<Option<u64>> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Reads the ledger and cross-checks every record against the filesystem.
///
/// Malformed entries and records whose file is gone are skipped; a record
/// with an unparseable timestamp fails the whole pass as ledger corruption.
pub fn build_inventory(ledger: &Ledger, now: NaiveDateTime) -> Result<Inventory> {
    let state = if !ledger.exists() {
        LedgerState::Absent
    } else {
        LedgerState::Populated
    };
    let entries = ledger.load()?;
    let state = if state == LedgerState::Populated && entries.is_empty() {
        LedgerState::Empty
    } else {
        state
    };

    let mut inventory = Inventory {
        state,
        records: Vec::new(),
        rows: Vec::new(),
        formats: Vec::new(),
        stats: BackupStats::default(),
    };

    for (pos, entry) in entries.into_iter().enumerate() {
        let record = match entry {
            LedgerEntry::Record(record) => record,
            LedgerEntry::Malformed(value) => {
                warn!(position = pos + 1, entry = %value, "skipping malformed ledger entry");
                inventory.stats.malformed_count += 1;
                continue;
            }
        };

        let created = parse_timestamp(&record.timestamp).map_err(|e| AppError::StoreCorrupt {
            path: ledger.path().to_path_buf(),
            reason: format!(
                "record {} has unparseable timestamp {:?} ({})",
                pos + 1,
                record.timestamp,
                e
            ),
        })?;

        let path = record.file_path();
        let size = match file_size(path)? {
            Some(size) => size,
            None => {
                debug!(file = %record.file, "backup file missing, skipping stale record");
                inventory.stats.stale_count += 1;
                continue;
            }
        };

        let format = format_tag(path);
        match inventory.formats.iter_mut().find(|f| f.format == format) {
            Some(summary) => {
                summary.count += 1;
                summary.total_bytes += size;
            }
            None => inventory.formats.push(FormatSummary {
                format: format.clone(),
                count: 1,
                total_bytes: size,
            }),
        }

        let age = now - created;
        if age < Duration::days(7) {
            inventory.stats.weekly_count += 1;
        }
        if age < Duration::days(30) {
            inventory.stats.monthly_count += 1;
        }
        inventory.stats.total_size_bytes += size;
        inventory.stats.last_backup_size_bytes = size;

        inventory.rows.push(InventoryRow {
            index: inventory.records.len() + 1,
            database: database_name(path),
            timestamp: record.timestamp.clone(),
            age: relative_age(created, now),
            storage: record.storage.clone(),
            size_bytes: size,
            format,
        });
        inventory.records.push(record);
    }

    Ok(inventory)
}

/// Builds the inventory and prints it. Returns it for restore selection and
/// reporting.
pub fn list_backups(ledger: &Ledger, now: NaiveDateTime) -> Result<Inventory> {
    let inventory = build_inventory(ledger, now)?;
    println!("{}", inventory.render());
    Ok(inventory)
}
