// brutility/src/backup/logic.rs
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::archive;
use super::db_dump::DumpTool;
use crate::config::{CompressionFormat, ConnectionParams, StorageType};
use crate::errors::{AppError, Result};
use crate::ledger::{BackupRecord, Ledger};
use crate::report::format::format_timestamp;

pub const DEFAULT_BACKUP_DIR: &str = "./backups";

/// A backup artifact that exists on local disk but is not yet recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupArtifact {
    pub path: PathBuf,
    pub timestamp: String,
}

pub fn backup_file_path(output_dir: &Path, db_name: &str, timestamp: &str) -> PathBuf {
    output_dir.join(format!("{}_backup_{}.sql", db_name, timestamp))
}

/// First dump path whose raw and compressed forms are both unused. A second
/// backup in the same second gets `_2`, `_3`, ... after the timestamp.
fn unused_backup_path(
    output_dir: &Path,
    db_name: &str,
    timestamp: &str,
    compression: Option<CompressionFormat>,
) -> PathBuf {
    let taken = |raw: &Path| raw.exists() || compression.is_some_and(|f| archive::archive_path_for(raw, f).exists());
    let first = backup_file_path(output_dir, db_name, timestamp);
    if !taken(&first) {
        return first;
    }
    (2u32..)
        .map(|n| backup_file_path(output_dir, db_name, &format!("{}_{}", timestamp, n)))
        .find(|candidate| !taken(candidate))
        .unwrap_or(first)
}

/// Dumps the database into `output_dir` and optionally compresses the dump.
///
/// The ledger is not touched here; the caller records the artifact once it
/// knows where it ended up.
pub fn run_backup(
    tool: &dyn DumpTool,
    params: &ConnectionParams,
    output_dir: &Path,
    compression: Option<CompressionFormat>,
    created: NaiveDateTime,
) -> Result<BackupArtifact> {
    fs::create_dir_all(output_dir)?;
    let timestamp = format_timestamp(created);
    let raw = unused_backup_path(output_dir, &params.db_name, &timestamp, compression);

    tool.dump(params, &raw)?;

    let path = match compression {
        Some(format) => archive::compress_file(&raw, format)?,
        None => raw,
    };
    info!(file = %path.display(), "backup artifact written");
    Ok(BackupArtifact { path, timestamp })
}

/// Appends the ledger record for `artifact`.
///
/// The remote tag is recorded only when `transfer` succeeded. A failed
/// transfer still records the local copy, then surfaces as a storage error.
pub fn record_backup(
    ledger: &Ledger,
    artifact: &BackupArtifact,
    requested: StorageType,
    transfer: anyhow::Result<()>,
) -> Result<BackupRecord> {
    let (storage, transfer_error) = match transfer {
        Ok(()) => (requested, None),
        Err(e) => {
            warn!(storage = %requested, error = %e, "transfer failed, recording local copy only");
            (StorageType::Local, Some(e))
        }
    };

    let record = BackupRecord::new(
        artifact.timestamp.clone(),
        artifact.path.display().to_string(),
        storage.as_str(),
    );
    ledger.append(record.clone())?;

    match transfer_error {
        Some(e) => Err(AppError::Storage(format!(
            "{} upload of {} failed; recorded as local: {:#}",
            requested,
            artifact.path.display(),
            e
        ))),
        None => Ok(record),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::report::format::parse_timestamp;
    use std::cell::RefCell;
    use std::io::Write;

    /// Writes a fixed payload instead of calling `mysqldump`.
    #[derive(Debug, Default)]
    pub(crate) struct FakeDump {
        pub payload: Vec<u8>,
        pub fail: bool,
        pub calls: RefCell<Vec<(String, PathBuf)>>,
    }

    impl FakeDump {
        pub fn writing(payload: &[u8]) -> Self {
            FakeDump { payload: payload.to_vec(), ..FakeDump::default() }
        }
    }

    impl DumpTool for FakeDump {
        fn dump(&self, params: &ConnectionParams, output: &Path) -> Result<()> {
            self.calls.borrow_mut().push((params.db_name.clone(), output.to_path_buf()));
            let mut file = fs::OpenOptions::new().write(true).create_new(true).open(output)?;
            file.write_all(&self.payload)?;
            if self.fail {
                return Err(AppError::DumpFailed {
                    status: "exit status: 2".into(),
                    output: output.to_path_buf(),
                    stderr: "Access denied".into(),
                });
            }
            Ok(())
        }
    }

    pub(crate) fn params(db: &str) -> ConnectionParams {
        ConnectionParams {
            db_name: db.into(),
            user: "root".into(),
            password: "pw".into(),
            host: "localhost".into(),
        }
    }

    fn created() -> NaiveDateTime {
        parse_timestamp("07_Mar_2025_14-05-09").expect("valid timestamp")
    }

    #[test]
    fn test_uncompressed_backup_path() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let tool = FakeDump::writing(b"CREATE TABLE t (id INT);\n");
        let artifact = run_backup(&tool, &params("orders"), dir.path(), None, created())?;

        assert_eq!(artifact.path, dir.path().join("orders_backup_07_Mar_2025_14-05-09.sql"));
        assert_eq!(artifact.timestamp, "07_Mar_2025_14-05-09");
        assert_eq!(fs::read(&artifact.path)?, b"CREATE TABLE t (id INT);\n");
        assert_eq!(tool.calls.borrow().len(), 1);
        Ok(())
    }

    #[test]
    fn test_compressed_backup_replaces_raw_dump() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let tool = FakeDump::writing(b"INSERT INTO t VALUES (1);\n");
        let artifact = run_backup(&tool, &params("orders"), dir.path(), Some(CompressionFormat::Gz), created())?;

        assert_eq!(artifact.path, dir.path().join("orders_backup_07_Mar_2025_14-05-09.sql.gz"));
        assert!(artifact.path.exists());
        assert!(!dir.path().join("orders_backup_07_Mar_2025_14-05-09.sql").exists());
        Ok(())
    }

    #[test]
    fn test_failed_dump_keeps_partial_output() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let tool = FakeDump { fail: true, ..FakeDump::writing(b"-- partial") };
        let err = run_backup(&tool, &params("orders"), dir.path(), Some(CompressionFormat::Zip), created()).unwrap_err();

        assert!(matches!(err, AppError::DumpFailed { .. }));
        let partial = dir.path().join("orders_backup_07_Mar_2025_14-05-09.sql");
        assert_eq!(fs::read(&partial)?, b"-- partial");
        assert!(!dir.path().join("orders_backup_07_Mar_2025_14-05-09.sql.zip").exists());
        Ok(())
    }

    #[test]
    fn test_same_second_backups_keep_both_artifacts() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let ledger = Ledger::new(dir.path().join("backup_records.json"));

        let first = run_backup(&FakeDump::writing(b"FIRST"), &params("orders"), dir.path(), None, created())?;
        let second = run_backup(&FakeDump::writing(b"SECOND"), &params("orders"), dir.path(), None, created())?;
        let third = run_backup(
            &FakeDump::writing(b"THIRD"),
            &params("orders"),
            dir.path(),
            Some(CompressionFormat::Gz),
            created(),
        )?;

        assert_eq!(first.path, dir.path().join("orders_backup_07_Mar_2025_14-05-09.sql"));
        assert_eq!(second.path, dir.path().join("orders_backup_07_Mar_2025_14-05-09_2.sql"));
        assert_eq!(third.path, dir.path().join("orders_backup_07_Mar_2025_14-05-09_3.sql.gz"));
        assert_eq!(fs::read(&first.path)?, b"FIRST");
        assert_eq!(fs::read(&second.path)?, b"SECOND");
        assert_eq!(second.timestamp, "07_Mar_2025_14-05-09");

        record_backup(&ledger, &first, StorageType::Local, Ok(()))?;
        record_backup(&ledger, &second, StorageType::Local, Ok(()))?;
        let inventory = crate::report::inventory::build_inventory(&ledger, created())?;
        assert_eq!(inventory.rows.len(), 2);
        assert_eq!(inventory.stats.total_size_bytes, 11);
        assert!(inventory.rows.iter().all(|row| row.database == "orders"));
        Ok(())
    }

    #[test]
    fn test_record_backup_tags() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let ledger = Ledger::new(dir.path().join("backup_records.json"));
        let artifact = BackupArtifact {
            path: dir.path().join("orders_backup_07_Mar_2025_14-05-09.sql"),
            timestamp: "07_Mar_2025_14-05-09".into(),
        };

        let record = record_backup(&ledger, &artifact, StorageType::S3, Ok(()))?;
        assert_eq!(record.storage, "s3");

        let err = record_backup(&ledger, &artifact, StorageType::Ftp, Err(anyhow::anyhow!("530 Login incorrect"))).unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(err.to_string().contains("530 Login incorrect"));

        let storages: Vec<String> = ledger.records()?.into_iter().map(|(_, r)| r.storage).collect();
        assert_eq!(storages, vec!["s3", "local"]);
        Ok(())
    }
}
