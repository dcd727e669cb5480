pub(crate) mod archive;
pub(crate) mod db_dump;
pub(crate) mod ftp_upload;
pub(crate) mod logic;
pub(crate) mod s3_upload;

use anyhow::Result as AnyResult;
use std::path::Path;

use crate::commands::{Action, Context};
use crate::config::{CompressionFormat, DatabaseArgs, Settings, StorageType};
use crate::errors::Result;
use crate::report::format::now_local;

/// `--action backup`
#[derive(Debug, Clone)]
pub struct BackupCommand {
    pub db: DatabaseArgs,
    pub compression: Option<CompressionFormat>,
    pub storage: StorageType,
}

impl Action for BackupCommand {
    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        let params = self.db.connection()?;
        println!("🚀 Backing up MySQL database {}...", params.db_name);

        let artifact = logic::run_backup(
            ctx.dump_tool.as_ref(),
            &params,
            &ctx.backup_dir,
            self.compression,
            now_local(),
        )?;
        let transferred = transfer_artifact(&artifact.path, self.storage, &ctx.settings).await;
        let record = logic::record_backup(&ctx.ledger, &artifact, self.storage, transferred)?;

        println!("Backup saved as {} in {}.", record.file, record.storage);
        Ok(())
    }
}

/// Copies the artifact to its remote destination; a no-op for local storage.
pub async fn transfer_artifact(path: &Path, storage: StorageType, settings: &Settings) -> AnyResult<()> {
    match storage {
        StorageType::Local => Ok(()),
        StorageType::S3 => {
            let s3_settings = settings.s3()?;
            let key = s3_upload::s3_key_for(&s3_settings, path)?;
            s3_upload::upload_file_to_s3(&s3_settings, path, &key).await
        }
        StorageType::Ftp => {
            let ftp_settings = settings.ftp()?;
            ftp_upload::upload_file_to_ftp(&ftp_settings, path)
        }
    }
}
