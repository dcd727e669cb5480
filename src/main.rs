//! Database Backup/Restore Utility
//!
//! Takes MySQL dumps, keeps a ledger of them, restores a chosen one and
//! reports on the collection.

// brutility/src/main.rs
mod backup;
mod commands;
mod config;
mod errors;
mod ledger;
mod report;
mod restore;
mod utils;

use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

use backup::BackupCommand;
use backup::logic::DEFAULT_BACKUP_DIR;
use commands::{Command, Context};
use config::secrets::ensure_storage_credentials;
use config::{CompressionFormat, DatabaseArgs, DbType, Settings, StorageType};
use errors::AppError;
use ledger::{DEFAULT_LEDGER_FILE, Ledger};
use report::{EmailCommand, ListCommand};
use restore::RestoreCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ActionKind {
    Backup,
    Restore,
    List,
    Email,
}

/// Backup and restore MySQL databases, list recorded backups and email a summary.
#[derive(Debug, Parser)]
#[command(name = "brutility", version)]
struct Cli {
    #[arg(long, value_enum)]
    action: ActionKind,

    #[arg(long, value_enum)]
    compression: Option<CompressionFormat>,

    #[arg(long = "db_type", value_enum)]
    db_type: Option<DbType>,

    #[arg(long = "db_name")]
    db_name: Option<String>,

    #[arg(long)]
    user: Option<String>,

    #[arg(long)]
    password: Option<String>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long = "storage_type", value_enum, default_value_t = StorageType::Local)]
    storage_type: StorageType,

    /// Backup number to restore instead of prompting.
    #[arg(long)]
    select: Option<String>,

    #[arg(long = "backup_dir", default_value = DEFAULT_BACKUP_DIR)]
    backup_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_LEDGER_FILE)]
    ledger: PathBuf,

    #[arg(long = "env_file", default_value = ".env")]
    env_file: PathBuf,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long = "log_level", default_value = "warn")]
    log_level: String,
}

impl Cli {
    fn database_args(&self) -> DatabaseArgs {
        DatabaseArgs {
            db_type: self.db_type,
            db_name: self.db_name.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            host: self.host.clone(),
        }
    }

    fn command(&self) -> Command {
        match self.action {
            ActionKind::Backup => Command::Backup(BackupCommand {
                db: self.database_args(),
                compression: self.compression,
                storage: self.storage_type,
            }),
            ActionKind::Restore => Command::Restore(RestoreCommand {
                db: self.database_args(),
                selection: self.select.clone(),
            }),
            ActionKind::List => Command::List(ListCommand),
            ActionKind::Email => Command::Email(EmailCommand),
        }
    }
}

/// Main entry point for the backup/restore utility
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = utils::logger::init(&cli.log_level) {
        eprintln!("Failed to initialize logging: {:#}", e);
    }

    match run_app(cli).await {
        Ok(_) => {
            println!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<AppError>().map_or(1, AppError::exit_code)
}

async fn run_app(cli: Cli) -> Result<()> {
    let settings = Settings::load(&cli.env_file);
    let command = cli.command();
    debug!(action = command.name(), ledger = %cli.ledger.display(), "starting");

    if cli.action == ActionKind::Backup {
        fs::create_dir_all(&cli.backup_dir)
            .with_context(|| format!("Failed to create backup directory {}", cli.backup_dir.display()))?;
    }

    let mut ctx = Context::new(settings, Ledger::new(&cli.ledger), cli.backup_dir.clone(), cli.env_file.clone());

    if cli.storage_type != StorageType::Local {
        ensure_storage_credentials(
            &mut ctx.settings,
            cli.storage_type,
            ctx.prompter.as_mut(),
            ctx.secret_store.as_mut(),
        )?;
    }

    command.execute(&mut ctx).await?;
    Ok(())
}
