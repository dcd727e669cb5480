// brutility/src/commands.rs
use std::path::PathBuf;

use crate::backup::BackupCommand;
use crate::backup::db_dump::{DumpTool, MysqlDump};
use crate::config::Settings;
use crate::config::secrets::{EnvFileStore, Prompter, SecretStore, TerminalPrompter};
use crate::errors::Result;
use crate::ledger::Ledger;
use crate::report::mail::{MailTransport, SmtpMailer};
use crate::report::{EmailCommand, ListCommand};
use crate::restore::RestoreCommand;
use crate::restore::db_restore::{MysqlRestore, RestoreTool};

/// One user-facing operation.
pub(crate) trait Action {
    async fn execute(&self, ctx: &mut Context) -> Result<()>;
}

/// Everything an action touches outside its own arguments.
pub struct Context {
    pub settings: Settings,
    pub ledger: Ledger,
    pub backup_dir: PathBuf,
    pub dump_tool: Box<dyn DumpTool>,
    pub restore_tool: Box<dyn RestoreTool>,
    pub mailer: Box<dyn MailTransport>,
    pub prompter: Box<dyn Prompter>,
    pub secret_store: Box<dyn SecretStore>,
}

impl Context {
    /// Context wired to the real `mysqldump`/`mysql` binaries, SMTP and the terminal.
    pub fn new(settings: Settings, ledger: Ledger, backup_dir: PathBuf, env_file: PathBuf) -> Self {
        Context {
            settings,
            ledger,
            backup_dir,
            dump_tool: Box::new(MysqlDump),
            restore_tool: Box::new(MysqlRestore),
            mailer: Box::new(SmtpMailer),
            prompter: Box::new(TerminalPrompter),
            secret_store: Box::new(EnvFileStore::new(env_file)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Command {
    Backup(BackupCommand),
    Restore(RestoreCommand),
    List(ListCommand),
    Email(EmailCommand),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Backup(_) => "backup",
            Command::Restore(_) => "restore",
            Command::List(_) => "list",
            Command::Email(_) => "email",
        }
    }

    pub async fn execute(&self, ctx: &mut Context) -> Result<()> {
        match self {
            Command::Backup(cmd) => cmd.execute(ctx).await,
            Command::Restore(cmd) => cmd.execute(ctx).await,
            Command::List(cmd) => cmd.execute(ctx).await,
            Command::Email(cmd) => cmd.execute(ctx).await,
        }
    }
}
