pub(crate) mod format;
pub(crate) mod inventory;
pub(crate) mod mail;

use crate::commands::{Action, Context};
use crate::errors::Result;
use format::now_local;

/// `--action list`
#[derive(Debug, Clone, Default)]
pub struct ListCommand;

impl Action for ListCommand {
    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        println!("Listing all available backups:");
        inventory::list_backups(&ctx.ledger, now_local())?;
        Ok(())
    }
}

/// `--action email`
#[derive(Debug, Clone, Default)]
pub struct EmailCommand;

impl Action for EmailCommand {
    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        let inventory = inventory::list_backups(&ctx.ledger, now_local())?;
        mail::send_backup_report(&inventory, &ctx.settings, ctx.mailer.as_ref())?;
        Ok(())
    }
}
