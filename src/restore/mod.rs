pub(crate) mod db_restore;
pub(crate) mod selector;

use tracing::debug;

use crate::commands::{Action, Context};
use crate::config::DatabaseArgs;
use crate::errors::Result;
use crate::report::format::now_local;
use crate::report::inventory::list_backups;
use selector::RestoreSelector;

/// `--action restore`
#[derive(Debug, Clone)]
pub struct RestoreCommand {
    pub db: DatabaseArgs,
    /// Backup number given with `--select`; prompted for when absent.
    pub selection: Option<String>,
}

impl Action for RestoreCommand {
    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        let params = self.db.connection()?;

        let inventory = list_backups(&ctx.ledger, now_local())?;
        if inventory.is_empty() {
            println!("No backups available for restoration.");
            return Ok(());
        }

        let input = match &self.selection {
            Some(choice) => choice.clone(),
            None => ctx.prompter.ask("Select the backup number to restore: ")?,
        };

        let mut selector = RestoreSelector::new(&inventory.records);
        let record = selector.select(&input)?;
        println!("✅ Restoring backup: {}", record.file);

        selector.restore(ctx.restore_tool.as_ref(), &params)?;
        debug!(state = ?selector.state(), "restore selector finished");
        println!("✅ Database restored successfully.");
        Ok(())
    }
}
