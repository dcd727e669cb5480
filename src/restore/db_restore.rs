// brutility/src/restore/db_restore.rs
use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

use crate::config::ConnectionParams;
use crate::errors::{AppError, Result};
use crate::utils::progress::run_with_spinner;
use crate::utils::{find_executable, mysql, stderr_text};

/// External program that loads a SQL dump into a database.
pub trait RestoreTool {
    /// Feeds the SQL text in `input` to `params.db_name`.
    fn restore(&self, params: &ConnectionParams, input: &Path) -> Result<()>;
}

/// The `mysql` client reading the dump on stdin.
#[derive(Debug, Default)]
pub struct MysqlRestore;

impl RestoreTool for MysqlRestore {
    fn restore(&self, params: &ConnectionParams, input: &Path) -> Result<()> {
        if !input.exists() {
            return Err(AppError::validation(format!(
                "SQL file for restoration not found: {}",
                input.display()
            )));
        }
        let mysql_client = find_executable("mysql")?;
        debug!(executable = %mysql_client.display(), "found mysql client");
        let options = mysql::option_file(params)?;

        println!("Executing SQL file {} on database {}...", input.display(), params.db_name);
        let result = run_with_spinner(
            Command::new(&mysql_client)
                .args(mysql::connection_args(options.path(), params))
                .stdin(Stdio::from(File::open(input)?))
                .stdout(Stdio::piped())
                .stderr(Stdio::piped()),
            format!("mysql {}", params.db_name),
        )?;

        if !result.status.success() {
            return Err(AppError::RestoreFailed {
                status: result.status.to_string(),
                input: input.to_path_buf(),
                stderr: stderr_text(&result),
            });
        }
        println!("✓ Successfully executed SQL file {}", input.display());
        Ok(())
    }
}
