// brutility/src/backup/db_dump.rs
use std::fs::OpenOptions;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

use crate::config::ConnectionParams;
use crate::errors::{AppError, Result};
use crate::utils::progress::run_with_spinner;
use crate::utils::{find_executable, mysql, stderr_text};

/// External program that writes a database's SQL dump to a file.
pub trait DumpTool {
    /// Dumps `params.db_name` into `output`. On failure the partially written
    /// file is left in place.
    fn dump(&self, params: &ConnectionParams, output: &Path) -> Result<()>;
}

/// `mysqldump`, authenticated through a private option file.
#[derive(Debug, Default)]
pub struct MysqlDump;

impl DumpTool for MysqlDump {
    fn dump(&self, params: &ConnectionParams, output: &Path) -> Result<()> {
        let mysqldump = find_executable("mysqldump")?;
        debug!(executable = %mysqldump.display(), "found mysqldump");
        let options = mysql::option_file(params)?;

        // Never truncate an existing artifact.
        let out_file = OpenOptions::new().write(true).create_new(true).open(output)?;
        println!("Dumping database {} from {} to {}...", params.db_name, params.host, output.display());
        let result = run_with_spinner(
            Command::new(&mysqldump)
                .args(mysql::connection_args(options.path(), params))
                .stdin(Stdio::null())
                .stdout(Stdio::from(out_file))
                .stderr(Stdio::piped()),
            format!("mysqldump {}", params.db_name),
        )?;

        if !result.status.success() {
            return Err(AppError::DumpFailed {
                status: result.status.to_string(),
                output: output.to_path_buf(),
                stderr: stderr_text(&result),
            });
        }
        println!("✓ Database {} dumped successfully.", params.db_name);
        Ok(())
    }
}
