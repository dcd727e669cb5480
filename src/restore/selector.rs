// brutility/src/restore/selector.rs
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

use super::db_restore::RestoreTool;
use crate::backup::archive;
use crate::config::{CompressionFormat, ConnectionParams};
use crate::errors::{AppError, Result};
use crate::ledger::BackupRecord;
use crate::report::inventory::format_tag;

/// Progress of one restore attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionState {
    AwaitingSelection,
    /// 0-based position in the valid-record list.
    Validated(usize),
    Restoring(PathBuf),
    Done(PathBuf),
    Failed(String),
}

/// Parses a 1-based selection into a 0-based index into a list of `len`.
pub fn parse_selection(input: &str, len: usize) -> Result<usize> {
    let range = || format!("Please enter a number between 1 and {}", len);
    let choice: usize = input
        .trim()
        .parse()
        .map_err(|_| AppError::validation(format!("{:?} is not a backup number. {}.", input.trim(), range())))?;
    if choice == 0 || choice > len {
        return Err(AppError::validation(format!("Backup number {} is out of range. {}.", choice, range())));
    }
    Ok(choice - 1)
}

/// SQL handed to the restore tool: the artifact itself, or a temporary
/// extraction of a compressed artifact.
enum RestoreInput {
    Direct(PathBuf),
    Extracted(NamedTempFile),
}

impl RestoreInput {
    fn prepare(file: &Path) -> Result<Self> {
        match CompressionFormat::from_extension(&format_tag(file)) {
            Some(format) => Ok(RestoreInput::Extracted(archive::extract_sql(file, format)?)),
            None => Ok(RestoreInput::Direct(file.to_path_buf())),
        }
    }

    fn path(&self) -> &Path {
        match self {
            RestoreInput::Direct(path) => path,
            RestoreInput::Extracted(tmp) => tmp.path(),
        }
    }
}

/// Walks one selection through validation and restore. Never touches the ledger.
#[derive(Debug)]
pub struct RestoreSelector<'a> {
    records: &'a [BackupRecord],
    state: SelectionState,
}

impl<'a> RestoreSelector<'a> {
    pub fn new(records: &'a [BackupRecord]) -> Self {
        RestoreSelector {
            records,
            state: SelectionState::AwaitingSelection,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    fn fail(&mut self, err: AppError) -> AppError {
        self.state = SelectionState::Failed(err.to_string());
        err
    }

    pub fn select(&mut self, input: &str) -> Result<&'a BackupRecord> {
        if self.state != SelectionState::AwaitingSelection {
            return Err(AppError::validation("a backup has already been selected"));
        }
        match parse_selection(input, self.records.len()) {
            Ok(index) => {
                self.state = SelectionState::Validated(index);
                Ok(&self.records[index])
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Restores the selected backup.
    ///
    /// The file is checked again here because listing and selection are not
    /// atomic; it may have been removed in between.
    pub fn restore(&mut self, tool: &dyn RestoreTool, params: &ConnectionParams) -> Result<()> {
        let index = match self.state {
            SelectionState::Validated(index) => index,
            _ => return Err(AppError::validation("no backup has been selected")),
        };
        let file = self.records[index].file_path().to_path_buf();
        if !file.is_file() {
            let err = AppError::validation(format!("Selected backup file not found: {}", file.display()));
            return Err(self.fail(err));
        }

        self.state = SelectionState::Restoring(file.clone());
        let result = RestoreInput::prepare(&file).and_then(|input| tool.restore(params, input.path()));
        match result {
            Ok(()) => {
                info!(file = %file.display(), database = %params.db_name, "restore finished");
                self.state = SelectionState::Done(file);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }
}
