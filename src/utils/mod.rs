pub mod logger;
pub mod mysql;
pub mod progress;

use std::path::PathBuf;
use std::process::Output;
use which::which;

use crate::errors::{AppError, Result};

/// Finds an external tool in the system PATH.
pub fn find_executable(tool: &str) -> Result<PathBuf> {
    which(tool).map_err(|_| AppError::ToolNotFound { tool: tool.to_string() })
}

/// Trimmed stderr of a finished subprocess, for error messages.
pub fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}
