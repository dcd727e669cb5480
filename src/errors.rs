use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Backup ledger {} is corrupt: {reason}", path.display())]
    StoreCorrupt { path: PathBuf, reason: String },

    #[error("Backup ledger {} is locked by another process (lock file {})", ledger.display(), lock.display())]
    LedgerLocked { ledger: PathBuf, lock: PathBuf },

    #[error("Database dump failed with {status}. Partial output kept at {}. Stderr: {stderr}", output.display())]
    DumpFailed {
        status: String,
        output: PathBuf,
        stderr: String,
    },

    #[error("Database restore from {} failed with {status}. Stderr: {stderr}", input.display())]
    RestoreFailed {
        status: String,
        input: PathBuf,
        stderr: String,
    },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Email configuration error: {0}")]
    MailConfig(String),

    #[error("Failed to send email: {0}")]
    MailSend(String),

    #[error("Storage operation failed: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{tool} executable not found in PATH. Please ensure it is installed and in your PATH.")]
    ToolNotFound { tool: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    /// Process exit code reported for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Validation(_) => 2,
            AppError::StoreCorrupt { .. } => 3,
            AppError::DumpFailed { .. } => 4,
            AppError::RestoreFailed { .. } => 5,
            AppError::MailConfig(_) => 6,
            AppError::MailSend(_) => 7,
            AppError::Storage(_) => 8,
            AppError::LedgerLocked { .. } => 9,
            AppError::Config(_) => 10,
            AppError::ToolNotFound { .. }
            | AppError::Io(_)
            | AppError::SerdeJson(_)
            | AppError::Anyhow(_) => 1,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
