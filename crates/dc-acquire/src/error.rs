// error.rs — error types for the acquire worker.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("I/O error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error(transparent)]
    Core(#[from] dc_core::CoreError),

    #[error(transparent)]
    Net(#[from] dc_net::NetError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("subprocess '{command}' failed: {detail}")]
    Subprocess { command: String, detail: String },

    #[error("target '{target_id}' has no download strategy configured")]
    MissingStrategy { target_id: String },

    #[error("size/hash verification failed for '{target_id}': {reason}")]
    VerificationFailed { target_id: String, reason: String },

    #[error("run byte budget exhausted")]
    BudgetExhausted,
}

impl AcquireError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AcquireError::Io { path: path.into(), source }
    }
}
