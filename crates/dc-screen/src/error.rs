// error.rs — error types for the yellow-screen stage.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("I/O error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error(transparent)]
    Core(#[from] dc_core::CoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A transformed record fails the OutputRecord contract. Per spec
    /// invariant 1, this is a programmer-bug-class failure: it aborts the
    /// stage rather than being skipped or pitched.
    #[error("output contract violation for target '{target_id}' row {row_index}: {reason}")]
    ContractViolation { target_id: String, row_index: usize, reason: String },

    #[error("unknown domain module '{name}'")]
    UnknownDomain { name: String },
}

impl ScreenError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScreenError::Io { path: path.into(), source }
    }
}
