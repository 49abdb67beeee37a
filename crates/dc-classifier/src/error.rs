use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("I/O error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error(transparent)]
    Core(#[from] dc_core::CoreError),

    #[error(transparent)]
    Denylist(#[from] dc_denylist::DenylistError),

    #[error(transparent)]
    Net(#[from] dc_net::NetError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error at {path}: {source}")]
    Yaml { path: PathBuf, source: serde_yaml::Error },

    #[error("target '{id}' is malformed: {reason}")]
    InvalidTarget { id: String, reason: String },

    /// A record about to be written violates the output contract. Per
    /// invariant 1, this is a programmer-bug-class failure: it aborts the
    /// run rather than being skipped or warned about.
    #[error("output contract violation on target '{target_id}': {reason}")]
    ContractViolation { target_id: String, reason: String },
}

impl ClassifierError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ClassifierError::Io {
            path: path.into(),
            source,
        }
    }
}
