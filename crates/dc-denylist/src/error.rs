use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DenylistError {
    #[error("I/O error reading denylist at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("failed to parse denylist YAML at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}
