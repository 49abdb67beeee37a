// error.rs — Error types shared by the substrate modules.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by `dc-core`'s filesystem, ledger, checkpoint, and
/// archive-safety primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A path traversal attempt was detected during archive extraction.
    #[error("path traversal detected: archive member '{member}' resolves outside '{dest}'")]
    PathTraversal { member: String, dest: PathBuf },

    /// A symlink or hardlink member was rejected during archive extraction.
    #[error("symlink/hardlink member rejected: '{member}'")]
    Symlink { member: String },

    /// A decompression-bomb guard tripped during archive extraction.
    #[error("decompression bomb detected: member '{member}' exceeded declared size")]
    DecompressionBomb { member: String },

    /// An archive exceeded its member-count or total-bytes cap.
    #[error("archive exceeded limit: {limit_type} (limit={limit}, observed={observed})")]
    ArchiveLimitExceeded {
        limit_type: &'static str,
        limit: u64,
        observed: u64,
    },

    /// Advisory lock could not be acquired within the timeout.
    #[error("could not acquire lock on '{path}' within {timeout_secs}s")]
    LockTimeout { path: PathBuf, timeout_secs: u64 },
}

impl CoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.into(),
            source,
        }
    }
}
