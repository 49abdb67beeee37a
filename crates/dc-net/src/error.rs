use std::net::IpAddr;
use thiserror::Error;

/// Errors surfaced by SSRF checks and the redirect-validated client. These
/// map directly onto the `blocked_url` result shape used by HTTP download
/// handlers: `error:"blocked_url"`, `reason:"blocked_ip:<addr>:<reason>"` or
/// `"blocked_host:<host>"`.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("blocked_host:{host}")]
    BlockedHost { host: String },

    #[error("blocked_ip:{addr}:{reason}")]
    BlockedIp { addr: IpAddr, reason: String },

    #[error("DNS resolution failed for host '{host}': {source}")]
    Dns { host: String, source: std::io::Error },

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("too many redirects ({0}) following '{1}'")]
    TooManyRedirects(u32, String),

    #[error("redirect to '{0}' has no resolvable host")]
    UnresolvableRedirect(String),

    #[error("mismatched Content-Range on resumed download: expected prefix {expected}, got {got}")]
    MismatchedContentRange { expected: String, got: String },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl NetError {
    /// The `reason` string recorded in a `blocked_url` result row.
    pub fn blocked_reason(&self) -> Option<String> {
        match self {
            NetError::BlockedHost { host } => Some(format!("blocked_host:{host}")),
            NetError::BlockedIp { addr, reason } => Some(format!("blocked_ip:{addr}:{reason}")),
            _ => None,
        }
    }
}
