//! The SSRF-safe blocking HTTP client shared by the evidence fetcher and
//! the acquire worker's HTTP strategy: one client, manual redirect
//! following so every hop is checked, and the retry/backoff classification
//! both callers need for transient failures.

pub mod client;
pub mod error;
pub mod ssrf;

pub use client::{
    backoff_delay, build_client, get_validated, get_validated_with_headers, is_transient_error, is_transient_status,
};
pub use error::NetError;
pub use ssrf::{check_url, is_global_unicast, InternalMirrorAllowlist};
