// strategies/mod.rs — one module per acquisition strategy (spec §4.2.4).
// `http` carries the bulk of the real logic; the rest shell out to an
// external tool or a narrow JSON API and report back in the same shape.

pub mod github_release;
pub mod git;
pub mod ftp;
pub mod http;
pub mod huggingface;
pub mod none;
pub mod s3;
pub mod torrent;
pub mod zenodo;

pub(crate) mod support;
