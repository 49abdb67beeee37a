//! Shared CLI plumbing for the `dc` dispatcher and the three thin
//! per-stage binaries (`dc-classify`, `dc-acquire`, `dc-screen`):
//! the common flag set (spec §6.3), config-builders that turn those
//! flags into each stage's `*Config`, and exit-code/logging helpers.

pub mod common;
