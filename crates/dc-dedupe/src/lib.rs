//! Near-duplicate text detection shared by the classifier and
//! yellow-screen stages (spec §4.4): a pure in-memory Jaccard-over-
//! shingles backend always available, and a MinHash-LSH backend behind
//! the `minhash` feature. Both expose the same `add`/`query` surface and
//! `DuplicateResult` shape.

pub mod detector;
pub mod jaccard;
#[cfg(feature = "minhash")]
pub mod minhash;
pub mod model;
pub mod persist;
pub mod shingles;

pub use detector::{DuplicateResult, NearDupDetector};
pub use jaccard::JaccardIndex;
pub use model::DedupeConfig;
pub use persist::{load_combined_dedupe, save_combined_dedupe};
