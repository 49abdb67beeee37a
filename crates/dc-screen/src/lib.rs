//! Yellow-screen pipeline (spec §4.3): per-domain filter/transform over
//! every yellow-bucket target's raw records, sharded output, and the
//! rejected-record pitch ledger.

pub mod domains;
pub mod error;
pub mod manifest;
pub mod model;
pub mod pitch;
pub mod screen;
pub mod sharder;

pub use domains::{DomainModule, DomainRegistry};
pub use error::ScreenError;
pub use manifest::{ScreenSummary, YellowScreenDone};
pub use model::{FilterDecision, OutputRecord, RecordHash, RecordSource, ScreenContext};
pub use pitch::{PassedLedgerRow, PitchConfig, PitchLedgerRow, PitchSample, PitchTracker};
pub use screen::{screen, ScreenConfig};
pub use sharder::{ShardCompletionMarker, ShardCompression, ShardConfig, Sharder};
