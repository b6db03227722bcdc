//! Frame import: candidate filtering, then dedup, classify and persist.

mod filter;
mod pipeline;
mod types;

pub use filter::filter_candidates;
pub use pipeline::ImportPipeline;
pub use types::{ImportError, ImportResult, ImportStats, NoOpReporter, ProgressReporter};
