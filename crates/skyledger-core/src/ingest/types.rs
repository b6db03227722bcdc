use std::collections::BTreeMap;

use serde::Serialize;

use crate::frame::FrameType;

/// Running counters, handed to progress reporters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub imported: usize,
    pub existing: usize,
    pub failed: usize,
}

impl ImportStats {
    pub fn processed(&self) -> usize {
        self.imported + self.existing + self.failed
    }

    pub fn merge(&mut self, other: &ImportStats) {
        self.imported += other.imported;
        self.existing += other.existing;
        self.failed += other.failed;
    }
}

/// A file that could not be imported.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImportError {
    pub filename: String,
    pub reason: String,
}

/// Outcome of one import run. `imported + existing + failed == total`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ImportResult {
    /// Files handed to the run.
    pub requested: usize,
    /// Files actually processed; below `requested` only when cancelled.
    pub total: usize,
    pub imported: usize,
    pub existing: usize,
    pub failed: usize,
    /// Newly imported frames per type.
    pub frame_type_breakdown: BTreeMap<FrameType, usize>,
    /// Sorted by filename.
    pub errors: Vec<ImportError>,
    pub cancelled: bool,
    pub parallel: bool,
    pub workers: usize,
}

impl ImportResult {
    pub fn stats(&self) -> ImportStats {
        ImportStats {
            imported: self.imported,
            existing: self.existing,
            failed: self.failed,
        }
    }
}

/// Thread-safe progress reporting for imports.
///
/// All methods have default no-op implementations. In parallel mode
/// `advance` is called from worker threads, never concurrently.
pub trait ProgressReporter: Send + Sync {
    /// The run is starting with `total` files.
    fn begin(&self, _total: usize, _parallel: bool) {}

    /// `processed` of `total` files are done.
    fn advance(&self, _processed: usize, _total: usize, _stats: &ImportStats) {}

    fn finish(&self, _result: &ImportResult) {}
}

pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
