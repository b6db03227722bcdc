use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::classify::ExclusionReason;
use crate::consts::{
    AUTO_PARALLEL_THRESHOLD, DEFAULT_MAX_WORKERS, DEFAULT_PROGRESS_INTERVAL,
    DEFAULT_STORE_RETRIES, DEFAULT_TARGET_SAMPLE_SIZE, REPORT_TOP_N,
};

/// Top-level configuration file. Every section may be omitted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default)]
    pub import: ImportOptions,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Force the worker pool even for small batches.
    pub parallel: bool,
    pub max_workers: usize,
    /// Batches at least this large run in parallel without being asked.
    pub auto_parallel_threshold: usize,
    /// Files per worker between progress publications.
    pub progress_interval: usize,
    /// Retries for transient store failures.
    pub store_retries: usize,
    /// Keep only the first N candidates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    pub exclude_focus: bool,
    pub exclude_test: bool,
    /// Fill object coordinates from FITS headers.
    pub read_headers: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            max_workers: DEFAULT_MAX_WORKERS,
            auto_parallel_threshold: AUTO_PARALLEL_THRESHOLD,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            store_retries: DEFAULT_STORE_RETRIES,
            limit: None,
            exclude_focus: true,
            exclude_test: true,
            read_headers: false,
        }
    }
}

impl ImportOptions {
    /// Whether a batch of `total` files should use the worker pool.
    pub fn use_parallel(&self, total: usize) -> bool {
        self.parallel || total >= self.auto_parallel_threshold
    }

    /// Exclusion categories honoured by the ingest filter. Only the focus and
    /// test categories can be switched off.
    pub fn category_enabled(&self, reason: ExclusionReason) -> bool {
        match reason {
            ExclusionReason::Focus => self.exclude_focus,
            ExclusionReason::Test => self.exclude_test,
            _ => true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Upper bound on files classified by target discovery.
    pub sample_size: usize,
    /// Create targets the sampling pass did not see when linking.
    pub create_missing_targets: bool,
    /// Copy frame coordinates onto placeholder targets.
    pub backfill_coordinates: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_TARGET_SAMPLE_SIZE,
            create_missing_targets: true,
            backfill_coordinates: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Entries shown in console top lists.
    pub top_n: usize,
    /// Skip writing the detailed report file.
    pub summary_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_n: REPORT_TOP_N,
            summary_only: false,
            output: None,
        }
    }
}
