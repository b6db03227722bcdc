use std::path::PathBuf;

use tracing::debug;

use crate::classify::{exclusion_reason_with, ExclusionStats};
use crate::config::ImportOptions;

/// Drop non-science files using the shared rule table, then apply `limit`.
pub fn filter_candidates(
    paths: Vec<PathBuf>,
    options: &ImportOptions,
) -> (Vec<PathBuf>, ExclusionStats) {
    let mut stats = ExclusionStats::default();
    let mut kept = Vec::with_capacity(paths.len());

    for path in paths {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match exclusion_reason_with(&filename, |r| options.category_enabled(r)) {
            Some(reason) => {
                debug!(file = %filename, %reason, "excluded");
                stats.record(reason);
            }
            None => kept.push(path),
        }
    }

    if let Some(limit) = options.limit {
        kept.truncate(limit);
    }
    (kept, stats)
}
