use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::types::{ImportError, ImportResult, ImportStats, ProgressReporter};
use crate::classify::classify;
use crate::config::ImportOptions;
use crate::error::Result;
use crate::frame::{FrameRecord, FrameType, UnitId};
use crate::io::read_coordinates;
use crate::store::{FrameStore, InsertOutcome, NightRegistry, StoreError, StoreResult};

/// Imports one night's files into a store.
pub struct ImportPipeline<'a, S: ?Sized> {
    store: &'a S,
    options: ImportOptions,
}

enum FileOutcome {
    Imported(FrameType),
    Existing,
    Failed(ImportError),
}

/// Per-worker counters. `pending` holds what has not been published yet.
#[derive(Default)]
struct Tally {
    stats: ImportStats,
    pending: ImportStats,
    breakdown: BTreeMap<FrameType, usize>,
    errors: Vec<ImportError>,
    cancelled: bool,
}

impl Tally {
    fn record(&mut self, outcome: FileOutcome) {
        let delta = match outcome {
            FileOutcome::Imported(frame_type) => {
                *self.breakdown.entry(frame_type).or_insert(0) += 1;
                ImportStats {
                    imported: 1,
                    ..Default::default()
                }
            }
            FileOutcome::Existing => ImportStats {
                existing: 1,
                ..Default::default()
            },
            FileOutcome::Failed(error) => {
                self.errors.push(error);
                ImportStats {
                    failed: 1,
                    ..Default::default()
                }
            }
        };
        self.stats.merge(&delta);
        self.pending.merge(&delta);
    }

    fn merge(mut self, other: Tally) -> Tally {
        self.stats.merge(&other.stats);
        self.pending.merge(&other.pending);
        for (frame_type, count) in other.breakdown {
            *self.breakdown.entry(frame_type).or_insert(0) += count;
        }
        self.errors.extend(other.errors);
        self.cancelled |= other.cancelled;
        self
    }
}

/// Counters shared by all workers, written once per progress batch.
struct SharedProgress<'r> {
    total: usize,
    imported: AtomicUsize,
    existing: AtomicUsize,
    failed: AtomicUsize,
    gate: Mutex<()>,
    reporter: &'r dyn ProgressReporter,
}

impl<'r> SharedProgress<'r> {
    fn new(total: usize, reporter: &'r dyn ProgressReporter) -> Self {
        Self {
            total,
            imported: AtomicUsize::new(0),
            existing: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            gate: Mutex::new(()),
            reporter,
        }
    }

    fn publish(&self, tally: &mut Tally) {
        let delta = std::mem::take(&mut tally.pending);
        if delta.processed() == 0 {
            return;
        }
        self.imported.fetch_add(delta.imported, Ordering::Relaxed);
        self.existing.fetch_add(delta.existing, Ordering::Relaxed);
        self.failed.fetch_add(delta.failed, Ordering::Relaxed);

        // Skip the report rather than wait if another worker holds the gate.
        if let Some(_guard) = self.gate.try_lock() {
            let stats = ImportStats {
                imported: self.imported.load(Ordering::Relaxed),
                existing: self.existing.load(Ordering::Relaxed),
                failed: self.failed.load(Ordering::Relaxed),
            };
            self.reporter.advance(stats.processed(), self.total, &stats);
        }
    }
}

impl<'a, S> ImportPipeline<'a, S>
where
    S: FrameStore + NightRegistry + ?Sized,
{
    pub fn new(store: &'a S, options: ImportOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Import `files` under `night`.
    ///
    /// Setting `cancel` stops workers before their next file; records already
    /// written stay and the partial result has `cancelled = true`.
    pub fn run(
        &self,
        files: &[PathBuf],
        night: NaiveDate,
        reporter: &dyn ProgressReporter,
        cancel: &AtomicBool,
    ) -> Result<ImportResult> {
        let requested = files.len();
        if requested > 0 {
            self.with_retries(|| self.store.get_or_create_night(night))?;
        }

        let parallel = requested > 0 && self.options.use_parallel(requested);
        let workers = if parallel {
            self.options.max_workers.clamp(1, requested)
        } else {
            1
        };
        info!(files = requested, %night, parallel, workers, "import starting");
        reporter.begin(requested, parallel);

        let progress = SharedProgress::new(requested, reporter);
        let tally = if parallel {
            let chunk_size = requested.div_ceil(workers);
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()?;
            pool.install(|| {
                files
                    .par_chunks(chunk_size)
                    .map(|chunk| self.process_slice(chunk, night, &progress, cancel))
                    .reduce(Tally::default, Tally::merge)
            })
        } else {
            self.process_slice(files, night, &progress, cancel)
        };

        let mut errors = tally.errors;
        errors.sort_by(|a, b| a.filename.cmp(&b.filename));

        let result = ImportResult {
            requested,
            total: tally.stats.processed(),
            imported: tally.stats.imported,
            existing: tally.stats.existing,
            failed: tally.stats.failed,
            frame_type_breakdown: tally.breakdown,
            errors,
            cancelled: tally.cancelled,
            parallel,
            workers,
        };

        if result.cancelled {
            warn!(
                processed = result.total,
                requested, "import cancelled, returning partial result"
            );
        }
        info!(
            imported = result.imported,
            existing = result.existing,
            failed = result.failed,
            "import finished"
        );
        reporter.finish(&result);
        Ok(result)
    }

    fn process_slice(
        &self,
        files: &[PathBuf],
        night: NaiveDate,
        progress: &SharedProgress<'_>,
        cancel: &AtomicBool,
    ) -> Tally {
        let interval = self.options.progress_interval.max(1);
        let mut tally = Tally::default();

        for path in files {
            if cancel.load(Ordering::Relaxed) {
                tally.cancelled = true;
                break;
            }
            let outcome = self.process_file(path, night);
            tally.record(outcome);
            if tally.pending.processed() >= interval {
                progress.publish(&mut tally);
            }
        }
        progress.publish(&mut tally);
        tally
    }

    fn process_file(&self, path: &Path, night: NaiveDate) -> FileOutcome {
        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => {
                return FileOutcome::Failed(ImportError {
                    filename: path.display().to_string(),
                    reason: "filename is not valid UTF-8".to_string(),
                })
            }
        };
        let fail = |reason: String| {
            FileOutcome::Failed(ImportError {
                filename: filename.clone(),
                reason,
            })
        };

        match self.with_retries(|| self.store.contains_filename(&filename)) {
            Ok(true) => return FileOutcome::Existing,
            Ok(false) => {}
            Err(e) => return fail(e.to_string()),
        }

        let parsed = match classify(&filename) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(file = %filename, "classification failed: {}", e);
                return fail(e.to_string());
            }
        };
        let frame_type = parsed.frame_type;

        let mut record =
            FrameRecord::from_parsed(&filename, path.to_path_buf(), parsed, night, unit_from_path(path));
        record.file_size = fs::metadata(path).ok().map(|m| m.len());

        if self.options.read_headers && frame_type == FrameType::Science {
            match read_coordinates(path) {
                Ok(Some(coordinates)) => {
                    record.object_ra = Some(coordinates.ra);
                    record.object_dec = Some(coordinates.dec);
                }
                Ok(None) => debug!(file = %filename, "no coordinates in header"),
                Err(e) => debug!(file = %filename, "header read failed: {}", e),
            }
        }

        match self.with_retries(|| self.store.insert_if_absent(record.clone())) {
            Ok(InsertOutcome::Inserted) => {
                debug!(file = %filename, %frame_type, "imported");
                FileOutcome::Imported(frame_type)
            }
            Ok(InsertOutcome::AlreadyExists) | Err(StoreError::Conflict(_)) => {
                FileOutcome::Existing
            }
            Err(e) => fail(e.to_string()),
        }
    }

    /// Repeat `op` while it fails with a transient error, up to `store_retries` times.
    fn with_retries<T>(&self, op: impl Fn() -> StoreResult<T>) -> StoreResult<T> {
        let mut attempt = 0;
        loop {
            match op() {
                Err(e) if e.is_transient() && attempt < self.options.store_retries => {
                    attempt += 1;
                    debug!(attempt, "transient store error, retrying: {}", e);
                    thread::sleep(Duration::from_millis(5 * attempt as u64));
                }
                other => return other,
            }
        }
    }
}

/// Unit directory two levels above the file, if it names a valid unit.
fn unit_from_path(path: &Path) -> Option<UnitId> {
    path.parent()?
        .parent()?
        .file_name()?
        .to_str()?
        .parse()
        .ok()
}
