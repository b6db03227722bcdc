use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use skyledger_core::config::IngestConfig;
use skyledger_core::ingest::{filter_candidates, ImportPipeline, ImportResult, ImportStats, ProgressReporter};
use skyledger_core::night::{flush_night, refresh_night_statistics};
use skyledger_core::resolve::{discover_targets, link_frames};
use skyledger_core::scan::{ScanOptions, Scanner};
use skyledger_core::store::MemoryStore;
use tracing::warn;

use super::{load_config, parse_date};
use crate::summary::print_import_summary;

#[derive(Args)]
pub struct ImportArgs {
    /// Data root containing one directory per unit
    pub root: PathBuf,

    /// Observing night to import
    #[arg(long, value_parser = parse_date)]
    pub date: NaiveDate,

    /// Config file (TOML); flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Use the worker pool regardless of batch size
    #[arg(long)]
    pub parallel: bool,

    /// Worker threads for parallel import
    #[arg(long)]
    pub workers: Option<usize>,

    /// Import only the first N candidates
    #[arg(long)]
    pub limit: Option<usize>,

    /// Keep focus exposures
    #[arg(long)]
    pub no_exclude_focus: bool,

    /// Keep test exposures
    #[arg(long)]
    pub no_exclude_test: bool,

    /// Only link frames to targets that already exist
    #[arg(long)]
    pub no_create_targets: bool,

    /// Read object coordinates from FITS headers
    #[arg(long)]
    pub read_headers: bool,

    /// Delete the night's frames from the ledger before importing
    #[arg(long)]
    pub cleanup: bool,
}

impl ImportArgs {
    fn apply(&self, config: &mut IngestConfig) {
        if self.parallel {
            config.import.parallel = true;
        }
        if let Some(workers) = self.workers {
            config.import.max_workers = workers.max(1);
        }
        if self.limit.is_some() {
            config.import.limit = self.limit;
        }
        if self.no_exclude_focus {
            config.import.exclude_focus = false;
        }
        if self.no_exclude_test {
            config.import.exclude_test = false;
        }
        if self.no_create_targets {
            config.resolver.create_missing_targets = false;
        }
        if self.read_headers {
            config.import.read_headers = true;
        }
    }
}

/// Progress bar driven by the import pipeline.
struct BarReporter {
    pb: ProgressBar,
}

impl BarReporter {
    fn new() -> Result<Self> {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg:32} [{bar:40}] {pos}/{len}")?
                .progress_chars("=> "),
        );
        Ok(Self { pb })
    }
}

impl ProgressReporter for BarReporter {
    fn begin(&self, total: usize, parallel: bool) {
        self.pb.set_length(total as u64);
        self.pb.set_message(if parallel {
            "Importing (parallel)"
        } else {
            "Importing"
        });
    }

    fn advance(&self, processed: usize, _total: usize, stats: &ImportStats) {
        self.pb.set_position(processed as u64);
        self.pb.set_message(format!(
            "{} new, {} known, {} failed",
            stats.imported, stats.existing, stats.failed
        ));
    }

    fn finish(&self, result: &ImportResult) {
        if result.cancelled {
            self.pb.abandon_with_message("Cancelled");
        } else {
            self.pb.finish_with_message("Done");
        }
    }
}

pub fn run(args: &ImportArgs, ledger: &Path) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);

    let store = MemoryStore::load(ledger)
        .with_context(|| format!("Failed to load ledger {}", ledger.display()))?;

    if args.cleanup {
        let flushed = flush_night(&store, args.date)?;
        println!(
            "Removed {} frames of {} from the ledger",
            flushed.frames_deleted, args.date
        );
    }

    let scan_options = ScanOptions {
        units: Vec::new(),
        folder_date: Some(args.date),
    };
    let scan = Scanner::scan(&args.root, &scan_options)
        .with_context(|| format!("Failed to scan {}", args.root.display()))?;
    for unit_error in &scan.unit_errors {
        warn!(unit = %unit_error.unit, "unit skipped: {}", unit_error.reason);
    }

    let (candidates, exclusions) = filter_candidates(scan.paths(), &config.import);
    println!(
        "Found {} files for {} ({} candidates, {} excluded)",
        scan.files.len(),
        args.date,
        candidates.len(),
        exclusions.total()
    );

    let discovery = discover_targets(&candidates, &store, &config.resolver)?;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || cancel.store(true, Ordering::Relaxed))
            .context("Failed to install Ctrl-C handler")?;
    }

    let reporter = BarReporter::new()?;
    let pipeline = ImportPipeline::new(&store, config.import.clone());
    let result = pipeline.run(&candidates, args.date, &reporter, &cancel)?;

    // A cancelled run keeps what it wrote but leaves linking for the next run.
    let links = if result.cancelled {
        None
    } else {
        Some(link_frames(&store, args.date, &config.resolver)?)
    };
    let night = refresh_night_statistics(&store, args.date)?;

    store
        .save(ledger)
        .with_context(|| format!("Failed to save ledger {}", ledger.display()))?;

    print_import_summary(&night, &exclusions, &discovery, &result, links.as_ref(), ledger);
    Ok(())
}
