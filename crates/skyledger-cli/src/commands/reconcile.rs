use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Args;
use skyledger_core::frame::parse_unit_selection;
use skyledger_core::reconcile::{reconcile, DateFilter};
use skyledger_core::scan::{ScanOptions, Scanner};
use skyledger_core::store::{FrameStore, MemoryStore};

use super::{load_config, parse_date};
use crate::summary::{print_folder_breakdown, print_reconcile_summary};

#[derive(Args)]
pub struct ReconcileArgs {
    /// Data root containing one directory per unit
    pub root: PathBuf,

    /// Specific dates to check
    #[arg(long, num_args = 1.., value_delimiter = ',', value_parser = parse_date)]
    pub dates: Vec<NaiveDate>,

    /// First date of a range
    #[arg(long, value_parser = parse_date)]
    pub start_date: Option<NaiveDate>,

    /// Last date of a range
    #[arg(long, value_parser = parse_date)]
    pub end_date: Option<NaiveDate>,

    /// Units to scan: `all`, a range like 7DT01-7DT10, or a list like 7DT01,7DT02
    #[arg(long, default_value = "all")]
    pub units: String,

    /// Print the summary without writing the detailed report
    #[arg(long)]
    pub summary_only: bool,

    /// Detailed report path (default: generated from the filter and time)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Show counts for every unit/folder
    #[arg(long)]
    pub by_folders: bool,

    /// Show only folders that have missing files
    #[arg(long)]
    pub list_missing_folders: bool,

    /// Config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: &ReconcileArgs, ledger: &Path) -> Result<()> {
    // Reject conflicting filters before touching the disk.
    let filter = DateFilter::from_parts(args.dates.clone(), args.start_date, args.end_date)?;
    let config = load_config(args.config.as_deref())?;
    let units: Vec<String> = parse_unit_selection(&args.units)?
        .into_iter()
        .map(|u| u.to_string())
        .collect();

    let store = MemoryStore::load(ledger)
        .with_context(|| format!("Failed to load ledger {}", ledger.display()))?;
    let registered = store.registered_filenames()?;

    let scan_options = ScanOptions {
        units,
        folder_date: None,
    };
    let scan = Scanner::scan(&args.root, &scan_options)
        .with_context(|| format!("Failed to scan {}", args.root.display()))?;

    let report = reconcile(&scan.files, &registered, &filter);
    print_reconcile_summary(&report, config.report.top_n);
    if args.by_folders || args.list_missing_folders {
        print_folder_breakdown(&report, args.list_missing_folders);
    }

    if args.summary_only || config.report.summary_only {
        return Ok(());
    }

    let path = args
        .output
        .clone()
        .or_else(|| config.report.output.clone())
        .unwrap_or_else(|| default_report_name(&filter));
    let file = File::create(&path)
        .with_context(|| format!("Failed to create report {}", path.display()))?;
    let mut out = BufWriter::new(file);
    report
        .write_detailed_report(&mut out)
        .and_then(|_| out.flush())
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    println!("Detailed report saved to {}", path.display());

    Ok(())
}

fn default_report_name(filter: &DateFilter) -> PathBuf {
    let compact = |d: &NaiveDate| d.format("%Y%m%d").to_string();
    let suffix = match filter {
        DateFilter::All => "all".to_string(),
        DateFilter::Dates(dates) => {
            let list: Vec<String> = dates.iter().map(compact).collect();
            format!("dates_{}", list.join("_"))
        }
        DateFilter::Range { start, end } => format!(
            "range_{}_to_{}",
            start.as_ref().map_or_else(|| "start".to_string(), compact),
            end.as_ref().map_or_else(|| "end".to_string(), compact),
        ),
    };
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("missing_files_analysis_{suffix}_{timestamp}.log"))
}
