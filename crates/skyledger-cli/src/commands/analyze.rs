use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use skyledger_core::analysis::{analyze_scan, PatternAnalysis};
use skyledger_core::frame::parse_unit_selection;
use skyledger_core::scan::{ScanOptions, Scanner};

use crate::summary::print_analysis;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Data root containing one directory per unit
    pub root: PathBuf,

    /// Units to scan: `all`, a range like 7DT01-7DT10, or a list like 7DT01,7DT02
    #[arg(long, visible_alias = "unit", default_value = "all")]
    pub units: String,

    /// Analyze only the first N files found
    #[arg(long)]
    pub limit: Option<usize>,

    /// Also write the analysis as JSON
    #[arg(long)]
    pub output_json: Option<PathBuf>,
}

#[derive(Serialize)]
struct AnalysisOutput<'a> {
    root: &'a PathBuf,
    units: Vec<String>,
    files_found: usize,
    analysis: &'a PatternAnalysis,
}

pub fn run(args: &AnalyzeArgs) -> Result<()> {
    let units: Vec<String> = parse_unit_selection(&args.units)?
        .into_iter()
        .map(|u| u.to_string())
        .collect();
    let options = ScanOptions {
        units: units.clone(),
        folder_date: None,
    };

    let scan = Scanner::scan(&args.root, &options)
        .with_context(|| format!("Failed to scan {}", args.root.display()))?;
    let files_found = scan.files.len();
    let files = match args.limit {
        Some(limit) => &scan.files[..limit.min(files_found)],
        None => &scan.files[..],
    };

    let analysis = analyze_scan(files);
    print_analysis(&analysis, &args.root);

    if let Some(ref path) = args.output_json {
        let output = AnalysisOutput {
            root: &args.root,
            units,
            files_found,
            analysis: &analysis,
        };
        let json = serde_json::to_string_pretty(&output)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write analysis to {}", path.display()))?;
        println!("Analysis saved to {}", path.display());
    }

    Ok(())
}
