use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use skyledger_core::frame::parse_unit_selection;
use skyledger_core::scan::{validate_folders, ScanOptions};

use crate::summary::print_folder_validation;

#[derive(Args)]
pub struct ValidateArgs {
    /// Data root containing one directory per unit
    pub root: PathBuf,

    /// Units to check: `all`, a range like 7DT01-7DT10, or a list like 7DT01,7DT02
    #[arg(long, visible_alias = "unit", default_value = "all")]
    pub units: String,

    /// List every folder with an issue
    #[arg(long)]
    pub detailed: bool,
}

pub fn run(args: &ValidateArgs) -> Result<()> {
    let options = ScanOptions {
        units: parse_unit_selection(&args.units)?
            .into_iter()
            .map(|u| u.to_string())
            .collect(),
        folder_date: None,
    };
    let today = chrono::Local::now().date_naive();

    let validation = validate_folders(&args.root, &options, today)
        .with_context(|| format!("Failed to validate {}", args.root.display()))?;
    print_folder_validation(&validation, args.detailed);
    Ok(())
}
