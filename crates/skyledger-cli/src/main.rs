mod commands;
mod summary;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "skyledger", about = "Exposure file ingest and reconciliation")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Ledger file holding frames, nights, targets and tiles
    #[arg(long, global = true, default_value = "skyledger.json")]
    ledger: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify filenames against the known grammars
    Classify(commands::classify::ClassifyArgs),
    /// Show how filename grammars are distributed under a data root
    Analyze(commands::analyze::AnalyzeArgs),
    /// Import one observing night into the ledger
    Import(commands::import::ImportArgs),
    /// Find science files on disk that the ledger does not know about
    Reconcile(commands::reconcile::ReconcileArgs),
    /// Load a tile catalog into the ledger
    Tiles(commands::tiles::TilesArgs),
    /// Check date folder names under a data root
    Validate(commands::validate::ValidateArgs),
    /// Print or save the default configuration
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Classify(args) => commands::classify::run(args),
        Commands::Analyze(args) => commands::analyze::run(args),
        Commands::Import(args) => commands::import::run(args, &cli.ledger),
        Commands::Reconcile(args) => commands::reconcile::run(args, &cli.ledger),
        Commands::Tiles(args) => commands::tiles::run(args, &cli.ledger),
        Commands::Validate(args) => commands::validate::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
