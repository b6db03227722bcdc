use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use skyledger_core::store::{load_tile_catalog, MemoryStore, TargetStore};
use tracing::debug;

#[derive(Args)]
pub struct TilesArgs {
    /// Tile catalog: a header line, then `id ra dec` rows
    pub catalog: PathBuf,
}

pub fn run(args: &TilesArgs, ledger: &Path) -> Result<()> {
    let tiles = load_tile_catalog(&args.catalog)
        .with_context(|| format!("Failed to read catalog {}", args.catalog.display()))?;

    let store = MemoryStore::load(ledger)
        .with_context(|| format!("Failed to load ledger {}", ledger.display()))?;

    let mut added = 0usize;
    let mut updated = 0usize;
    for tile in tiles {
        debug!(tile = %tile.name(), ra = tile.ra, dec = tile.dec, "upserting tile");
        if store.upsert_tile(tile)? {
            added += 1;
        } else {
            updated += 1;
        }
    }

    store
        .save(ledger)
        .with_context(|| format!("Failed to save ledger {}", ledger.display()))?;

    println!(
        "Loaded {} tiles from {} ({} new, {} updated, {} in ledger)",
        added + updated,
        args.catalog.display(),
        added,
        updated,
        store.tile_count()
    );
    Ok(())
}
