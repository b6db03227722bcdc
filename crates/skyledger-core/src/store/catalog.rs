use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{LedgerError, Result};
use crate::frame::Tile;

/// Read a whitespace-separated tile catalog from disk.
pub fn load_tile_catalog(path: &Path) -> Result<Vec<Tile>> {
    let file = File::open(path)?;
    parse_tile_catalog(BufReader::new(file))
}

/// Parse a tile catalog: one header line, then `id ra dec` rows where `id` is
/// either `T00042` or a bare integer. Blank lines are ignored.
pub fn parse_tile_catalog<R: BufRead>(reader: R) -> Result<Vec<Tile>> {
    let mut tiles = Vec::new();

    for (index, line) in reader.lines().enumerate().skip(1) {
        let line = line?;
        let line_no = index + 1;
        let mut fields = line.split_whitespace();
        let Some(id_field) = fields.next() else {
            continue;
        };

        let bad = |reason: String| LedgerError::Catalog {
            line: line_no,
            reason,
        };

        let id_digits = id_field.strip_prefix('T').unwrap_or(id_field);
        let id: u32 = id_digits
            .parse()
            .map_err(|_| bad(format!("invalid tile id '{id_field}'")))?;

        let mut coordinate = |name: &str| -> Result<f64> {
            let raw = fields
                .next()
                .ok_or_else(|| bad(format!("missing {name}")))?;
            raw.parse()
                .map_err(|_| bad(format!("invalid {name} '{raw}'")))
        };
        let ra = coordinate("ra")?;
        let dec = coordinate("dec")?;

        tiles.push(Tile { id, ra, dec });
    }

    Ok(tiles)
}
