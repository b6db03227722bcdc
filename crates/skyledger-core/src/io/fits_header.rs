use std::path::Path;

use fitsio::hdu::FitsHdu;
use fitsio::headers::ReadsKey;
use fitsio::FitsFile;

use crate::error::{LedgerError, Result};
use crate::frame::Coordinates;

fn header_error(path: &Path, err: fitsio::errors::Error) -> LedgerError {
    LedgerError::FitsHeader {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

fn read_key_optional<T: ReadsKey>(hdu: &FitsHdu, fptr: &mut FitsFile, key: &str) -> Option<T> {
    hdu.read_key(fptr, key).ok()
}

/// Numeric keys are degrees; string keys may also be sexagesimal.
fn read_angle(hdu: &FitsHdu, fptr: &mut FitsFile, key: &str, hours: bool) -> Option<f64> {
    if let Some(value) = read_key_optional::<f64>(hdu, fptr, key) {
        return Some(value);
    }
    let raw: String = read_key_optional(hdu, fptr, key)?;
    parse_angle(&raw, hours)
}

fn read_pointing(hdu: &FitsHdu, fptr: &mut FitsFile, ra_key: &str, dec_key: &str) -> Option<Coordinates> {
    let ra = read_angle(hdu, fptr, ra_key, true)?;
    let dec = read_angle(hdu, fptr, dec_key, false)?;
    Some(Coordinates { ra, dec })
}

/// Pointing in degrees from `RA`/`DEC`, falling back to `OBJCTRA`/`OBJCTDEC`.
fn hdu_coordinates(hdu: &FitsHdu, fptr: &mut FitsFile) -> Option<Coordinates> {
    read_pointing(hdu, fptr, "RA", "DEC").or_else(|| read_pointing(hdu, fptr, "OBJCTRA", "OBJCTDEC"))
}

/// Decimal degrees, or sexagesimal `HH:MM:SS` / `DD MM SS`. With `hours`
/// the sexagesimal form is right ascension and is scaled by 15.
pub fn parse_angle(raw: &str, hours: bool) -> Option<f64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<f64>() {
        return Some(value);
    }
    let parts: Vec<&str> = raw
        .split(|c: char| c == ':' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 3 {
        return None;
    }
    let negative = parts[0].starts_with('-');
    let whole: f64 = parts[0].trim_start_matches(['-', '+']).parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;
    let mut value = whole + minutes / 60.0 + seconds / 3600.0;
    if hours {
        value *= 15.0;
    }
    Some(if negative { -value } else { value })
}

fn is_compressed(path: &Path) -> bool {
    path.to_str()
        .is_some_and(|p| p.to_ascii_lowercase().ends_with(".fz"))
}

/// Object coordinates from the primary header, or for tile-compressed `.fz`
/// files from the first extension when the primary has none.
pub fn read_coordinates(path: &Path) -> Result<Option<Coordinates>> {
    let mut fptr = FitsFile::open(path).map_err(|e| header_error(path, e))?;
    let primary = fptr.primary_hdu().map_err(|e| header_error(path, e))?;
    if let Some(coordinates) = hdu_coordinates(&primary, &mut fptr) {
        return Ok(Some(coordinates));
    }
    if !is_compressed(path) {
        return Ok(None);
    }

    let extension = fptr.hdu(1).map_err(|e| header_error(path, e))?;
    Ok(hdu_coordinates(&extension, &mut fptr))
}
