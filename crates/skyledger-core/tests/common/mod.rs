#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime};
use tempfile::TempDir;

use skyledger_core::classify::GrammarId;
use skyledger_core::frame::{FrameRecord, FrameType};

pub const FITS_BLOCK: usize = 2880;

/// One canonical filename per grammar, in priority order.
pub const CANONICAL: &[(&str, GrammarId)] = &[
    (
        "7DT01_20250301_034512_M51_m625_1x1_100.0s_0001.fits",
        GrammarId::Current,
    ),
    (
        "7DT02_LIGHT_NGC1566_2023-10-12_03-01-14_r_60.00s_0021.fits",
        GrammarId::UnitLegacy,
    ),
    (
        "FlatWizard_m625_2.50s_2023-10-12_05-03-25_0007.fits",
        GrammarId::FlatWizard,
    ),
    (
        "LIGHT_NGC1566_20_2023-10-12_03-01-14_r_60.00s_0021.fits",
        GrammarId::TypedLegacy,
    ),
    (
        "DARK__2023-10-11_20-51-11_u_60.00s_0017.fits",
        GrammarId::TypedLegacy,
    ),
    (
        "NGC253_2023-09-30_01-12-40_g_120.00s_0003.fits",
        GrammarId::ObjectLegacy,
    ),
    (
        "LTT1020_2023-10-11_02-58-48_u_$$$$_60.00s_0000.fits",
        GrammarId::ObjectTemperature,
    ),
    (
        "2023-10-11_02-58-48_m625_-10.0_60.00s_0000.fits",
        GrammarId::BareTemperature,
    ),
];

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn time(h: u32, m: u32, s: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, s).unwrap()
}

/// Filename in the current grammar for unit `unit` (1-based).
pub fn current_name(unit: u8, date: &str, time: &str, object: &str, seq: u32) -> String {
    format!("7DT{unit:02}_{date}_{time}_{object}_m625_1x1_100.0s_{seq:04}.fits")
}

/// Temporary `<root>/<unit>/<folder>/<file>` tree.
pub struct DataTree {
    pub dir: TempDir,
}

impl DataTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Create an empty file and return its path.
    pub fn touch(&self, unit: &str, folder: &str, filename: &str) -> PathBuf {
        self.write(unit, folder, filename, b"")
    }

    pub fn write(&self, unit: &str, folder: &str, filename: &str, bytes: &[u8]) -> PathBuf {
        let dir = self.root().join(unit).join(folder);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(filename);
        fs::write(&path, bytes).unwrap();
        path
    }
}

/// Format one 80-byte header card. Strings start in column 11, other values
/// end in column 30.
pub fn card(keyword: &str, value: &str) -> String {
    let text = if value.starts_with('\'') {
        format!("{keyword:<8}= {value:<20}")
    } else {
        format!("{keyword:<8}= {value:>20}")
    };
    format!("{text:<80}")
}

fn finish_header(mut cards: Vec<String>) -> Vec<u8> {
    cards.push(format!("{:<80}", "END"));
    let mut bytes: Vec<u8> = cards.concat().into_bytes();
    let padded = bytes.len().div_ceil(FITS_BLOCK) * FITS_BLOCK;
    bytes.resize(padded, b' ');
    bytes
}

/// Primary header with no data unit plus the given extra cards.
pub fn fits_primary(extra: &[(&str, &str)]) -> Vec<u8> {
    fits_primary_with_axes(&[], extra)
}

/// 16-bit primary header declaring `axes`. The caller appends the data unit.
pub fn fits_primary_with_axes(axes: &[&str], extra: &[(&str, &str)]) -> Vec<u8> {
    let mut cards = vec![
        card("SIMPLE", "T"),
        card("BITPIX", "16"),
        card("NAXIS", &axes.len().to_string()),
    ];
    for (n, axis) in axes.iter().enumerate() {
        cards.push(card(&format!("NAXIS{}", n + 1), axis));
    }
    cards.extend(extra.iter().map(|(k, v)| card(k, v)));
    finish_header(cards)
}

/// Image extension header with no data plus the given extra cards.
pub fn fits_extension(extra: &[(&str, &str)]) -> Vec<u8> {
    let mut cards = vec![
        card("XTENSION", "'IMAGE   '"),
        card("BITPIX", "16"),
        card("NAXIS", "0"),
        card("PCOUNT", "0"),
        card("GCOUNT", "1"),
    ];
    cards.extend(extra.iter().map(|(k, v)| card(k, v)));
    finish_header(cards)
}

/// Science record as the importer would write it.
pub fn science_record(
    filename: &str,
    night: NaiveDate,
    object: &str,
    obs_time: NaiveTime,
    seq: u32,
    coordinates: Option<(f64, f64)>,
) -> FrameRecord {
    FrameRecord {
        original_filename: filename.to_string(),
        frame_type: FrameType::Science,
        path: PathBuf::from(filename),
        file_size: None,
        night,
        unit: None,
        object_name: object.to_string(),
        obs_date: night,
        obs_time,
        filter_name: Some("m625".to_string()),
        exposure_seconds: Some(100.0),
        sequence_number: seq,
        source_pattern: GrammarId::Current,
        object_ra: coordinates.map(|c| c.0),
        object_dec: coordinates.map(|c| c.1),
        target: None,
        tile: None,
    }
}
