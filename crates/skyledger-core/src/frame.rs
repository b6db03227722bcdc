use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::classify::GrammarId;
use crate::consts::{MAX_UNIT_NUMBER, PLACEHOLDER_DEC, PLACEHOLDER_RA, UNIT_PREFIX};
use crate::error::LedgerError;

/// Kind of exposure a file holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FrameType {
    Science,
    Bias,
    Dark,
    Flat,
    Unknown,
}

impl FrameType {
    /// Normalise an explicit frame-type token. `LIGHT` is the camera's name for science.
    pub fn from_token(token: &str) -> Self {
        match token.to_ascii_uppercase().as_str() {
            "LIGHT" | "SCIENCE" => Self::Science,
            "BIAS" => Self::Bias,
            "DARK" => Self::Dark,
            "FLAT" => Self::Flat,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Science => write!(f, "SCIENCE"),
            Self::Bias => write!(f, "BIAS"),
            Self::Dark => write!(f, "DARK"),
            Self::Flat => write!(f, "FLAT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Telescope unit identifier, `7DT01` through `7DT20`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UnitId(u8);

impl UnitId {
    pub fn new(number: u8) -> Result<Self, LedgerError> {
        if (1..=MAX_UNIT_NUMBER).contains(&number) {
            Ok(Self(number))
        } else {
            Err(LedgerError::InvalidUnit(format!("{UNIT_PREFIX}{number:02}")))
        }
    }

    pub fn number(&self) -> u8 {
        self.0
    }
}

/// Parse a unit selection: `all`, a range `7DT01-7DT10`, or a comma list
/// `7DT01,7DT03`. The result is sorted and deduplicated.
pub fn parse_unit_selection(spec: &str) -> Result<Vec<UnitId>, LedgerError> {
    let spec = spec.trim();
    if spec.eq_ignore_ascii_case("all") {
        return (1..=MAX_UNIT_NUMBER).map(UnitId::new).collect();
    }

    let mut units = Vec::new();
    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: UnitId = start.trim().parse()?;
                let end: UnitId = end.trim().parse()?;
                if start > end {
                    return Err(LedgerError::InvalidUnit(part.to_string()));
                }
                units.extend((start.0..=end.0).map(UnitId));
            }
            None => units.push(part.parse()?),
        }
    }
    units.sort();
    units.dedup();
    Ok(units)
}

impl FromStr for UnitId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix(UNIT_PREFIX)
            .filter(|d| !d.is_empty() && d.len() <= 2 && d.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| LedgerError::InvalidUnit(s.to_string()))?;
        let number: u8 = digits
            .parse()
            .map_err(|_| LedgerError::InvalidUnit(s.to_string()))?;
        Self::new(number).map_err(|_| LedgerError::InvalidUnit(s.to_string()))
    }
}

impl TryFrom<String> for UnitId {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UnitId> for String {
    fn from(unit: UnitId) -> Self {
        unit.to_string()
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{UNIT_PREFIX}{:02}", self.0)
    }
}

/// Equatorial coordinates in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub ra: f64,
    pub dec: f64,
}

/// Metadata recovered from a filename by the grammar classifier.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedFrame {
    pub frame_type: FrameType,
    /// May be empty for legacy calibration names such as `DARK__...`.
    pub object_name: String,
    pub obs_date: NaiveDate,
    pub obs_time: NaiveTime,
    pub filter_name: Option<String>,
    /// `None` when the grammar carries no exposure token.
    pub exposure_seconds: Option<f64>,
    pub sequence_number: u32,
    pub source_pattern: GrammarId,
    pub unit: Option<UnitId>,
    pub binning: Option<String>,
    /// `None` for grammars without a temperature token and for the `$$$$` placeholder.
    pub ccd_temperature: Option<f64>,
}

/// Persisted frame row. `original_filename` is unique across the whole store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub original_filename: String,
    pub frame_type: FrameType,
    pub path: PathBuf,
    pub file_size: Option<u64>,
    pub night: NaiveDate,
    pub unit: Option<UnitId>,
    pub object_name: String,
    pub obs_date: NaiveDate,
    pub obs_time: NaiveTime,
    pub filter_name: Option<String>,
    pub exposure_seconds: Option<f64>,
    pub sequence_number: u32,
    pub source_pattern: GrammarId,
    #[serde(default)]
    pub object_ra: Option<f64>,
    #[serde(default)]
    pub object_dec: Option<f64>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub tile: Option<u32>,
}

impl FrameRecord {
    pub fn from_parsed(
        filename: &str,
        path: PathBuf,
        parsed: ParsedFrame,
        night: NaiveDate,
        unit: Option<UnitId>,
    ) -> Self {
        Self {
            original_filename: filename.to_string(),
            frame_type: parsed.frame_type,
            path,
            file_size: None,
            night,
            unit: parsed.unit.or(unit),
            object_name: parsed.object_name,
            obs_date: parsed.obs_date,
            obs_time: parsed.obs_time,
            filter_name: parsed.filter_name,
            exposure_seconds: parsed.exposure_seconds,
            sequence_number: parsed.sequence_number,
            source_pattern: parsed.source_pattern,
            object_ra: None,
            object_dec: None,
            target: None,
            tile: None,
        }
    }

    /// Both header coordinates, when present.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.object_ra, self.object_dec) {
            (Some(ra), Some(dec)) => Some(Coordinates { ra, dec }),
            _ => None,
        }
    }

    pub fn is_linked(&self) -> bool {
        self.target.is_some() || self.tile.is_some()
    }
}

/// One observing session. Counts are refreshed from persisted frames.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Night {
    pub date: NaiveDate,
    pub science_count: usize,
    pub bias_count: usize,
    pub dark_count: usize,
    pub flat_count: usize,
    pub unknown_count: usize,
    pub total_frames: usize,
    #[serde(default)]
    pub unit_counts: BTreeMap<UnitId, usize>,
}

impl Night {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            ..Default::default()
        }
    }

    pub fn count_for(&self, frame_type: FrameType) -> usize {
        match frame_type {
            FrameType::Science => self.science_count,
            FrameType::Bias => self.bias_count,
            FrameType::Dark => self.dark_count,
            FrameType::Flat => self.flat_count,
            FrameType::Unknown => self.unknown_count,
        }
    }
}

/// Classification of a target, inferred from its name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetType {
    /// Extragalactic science field.
    Exsci,
    /// Standard star.
    Std,
    /// Target of opportunity.
    Too,
    Test,
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exsci => write!(f, "EXSCI"),
            Self::Std => write!(f, "STD"),
            Self::Too => write!(f, "TOO"),
            Self::Test => write!(f, "TEST"),
        }
    }
}

/// Named object of interest, created lazily by the resolver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub ra: f64,
    pub dec: f64,
    pub target_type: TargetType,
    #[serde(default)]
    pub description: String,
}

impl Target {
    pub fn with_placeholder(name: &str, target_type: TargetType, description: String) -> Self {
        Self {
            name: name.to_string(),
            ra: PLACEHOLDER_RA,
            dec: PLACEHOLDER_DEC,
            target_type,
            description,
        }
    }

    pub fn has_placeholder_coordinates(&self) -> bool {
        self.ra == PLACEHOLDER_RA && self.dec == PLACEHOLDER_DEC
    }
}

/// Pre-loaded survey tile, referenced from object names of the form `T<digits>`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub id: u32,
    pub ra: f64,
    pub dec: f64,
}

impl Tile {
    pub fn name(&self) -> String {
        format!("T{:05}", self.id)
    }
}
