//! Date-folder naming checks.
//!
//! Files are only dated from their folder when the folder follows the
//! `YYYY-MM-DD[_suffix]` convention. This pass explains which folders do not.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use super::{folder_date, list_units, ScanOptions, UnitScanError};
use crate::consts::EARLIEST_OBSERVATION_YEAR;
use crate::error::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderStatus {
    Valid,
    /// No date could be read from the name.
    InvalidDate,
    /// A date was read, but not from the `YYYY-MM-DD[_suffix]` form.
    Suspicious,
    TooOld,
    FutureDate,
}

impl fmt::Display for FolderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Valid => "valid",
            Self::InvalidDate => "invalid date",
            Self::Suspicious => "suspicious",
            Self::TooOld => "too old",
            Self::FutureDate => "future date",
        };
        write!(f, "{label}")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FolderCheck {
    pub unit: String,
    pub folder_name: String,
    pub path: PathBuf,
    pub status: FolderStatus,
    pub date: Option<NaiveDate>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct FolderValidation {
    /// Every date folder, sorted by unit then name.
    pub folders: Vec<FolderCheck>,
    pub counts: BTreeMap<FolderStatus, usize>,
    #[serde(skip)]
    pub unit_errors: Vec<UnitScanError>,
}

impl FolderValidation {
    pub fn total(&self) -> usize {
        self.folders.len()
    }

    pub fn valid(&self) -> usize {
        self.count(FolderStatus::Valid)
    }

    pub fn count(&self, status: FolderStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn issues(&self) -> impl Iterator<Item = &FolderCheck> {
        self.folders
            .iter()
            .filter(|f| f.status != FolderStatus::Valid)
    }

    /// Percentage of valid folders; 100 when there are none.
    pub fn compliance_rate(&self) -> f64 {
        if self.folders.is_empty() {
            100.0
        } else {
            self.valid() as f64 / self.total() as f64 * 100.0
        }
    }
}

/// `YYYY-MM-DD` alone or followed by `_suffix`.
fn canonical_date(name: &str) -> Option<NaiveDate> {
    let head = name.get(..10)?;
    let rest = &name[10..];
    if !rest.is_empty() && !rest.starts_with('_') {
        return None;
    }
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Whole-name `YYYYMMDD` or `YYMMDD`.
fn compact_date(name: &str) -> Option<NaiveDate> {
    if !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let format = match name.len() {
        8 => "%Y%m%d",
        6 => "%y%m%d",
        _ => return None,
    };
    NaiveDate::parse_from_str(name, format).ok()
}

/// Status of one date-folder name relative to `today`.
pub fn classify_folder(name: &str, today: NaiveDate) -> (FolderStatus, Option<NaiveDate>) {
    let (date, canonical) = match canonical_date(name) {
        Some(date) => (Some(date), true),
        None => (folder_date(name).or_else(|| compact_date(name)), false),
    };
    let Some(date) = date else {
        return (FolderStatus::InvalidDate, None);
    };

    let status = if date > today {
        FolderStatus::FutureDate
    } else if date.year() < EARLIEST_OBSERVATION_YEAR {
        FolderStatus::TooOld
    } else if !canonical {
        FolderStatus::Suspicious
    } else {
        FolderStatus::Valid
    };
    (status, Some(date))
}

fn check_unit(
    unit: &str,
    unit_path: &Path,
    today: NaiveDate,
) -> std::result::Result<Vec<FolderCheck>, String> {
    let mut checks = Vec::new();
    for entry in WalkDir::new(unit_path)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| e.to_string())?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let folder_name = entry.file_name().to_string_lossy().into_owned();
        let (status, date) = classify_folder(&folder_name, today);
        checks.push(FolderCheck {
            unit: unit.to_string(),
            path: entry.path().to_path_buf(),
            folder_name,
            status,
            date,
        });
    }
    Ok(checks)
}

/// Check every date folder of the units selected by `options`. Only the unit
/// selection of `options` applies.
pub fn validate_folders(root: &Path, options: &ScanOptions, today: NaiveDate) -> Result<FolderValidation> {
    let units = list_units(root, options)?;
    let results: Vec<(String, std::result::Result<Vec<FolderCheck>, String>)> = units
        .par_iter()
        .map(|(name, path)| (name.clone(), check_unit(name, path, today)))
        .collect();

    let mut validation = FolderValidation::default();
    for (unit, result) in results {
        match result {
            Ok(checks) => validation.folders.extend(checks),
            Err(reason) => {
                warn!(unit = %unit, "skipping unreadable unit: {}", reason);
                validation.unit_errors.push(UnitScanError { unit, reason });
            }
        }
    }
    for check in &validation.folders {
        *validation.counts.entry(check.status).or_insert(0) += 1;
    }

    info!(
        folders = validation.total(),
        valid = validation.valid(),
        "folder validation complete"
    );
    Ok(validation)
}
