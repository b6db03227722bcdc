//! Filesystem scanner over `<root>/<unit>/<date folder>/*.fits[.fz]`.

mod validate;

pub use validate::{classify_folder, validate_folders, FolderCheck, FolderStatus, FolderValidation};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::NaiveDate;
use rayon::prelude::*;
use regex::Regex;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::consts::UNIT_PREFIX;
use crate::error::{LedgerError, Result};
use crate::frame::UnitId;

static FILENAME_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"7DT\d+_(\d{8})_").expect("valid filename date regex"));

static FOLDER_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").expect("valid folder date regex"));

/// One exposure file found on disk.
#[derive(Clone, Debug, PartialEq)]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub filename: String,
    pub folder_name: String,
    /// Name of the unit directory the file was found under.
    pub unit: String,
    pub filename_date: Option<NaiveDate>,
    pub folder_date: Option<NaiveDate>,
}

impl FileDescriptor {
    /// Build a descriptor from a path laid out as `<unit>/<folder>/<file>`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let filename = path.file_name()?.to_str()?.to_string();
        let folder = path.parent()?;
        let folder_name = folder.file_name()?.to_str()?.to_string();
        let unit = folder
            .parent()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Some(Self {
            path: path.to_path_buf(),
            filename_date: filename_date(&filename),
            folder_date: folder_date(&folder_name),
            filename,
            folder_name,
            unit,
        })
    }

    /// Filename date when present, else the folder date.
    pub fn effective_date(&self) -> Option<NaiveDate> {
        self.filename_date.or(self.folder_date)
    }

    /// Both dates are known and they disagree.
    pub fn has_date_mismatch(&self) -> bool {
        matches!((self.filename_date, self.folder_date), (Some(a), Some(b)) if a != b)
    }

    pub fn unit_id(&self) -> Option<UnitId> {
        self.unit.parse().ok()
    }
}

/// Observation date embedded in a `7DTnn_YYYYMMDD_` filename.
pub fn filename_date(filename: &str) -> Option<NaiveDate> {
    let caps = FILENAME_DATE.captures(filename)?;
    NaiveDate::parse_from_str(caps.get(1)?.as_str(), "%Y%m%d").ok()
}

/// First `YYYY-MM-DD` token in a folder name.
pub fn folder_date(folder_name: &str) -> Option<NaiveDate> {
    let caps = FOLDER_DATE.captures(folder_name)?;
    NaiveDate::parse_from_str(caps.get(1)?.as_str(), "%Y-%m-%d").ok()
}

pub fn is_fits_filename(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    lower.ends_with(".fits") || lower.ends_with(".fits.fz")
}

#[derive(Clone, Debug, Default)]
pub struct ScanOptions {
    /// Restrict to these unit directory names. Empty means every unit.
    pub units: Vec<String>,
    /// Only descend into date folders named `<date>` or `<date>_*`.
    pub folder_date: Option<NaiveDate>,
}

impl ScanOptions {
    fn accepts_unit(&self, name: &str) -> bool {
        name.starts_with(UNIT_PREFIX) && (self.units.is_empty() || self.units.iter().any(|u| u == name))
    }

    fn accepts_folder(&self, name: &str) -> bool {
        match self.folder_date {
            None => true,
            Some(date) => {
                let prefix = date.format("%Y-%m-%d").to_string();
                name == prefix
                    || name
                        .strip_prefix(&prefix)
                        .is_some_and(|rest| rest.starts_with('_'))
            }
        }
    }
}

/// A unit directory that could not be read.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitScanError {
    pub unit: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default)]
pub struct ScanOutput {
    /// Sorted by path.
    pub files: Vec<FileDescriptor>,
    pub units_scanned: usize,
    pub unit_errors: Vec<UnitScanError>,
}

impl ScanOutput {
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

pub struct Scanner;

impl Scanner {
    /// Walk every unit under `root`. Units are scanned in parallel; a unit that
    /// cannot be read is recorded and skipped.
    pub fn scan(root: &Path, options: &ScanOptions) -> Result<ScanOutput> {
        let units = list_units(root, options)?;

        debug!(root = %root.display(), units = units.len(), "scanning units");

        let results: Vec<(String, std::result::Result<Vec<FileDescriptor>, String>)> = units
            .par_iter()
            .map(|(name, path)| (name.clone(), scan_unit(path, options)))
            .collect();

        let mut output = ScanOutput {
            units_scanned: results.len(),
            ..Default::default()
        };
        for (unit, result) in results {
            match result {
                Ok(files) => output.files.extend(files),
                Err(reason) => {
                    warn!(unit = %unit, "skipping unreadable unit: {}", reason);
                    output.unit_errors.push(UnitScanError { unit, reason });
                }
            }
        }
        output.files.sort_by(|a, b| a.path.cmp(&b.path));

        info!(
            files = output.files.len(),
            units = output.units_scanned,
            unit_errors = output.unit_errors.len(),
            "scan complete"
        );
        Ok(output)
    }
}

/// Unit directories under `root` accepted by `options`, sorted by name.
fn list_units(root: &Path, options: &ScanOptions) -> Result<Vec<(String, PathBuf)>> {
    if !root.exists() {
        return Err(LedgerError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(LedgerError::NotADirectory(root.to_path_buf()));
    }

    let mut units: Vec<(String, PathBuf)> = fs::read_dir(root)?
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Error reading data root entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().map(|t| !t.is_file()).unwrap_or(false))
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            options.accepts_unit(&name).then(|| (name, entry.path()))
        })
        .collect();
    units.sort();
    Ok(units)
}

fn scan_unit(
    unit_path: &Path,
    options: &ScanOptions,
) -> std::result::Result<Vec<FileDescriptor>, String> {
    let walker = WalkDir::new(unit_path)
        .max_depth(2)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| keep_entry(e, options));

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.depth() != 2 || !entry.file_type().is_file() {
                    continue;
                }
                let Some(name) = entry.file_name().to_str() else {
                    continue;
                };
                if !is_fits_filename(name) {
                    continue;
                }
                if let Some(descriptor) = FileDescriptor::from_path(entry.path()) {
                    files.push(descriptor);
                }
            }
            Err(e) if e.depth() == 0 => return Err(e.to_string()),
            Err(e) => {
                warn!("Error accessing entry: {}", e);
            }
        }
    }
    Ok(files)
}

fn keep_entry(entry: &DirEntry, options: &ScanOptions) -> bool {
    if entry.depth() != 1 {
        return true;
    }
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| options.accepts_folder(name))
}
