//! Disk-versus-ledger reconciliation.
//!
//! Pure set arithmetic over scanner output and the registered filename index.
//! Nothing here writes to a store.

mod report;

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::classify::{classify_with_spans, exclusion_reason, ExclusionStats};
use crate::consts::UNDATED_BUCKET_LABEL;
use crate::error::{LedgerError, Result};
use crate::scan::FileDescriptor;

/// Which effective dates take part in a reconciliation.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum DateFilter {
    #[default]
    All,
    Dates(BTreeSet<NaiveDate>),
    Range {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

impl DateFilter {
    /// Build a filter from command-line style inputs. Specific dates and a
    /// range are mutually exclusive.
    pub fn from_parts(
        dates: Vec<NaiveDate>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self> {
        match (dates.is_empty(), start.is_some() || end.is_some()) {
            (false, true) => Err(LedgerError::Config(
                "specific dates cannot be combined with a date range".to_string(),
            )),
            (false, false) => Ok(Self::Dates(dates.into_iter().collect())),
            (true, true) => {
                if let (Some(s), Some(e)) = (start, end) {
                    if s > e {
                        return Err(LedgerError::Config(format!(
                            "start date {s} is after end date {e}"
                        )));
                    }
                }
                Ok(Self::Range { start, end })
            }
            (true, false) => Ok(Self::All),
        }
    }

    /// Files without any date only pass when no filter is active.
    pub fn accepts(&self, date: Option<NaiveDate>) -> bool {
        match (self, date) {
            (Self::All, _) => true,
            (_, None) => false,
            (Self::Dates(dates), Some(d)) => dates.contains(&d),
            (Self::Range { start, end }, Some(d)) => {
                start.map_or(true, |s| d >= s) && end.map_or(true, |e| d <= e)
            }
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Self::All)
    }
}

impl fmt::Display for DateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "All dates"),
            Self::Dates(dates) => {
                let list: Vec<String> = dates.iter().map(|d| d.to_string()).collect();
                write!(f, "Specific dates: {}", list.join(", "))
            }
            Self::Range { start, end } => write!(
                f,
                "Date range: {} to {}",
                start.map_or_else(|| "beginning".to_string(), |d| d.to_string()),
                end.map_or_else(|| "end".to_string(), |d| d.to_string()),
            ),
        }
    }
}

/// Grouping key for missing files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DateBucket {
    Dated(NaiveDate),
    /// Neither the filename nor the folder carries a date.
    Undated,
}

impl fmt::Display for DateBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dated(d) => write!(f, "{d}"),
            Self::Undated => f.write_str(UNDATED_BUCKET_LABEL),
        }
    }
}

/// A science candidate that is on disk but not registered.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MissingFile {
    pub filename: String,
    pub path: PathBuf,
    pub unit: String,
    pub folder_name: String,
    /// Filename date and folder date disagree.
    pub date_mismatch: bool,
}

/// A file whose filename date differs from its folder's date.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DateMismatch {
    pub filename: String,
    pub filename_date: NaiveDate,
    pub folder_date: NaiveDate,
    pub folder_name: String,
    pub path: PathBuf,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReconciliationSummary {
    /// Every scanned file.
    pub total: usize,
    /// Files passing the date filter.
    pub filtered: usize,
    /// Distinct filtered filenames rejected by the predicate.
    pub excluded: usize,
    /// Distinct filtered filenames accepted by the predicate.
    pub science: usize,
    /// Size of the registered index.
    pub registered: usize,
    pub missing: usize,
    pub date_mismatches: usize,
}

/// Counts for one `<unit>/<folder>` directory.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FolderSummary {
    pub unit: String,
    pub folder_name: String,
    pub folder_date: Option<NaiveDate>,
    pub total: usize,
    pub science: usize,
    pub excluded: usize,
    pub registered: usize,
    pub missing: usize,
}

impl FolderSummary {
    pub fn key(&self) -> String {
        format!("{}/{}", self.unit, self.folder_name)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ReconciliationReport {
    pub filter: DateFilter,
    pub summary: ReconciliationSummary,
    /// Missing files by effective date, each bucket sorted by filename.
    pub buckets: BTreeMap<DateBucket, Vec<MissingFile>>,
    pub mismatches: Vec<DateMismatch>,
    pub folders: Vec<FolderSummary>,
    pub exclusions: ExclusionStats,
}

impl ReconciliationReport {
    /// Missing files of one bucket grouped by structural fingerprint.
    pub fn pattern_groups(&self, bucket: &DateBucket) -> BTreeMap<String, Vec<&MissingFile>> {
        let mut groups: BTreeMap<String, Vec<&MissingFile>> = BTreeMap::new();
        if let Some(files) = self.buckets.get(bucket) {
            for file in files {
                groups.entry(fingerprint(&file.filename)).or_default().push(file);
            }
        }
        groups
    }

    /// Dated buckets ordered by missing count, largest first.
    pub fn top_dates(&self, n: usize) -> Vec<(NaiveDate, usize)> {
        let mut dated: Vec<(NaiveDate, usize)> = self
            .buckets
            .iter()
            .filter_map(|(bucket, files)| match bucket {
                DateBucket::Dated(d) => Some((*d, files.len())),
                DateBucket::Undated => None,
            })
            .collect();
        dated.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        dated.truncate(n);
        dated
    }

    pub fn dated_bucket_count(&self) -> usize {
        self.buckets
            .keys()
            .filter(|b| matches!(b, DateBucket::Dated(_)))
            .count()
    }

    pub fn missing_filenames(&self) -> BTreeSet<&str> {
        self.buckets
            .values()
            .flatten()
            .map(|f| f.filename.as_str())
            .collect()
    }
}

/// Compare scanned files against the registered index.
pub fn reconcile(
    files: &[FileDescriptor],
    registered: &HashSet<String>,
    filter: &DateFilter,
) -> ReconciliationReport {
    let mut report = ReconciliationReport {
        filter: filter.clone(),
        ..Default::default()
    };
    report.summary.total = files.len();
    report.summary.registered = registered.len();

    let mut seen_science: HashSet<&str> = HashSet::new();
    let mut seen_excluded: HashSet<&str> = HashSet::new();
    let mut folders: BTreeMap<(String, String), FolderSummary> = BTreeMap::new();

    for file in files.iter().filter(|f| filter.accepts(f.effective_date())) {
        report.summary.filtered += 1;

        if let (Some(filename_date), Some(folder_date)) = (file.filename_date, file.folder_date) {
            if filename_date != folder_date {
                report.mismatches.push(DateMismatch {
                    filename: file.filename.clone(),
                    filename_date,
                    folder_date,
                    folder_name: file.folder_name.clone(),
                    path: file.path.clone(),
                });
            }
        }

        let folder = folders
            .entry((file.unit.clone(), file.folder_name.clone()))
            .or_insert_with(|| FolderSummary {
                unit: file.unit.clone(),
                folder_name: file.folder_name.clone(),
                folder_date: file.folder_date,
                ..Default::default()
            });
        folder.total += 1;

        if let Some(reason) = exclusion_reason(&file.filename) {
            folder.excluded += 1;
            if seen_excluded.insert(file.filename.as_str()) {
                report.exclusions.record(reason);
            }
            continue;
        }

        folder.science += 1;
        if registered.contains(&file.filename) {
            folder.registered += 1;
            seen_science.insert(file.filename.as_str());
            continue;
        }
        folder.missing += 1;

        if !seen_science.insert(file.filename.as_str()) {
            continue;
        }
        let bucket = file
            .effective_date()
            .map_or(DateBucket::Undated, DateBucket::Dated);
        report.buckets.entry(bucket).or_default().push(MissingFile {
            filename: file.filename.clone(),
            path: file.path.clone(),
            unit: file.unit.clone(),
            folder_name: file.folder_name.clone(),
            date_mismatch: file.has_date_mismatch(),
        });
    }

    for files in report.buckets.values_mut() {
        files.sort_by(|a, b| a.filename.cmp(&b.filename));
    }
    report.mismatches.sort_by(|a, b| a.filename.cmp(&b.filename));

    report.summary.science = seen_science.len();
    report.summary.excluded = seen_excluded.len();
    report.summary.missing = report.buckets.values().map(Vec::len).sum();
    report.summary.date_mismatches = report.mismatches.len();
    report.folders = folders.into_values().collect();

    info!(
        filter = %report.filter,
        total = report.summary.total,
        science = report.summary.science,
        missing = report.summary.missing,
        mismatches = report.summary.date_mismatches,
        "reconciliation complete"
    );
    report
}

/// Structural fingerprint: object token replaced by `[OBJECT]`, trailing
/// sequence by `[NUM]`.
pub fn fingerprint(filename: &str) -> String {
    match classify_with_spans(filename) {
        Ok(classified) => {
            let mut spans = vec![(classified.sequence_span, "[NUM]")];
            if let Some(object) = classified.object_span {
                spans.push((object, "[OBJECT]"));
            }
            // Replace from the back so earlier offsets stay valid.
            spans.sort_by(|a, b| b.0.start.cmp(&a.0.start));
            let mut out = filename.to_string();
            for (range, placeholder) in spans {
                out.replace_range(range, placeholder);
            }
            out
        }
        Err(_) => positional_fingerprint(filename),
    }
}

/// Fallback for names no grammar understands: the fourth underscore token is
/// taken as the object and a purely numeric last token as the sequence.
fn positional_fingerprint(filename: &str) -> String {
    let mut parts: Vec<String> = filename.split('_').map(str::to_string).collect();
    if parts.len() < 6 {
        return filename.to_string();
    }
    parts[3] = "[OBJECT]".to_string();
    if let Some(last) = parts.last_mut() {
        if let Some(number) = last.strip_suffix(".fits") {
            if !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()) {
                *last = "[NUM].fits".to_string();
            }
        }
    }
    parts.join("_")
}
