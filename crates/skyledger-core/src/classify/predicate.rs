use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a filename is not a science candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// `BAD_` prefix set by the operator.
    BadFlag,
    /// One of the fixed non-observation filenames.
    SpecialName,
    Focus,
    Test,
    Master,
    Calibration,
    Snapshot,
    /// Derived products such as subtracted images.
    Processed,
}

impl ExclusionReason {
    pub const ALL: [ExclusionReason; 8] = [
        Self::BadFlag,
        Self::SpecialName,
        Self::Focus,
        Self::Test,
        Self::Master,
        Self::Calibration,
        Self::Snapshot,
        Self::Processed,
    ];
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BadFlag => "bad flag",
            Self::SpecialName => "special name",
            Self::Focus => "focus",
            Self::Test => "test",
            Self::Master => "master",
            Self::Calibration => "calibration",
            Self::Snapshot => "snapshot",
            Self::Processed => "processed",
        };
        f.write_str(label)
    }
}

const BAD_PREFIX: &str = "BAD_";

/// Exact filenames (lowercased) that never hold an observation.
const SPECIAL_NAMES: &[&str] = &["bias.fits", "mask60.fits", "snapshot"];

/// Lowercase substring markers, checked in order. The first enabled hit wins.
const MARKERS: &[(&str, ExclusionReason)] = &[
    ("focus", ExclusionReason::Focus),
    ("test", ExclusionReason::Test),
    ("master", ExclusionReason::Master),
    ("calib", ExclusionReason::Calibration),
    ("lamp", ExclusionReason::Calibration),
    ("twilight", ExclusionReason::Calibration),
    ("snapshot", ExclusionReason::Snapshot),
    ("corsub", ExclusionReason::Processed),
    ("sub_", ExclusionReason::Processed),
    ("autofocus", ExclusionReason::Focus),
    ("af_", ExclusionReason::Focus),
    ("defocus_test", ExclusionReason::Focus),
];

/// The single exclusion rule table.
///
/// `enabled` decides which categories are active; a disabled category is
/// skipped and later rules may still exclude the file.
pub fn exclusion_reason_with(
    filename: &str,
    enabled: impl Fn(ExclusionReason) -> bool,
) -> Option<ExclusionReason> {
    if enabled(ExclusionReason::BadFlag) && filename.starts_with(BAD_PREFIX) {
        return Some(ExclusionReason::BadFlag);
    }

    let lower = filename.to_lowercase();
    if enabled(ExclusionReason::SpecialName) && SPECIAL_NAMES.contains(&lower.as_str()) {
        return Some(ExclusionReason::SpecialName);
    }

    MARKERS
        .iter()
        .filter(|(_, reason)| enabled(*reason))
        .find(|(marker, _)| lower.contains(marker))
        .map(|(_, reason)| *reason)
}

/// Exclusion reason with every category active.
pub fn exclusion_reason(filename: &str) -> Option<ExclusionReason> {
    exclusion_reason_with(filename, |_| true)
}

pub fn is_science_candidate(filename: &str) -> bool {
    exclusion_reason(filename).is_none()
}

/// Exclusion counts per category.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExclusionStats {
    pub by_reason: BTreeMap<ExclusionReason, usize>,
}

impl ExclusionStats {
    pub fn record(&mut self, reason: ExclusionReason) {
        *self.by_reason.entry(reason).or_insert(0) += 1;
    }

    pub fn count(&self, reason: ExclusionReason) -> usize {
        self.by_reason.get(&reason).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.by_reason.values().sum()
    }
}
