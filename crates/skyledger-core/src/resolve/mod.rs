//! Target and tile resolution.
//!
//! A sampling pre-pass creates targets before import; a post-pass links each
//! unlinked science frame to a tile or target and backfills placeholder
//! target coordinates.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::classify::classify;
use crate::config::ResolverConfig;
use crate::error::Result;
use crate::frame::{FrameType, TargetType};
use crate::store::{FrameStore, TargetStore};

static TILE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^T(\d+)$").expect("valid tile reference regex"));

/// Object names that denote calibration exposures rather than targets.
const CALIBRATION_NAMES: &[&str] = &["BIAS", "DARK", "FLAT", "CALIB", "CALIBRATION"];

/// Substrings marking engineering exposures.
const TEST_MARKERS: &[&str] = &["FOCUS", "TEST", "AUTOFOCUS", "FOCUSTEST"];

/// Whether an object name has the `T<digits>` tile form, whatever the id's size.
pub fn is_tile_reference(object_name: &str) -> bool {
    TILE_REF.is_match(object_name)
}

/// Tile id referenced by an object name of the form `T<digits>`. `None` when
/// the name is not a tile reference or the id does not fit a tile id.
pub fn tile_reference(object_name: &str) -> Option<u32> {
    TILE_REF.captures(object_name)?.get(1)?.as_str().parse().ok()
}

/// Target type from well-known name prefixes and markers. Rules are checked in order.
pub fn infer_target_type(name: &str) -> TargetType {
    let upper = name.to_uppercase();
    let has_any = |markers: &[&str]| markers.iter().any(|m| upper.contains(m));

    if has_any(&["BIAS", "DARK", "FLAT", "CALIB"]) {
        TargetType::Test
    } else if has_any(&["GRB", "SN", "AT", "TOO"]) {
        TargetType::Too
    } else if has_any(&["LTT", "SA", "PG", "FEIGE", "WD"]) {
        TargetType::Std
    } else if has_any(&["TEST", "FOCUS"]) {
        TargetType::Test
    } else {
        TargetType::Exsci
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DiscoveryReport {
    pub sampled: usize,
    pub created: usize,
    pub existing: usize,
    /// Sampled files referencing a tile.
    pub tiles: usize,
    pub calibration_skipped: usize,
    pub test_skipped: usize,
    pub unparseable: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LinkReport {
    pub examined: usize,
    pub linked_targets: usize,
    pub linked_tiles: usize,
    pub targets_created: usize,
    pub coordinates_updated: usize,
    /// Tile references whose tile is not in the catalog.
    pub tiles_missing: usize,
    /// Frames without a usable object name or target.
    pub skipped: usize,
}

enum SampleKind {
    Target,
    Tile,
    Calibration,
    Test,
}

fn sample_kind(object_name: &str, frame_type: FrameType) -> SampleKind {
    let upper = object_name.to_uppercase();
    if frame_type != FrameType::Science
        || object_name.is_empty()
        || CALIBRATION_NAMES.contains(&upper.as_str())
    {
        SampleKind::Calibration
    } else if TEST_MARKERS.iter().any(|m| upper.contains(m)) {
        SampleKind::Test
    } else if is_tile_reference(object_name) {
        SampleKind::Tile
    } else {
        SampleKind::Target
    }
}

/// Create one placeholder target per distinct object name found in a stride
/// sample of `files`.
pub fn discover_targets<S: TargetStore + ?Sized>(
    files: &[PathBuf],
    store: &S,
    config: &ResolverConfig,
) -> Result<DiscoveryReport> {
    let mut report = DiscoveryReport::default();
    if files.is_empty() || config.sample_size == 0 {
        return Ok(report);
    }

    let stride = (files.len() / config.sample_size).max(1);
    // First file seen for each name, used in the description.
    let mut names: BTreeMap<String, String> = BTreeMap::new();

    for path in files.iter().step_by(stride).take(config.sample_size) {
        report.sampled += 1;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Ok(parsed) = classify(&filename) else {
            report.unparseable += 1;
            continue;
        };

        match sample_kind(&parsed.object_name, parsed.frame_type) {
            SampleKind::Calibration => report.calibration_skipped += 1,
            SampleKind::Test => report.test_skipped += 1,
            SampleKind::Tile => report.tiles += 1,
            SampleKind::Target => {
                names.entry(parsed.object_name).or_insert(filename);
            }
        }
    }

    for (name, example) in &names {
        let description = format!("Auto-created from observation {example}");
        let (_, created) = store.get_or_create_target(name, infer_target_type(name), &description)?;
        if created {
            debug!(name = %name, "created target");
            report.created += 1;
        } else {
            report.existing += 1;
        }
    }

    info!(
        sampled = report.sampled,
        created = report.created,
        existing = report.existing,
        tiles = report.tiles,
        "target discovery finished"
    );
    Ok(report)
}

/// Link every unlinked science frame of `night` to its tile or target.
///
/// Frames are visited in observation order, so the earliest frame carrying
/// coordinates sets a placeholder target's position. Running it twice is a no-op.
pub fn link_frames<S: FrameStore + TargetStore + ?Sized>(
    store: &S,
    night: NaiveDate,
    config: &ResolverConfig,
) -> Result<LinkReport> {
    let mut report = LinkReport::default();

    for frame in store.unlinked_science_frames(night)? {
        report.examined += 1;
        let name = frame.object_name.as_str();
        if name.is_empty() || name.eq_ignore_ascii_case("UNKNOWN") {
            report.skipped += 1;
            continue;
        }

        let kind = sample_kind(name, frame.frame_type);
        if let SampleKind::Tile = kind {
            match tile_reference(name) {
                Some(tile_id) if store.find_tile(tile_id)?.is_some() => {
                    if store.link_tile_if_unlinked(&frame.original_filename, tile_id)? {
                        report.linked_tiles += 1;
                    }
                }
                _ => {
                    debug!(file = %frame.original_filename, tile = name, "tile not in catalog");
                    report.tiles_missing += 1;
                }
            }
            continue;
        }

        // Calibration and engineering names link only to targets that already exist.
        let target = if config.create_missing_targets && matches!(kind, SampleKind::Target) {
            let description = format!("Auto-created from observation {}", frame.original_filename);
            let (target, created) =
                store.get_or_create_target(name, infer_target_type(name), &description)?;
            if created {
                report.targets_created += 1;
            }
            Some(target)
        } else {
            store.find_target(name)?
        };
        let Some(target) = target else {
            report.skipped += 1;
            continue;
        };

        if store.link_target_if_unlinked(&frame.original_filename, &target.name)? {
            report.linked_targets += 1;
        }

        if config.backfill_coordinates {
            if let Some(coordinates) = frame.coordinates() {
                if store.backfill_if_placeholder(&target.name, coordinates)? {
                    debug!(name = %target.name, ra = coordinates.ra, dec = coordinates.dec, "coordinates backfilled");
                    report.coordinates_updated += 1;
                }
            }
        }
    }

    info!(
        %night,
        examined = report.examined,
        targets = report.linked_targets,
        tiles = report.linked_tiles,
        backfilled = report.coordinates_updated,
        "frame linking finished"
    );
    Ok(report)
}
