mod common;

use std::path::PathBuf;

use approx::assert_relative_eq;

use common::{current_name, date, science_record, time};
use skyledger_core::config::ResolverConfig;
use skyledger_core::frame::{TargetType, Tile};
use skyledger_core::resolve::{
    discover_targets, infer_target_type, is_tile_reference, link_frames, tile_reference,
};
use skyledger_core::store::{FrameStore, MemoryStore, TargetStore};

// ---------------------------------------------------------------------------
// Name rules
// ---------------------------------------------------------------------------

#[test]
fn test_tile_reference_is_strict() {
    assert_eq!(tile_reference("T25344"), Some(25344));
    assert_eq!(tile_reference("T00042"), Some(42));
    assert_eq!(tile_reference("t25344"), None);
    assert_eq!(tile_reference("T25344a"), None);
    assert_eq!(tile_reference("TYC123"), None);
    assert_eq!(tile_reference("T"), None);
}

#[test]
fn test_oversized_tile_id_is_still_a_tile_reference() {
    assert!(is_tile_reference("T99999999999"));
    assert_eq!(tile_reference("T99999999999"), None);
    assert!(!is_tile_reference("TYC123"));
}

#[test]
fn test_target_type_inference() {
    assert_eq!(infer_target_type("M51"), TargetType::Exsci);
    assert_eq!(infer_target_type("NGC1566"), TargetType::Exsci);
    assert_eq!(infer_target_type("GRB250301A"), TargetType::Too);
    assert_eq!(infer_target_type("LTT1020"), TargetType::Std);
    assert_eq!(infer_target_type("Feige34"), TargetType::Std);
    assert_eq!(infer_target_type("TestField"), TargetType::Test);
    assert_eq!(infer_target_type("skyflat"), TargetType::Test);
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

fn discovery_paths() -> Vec<PathBuf> {
    [
        current_name(1, "20250301", "030000", "M51", 1),
        current_name(1, "20250301", "030100", "M51", 2),
        current_name(1, "20250301", "030200", "NGC1566", 3),
        current_name(1, "20250301", "030300", "T25344", 4),
        current_name(1, "20250301", "030400", "bias", 5),
        current_name(1, "20250301", "030500", "FocusRun", 6),
        "random_file.fits".to_string(),
    ]
    .iter()
    .map(|n| PathBuf::from("/data/7DT01/2025-03-01").join(n))
    .collect()
}

#[test]
fn test_discovery_creates_one_target_per_distinct_name() {
    let store = MemoryStore::new();
    let report = discover_targets(&discovery_paths(), &store, &ResolverConfig::default()).unwrap();

    assert_eq!(report.sampled, 7);
    assert_eq!(report.created, 2);
    assert_eq!(report.existing, 0);
    assert_eq!(report.tiles, 1);
    assert_eq!(report.calibration_skipped, 1);
    assert_eq!(report.test_skipped, 1);
    assert_eq!(report.unparseable, 1);

    let m51 = store.find_target("M51").unwrap().unwrap();
    assert!(m51.has_placeholder_coordinates());
    assert_eq!(m51.target_type, TargetType::Exsci);
    assert!(m51.description.contains("7DT01_20250301_030000_M51"));
    assert!(store.find_target("T25344").unwrap().is_none());

    let again = discover_targets(&discovery_paths(), &store, &ResolverConfig::default()).unwrap();
    assert_eq!(again.created, 0);
    assert_eq!(again.existing, 2);
    assert_eq!(store.target_count(), 2);
}

#[test]
fn test_discovery_samples_with_stride() {
    let paths: Vec<PathBuf> = (0..10)
        .map(|i| {
            let name = current_name(1, "20250301", "030000", &format!("Field{i}"), i);
            PathBuf::from(name)
        })
        .collect();
    let store = MemoryStore::new();
    let config = ResolverConfig {
        sample_size: 3,
        ..Default::default()
    };
    let report = discover_targets(&paths, &store, &config).unwrap();

    // Stride of 10 / 3 = 3 picks files 0, 3 and 6.
    assert_eq!(report.sampled, 3);
    assert!(store.find_target("Field0").unwrap().is_some());
    assert!(store.find_target("Field3").unwrap().is_some());
    assert!(store.find_target("Field6").unwrap().is_some());
    assert!(store.find_target("Field1").unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Linking
// ---------------------------------------------------------------------------

#[test]
fn test_earliest_coordinates_win_the_backfill() {
    let night = date(2025, 3, 1);
    let store = MemoryStore::new();
    for record in [
        science_record("m51_a.fits", night, "M51", time(1, 0, 0), 1, None),
        science_record("m51_b.fits", night, "M51", time(2, 0, 0), 2, Some((202.47, 47.20))),
        science_record("m51_c.fits", night, "M51", time(3, 0, 0), 3, Some((200.0, 40.0))),
    ] {
        store.insert_if_absent(record).unwrap();
    }

    let report = link_frames(&store, night, &ResolverConfig::default()).unwrap();
    assert_eq!(report.examined, 3);
    assert_eq!(report.linked_targets, 3);
    assert_eq!(report.targets_created, 1);
    assert_eq!(report.coordinates_updated, 1);

    let target = store.find_target("M51").unwrap().unwrap();
    assert_relative_eq!(target.ra, 202.47);
    assert_relative_eq!(target.dec, 47.20);
    for name in ["m51_a.fits", "m51_b.fits", "m51_c.fits"] {
        assert_eq!(store.frame(name).unwrap().target.as_deref(), Some("M51"));
    }
}

#[test]
fn test_tile_reference_links_only_to_tile() {
    let night = date(2025, 3, 1);
    let store = MemoryStore::new();
    store
        .upsert_tile(Tile {
            id: 25344,
            ra: 150.0,
            dec: -30.0,
        })
        .unwrap();
    store
        .insert_if_absent(science_record("tile.fits", night, "T25344", time(1, 0, 0), 1, Some((1.0, 2.0))))
        .unwrap();
    store
        .insert_if_absent(science_record("orphan.fits", night, "T99999", time(1, 5, 0), 2, None))
        .unwrap();

    let report = link_frames(&store, night, &ResolverConfig::default()).unwrap();
    assert_eq!(report.linked_tiles, 1);
    assert_eq!(report.tiles_missing, 1);
    assert_eq!(report.linked_targets, 0);
    assert_eq!(store.target_count(), 0);

    let frame = store.frame("tile.fits").unwrap();
    assert_eq!(frame.tile, Some(25344));
    assert_eq!(frame.target, None);
    assert!(!store.frame("orphan.fits").unwrap().is_linked());
}

#[test]
fn test_linking_is_idempotent() {
    let night = date(2025, 3, 1);
    let store = MemoryStore::new();
    store
        .insert_if_absent(science_record("a.fits", night, "NGC253", time(1, 0, 0), 1, Some((11.9, -25.3))))
        .unwrap();
    link_frames(&store, night, &ResolverConfig::default()).unwrap();
    let before = serde_json::to_string(&store.snapshot()).unwrap();

    let second = link_frames(&store, night, &ResolverConfig::default()).unwrap();
    assert_eq!(second.examined, 0);
    assert_eq!(serde_json::to_string(&store.snapshot()).unwrap(), before);
}

#[test]
fn test_existing_coordinates_are_never_overwritten() {
    let night = date(2025, 3, 1);
    let store = MemoryStore::new();
    store
        .get_or_create_target("M101", TargetType::Exsci, "")
        .unwrap();
    assert!(store
        .backfill_if_placeholder(
            "M101",
            skyledger_core::frame::Coordinates { ra: 210.8, dec: 54.3 }
        )
        .unwrap());
    store
        .insert_if_absent(science_record("a.fits", night, "M101", time(1, 0, 0), 1, Some((1.0, 1.0))))
        .unwrap();

    let report = link_frames(&store, night, &ResolverConfig::default()).unwrap();
    assert_eq!(report.linked_targets, 1);
    assert_eq!(report.coordinates_updated, 0);
    let target = store.find_target("M101").unwrap().unwrap();
    assert_relative_eq!(target.ra, 210.8);
}

#[test]
fn test_without_target_creation_unknown_names_stay_unlinked() {
    let night = date(2025, 3, 1);
    let store = MemoryStore::new();
    store
        .get_or_create_target("M51", TargetType::Exsci, "")
        .unwrap();
    store
        .insert_if_absent(science_record("a.fits", night, "M51", time(1, 0, 0), 1, None))
        .unwrap();
    store
        .insert_if_absent(science_record("b.fits", night, "NGC999", time(1, 1, 0), 2, None))
        .unwrap();
    store
        .insert_if_absent(science_record("c.fits", night, "", time(1, 2, 0), 3, None))
        .unwrap();

    let config = ResolverConfig {
        create_missing_targets: false,
        ..Default::default()
    };
    let report = link_frames(&store, night, &config).unwrap();
    assert_eq!(report.examined, 3);
    assert_eq!(report.linked_targets, 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(store.target_count(), 1);
    assert!(!store.frame("b.fits").unwrap().is_linked());
}

#[test]
fn test_oversized_tile_id_never_becomes_target() {
    let night = date(2025, 3, 1);
    let name = current_name(1, "20250301", "030000", "T99999999999", 1);
    let paths = vec![PathBuf::from("/data/7DT01/2025-03-01").join(&name)];
    let store = MemoryStore::new();

    let discovery = discover_targets(&paths, &store, &ResolverConfig::default()).unwrap();
    assert_eq!(discovery.tiles, 1);
    assert_eq!(discovery.created, 0);

    store
        .insert_if_absent(science_record("a.fits", night, "T99999999999", time(1, 0, 0), 1, None))
        .unwrap();
    let report = link_frames(&store, night, &ResolverConfig::default()).unwrap();
    assert_eq!(report.tiles_missing, 1);
    assert_eq!(report.targets_created, 0);
    assert_eq!(store.target_count(), 0);
    assert!(store.find_target("T99999999999").unwrap().is_none());
    assert!(!store.frame("a.fits").unwrap().is_linked());
}

#[test]
fn test_linking_never_creates_calibration_or_focus_targets() {
    let night = date(2025, 3, 1);
    let paths: Vec<PathBuf> = [current_name(1, "20250301", "030000", "FOCUS", 1)]
        .iter()
        .map(|n| PathBuf::from("/data/7DT01/2025-03-01").join(n))
        .collect();
    let store = MemoryStore::new();
    let discovery = discover_targets(&paths, &store, &ResolverConfig::default()).unwrap();
    assert_eq!(discovery.test_skipped, 1);
    assert_eq!(discovery.created, 0);

    for (file, object, seq) in [("a.fits", "FOCUS", 1), ("b.fits", "BIAS", 2), ("c.fits", "M51", 3)] {
        store
            .insert_if_absent(science_record(file, night, object, time(1, seq, 0), seq, None))
            .unwrap();
    }
    let report = link_frames(&store, night, &ResolverConfig::default()).unwrap();
    assert_eq!(report.examined, 3);
    assert_eq!(report.targets_created, 1);
    assert_eq!(report.linked_targets, 1);
    assert_eq!(report.skipped, 2);
    assert!(store.find_target("FOCUS").unwrap().is_none());
    assert!(store.find_target("BIAS").unwrap().is_none());
    assert_eq!(store.frame("c.fits").unwrap().target.as_deref(), Some("M51"));
}

#[test]
fn test_focus_frames_link_to_an_existing_target() {
    let night = date(2025, 3, 1);
    let store = MemoryStore::new();
    store
        .get_or_create_target("FOCUS", TargetType::Test, "")
        .unwrap();
    store
        .insert_if_absent(science_record("a.fits", night, "FOCUS", time(1, 0, 0), 1, None))
        .unwrap();

    let report = link_frames(&store, night, &ResolverConfig::default()).unwrap();
    assert_eq!(report.linked_targets, 1);
    assert_eq!(report.targets_created, 0);
    assert_eq!(store.frame("a.fits").unwrap().target.as_deref(), Some("FOCUS"));
}
