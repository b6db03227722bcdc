mod common;

use std::io::Cursor;
use std::sync::Arc;
use std::thread;

use approx::assert_relative_eq;

use common::{date, science_record, time};
use skyledger_core::error::LedgerError;
use skyledger_core::frame::{FrameType, Night, TargetType, Tile, UnitId};
use skyledger_core::night::{flush_night, refresh_night_statistics};
use skyledger_core::store::{
    parse_tile_catalog, load_tile_catalog, FrameStore, InsertOutcome, MemoryStore, NightRegistry,
    StoreError, TargetStore,
};

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

#[test]
fn test_insert_if_absent_keeps_first_record() {
    let store = MemoryStore::new();
    let night = date(2025, 3, 1);
    let first = science_record("a.fits", night, "M51", time(1, 0, 0), 1, None);
    let mut second = first.clone();
    second.object_name = "M101".to_string();

    assert_eq!(store.insert_if_absent(first).unwrap(), InsertOutcome::Inserted);
    assert_eq!(store.insert_if_absent(second).unwrap(), InsertOutcome::AlreadyExists);
    assert_eq!(store.frame("a.fits").unwrap().object_name, "M51");
    assert!(store.contains_filename("a.fits").unwrap());
    assert!(!store.contains_filename("b.fits").unwrap());
}

#[test]
fn test_concurrent_inserts_store_one_record() {
    let store = Arc::new(MemoryStore::new());
    let night = date(2025, 3, 1);
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store
                    .insert_if_absent(science_record("same.fits", night, "M51", time(1, 0, 0), 1, None))
                    .unwrap()
            })
        })
        .collect();
    let inserted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|o| *o == InsertOutcome::Inserted)
        .count();
    assert_eq!(inserted, 1);
    assert_eq!(store.frame_count(), 1);
}

#[test]
fn test_existing_filenames_by_night_and_unit() {
    let store = MemoryStore::new();
    let night = date(2025, 3, 1);
    let mut a = science_record("a.fits", night, "M51", time(1, 0, 0), 1, None);
    a.unit = Some(UnitId::new(1).unwrap());
    let mut b = science_record("b.fits", night, "M51", time(1, 0, 0), 2, None);
    b.unit = Some(UnitId::new(2).unwrap());
    let c = science_record("c.fits", date(2025, 3, 2), "M51", time(1, 0, 0), 3, None);
    for r in [a, b, c] {
        store.insert_if_absent(r).unwrap();
    }

    assert_eq!(store.existing_filenames(night, None).unwrap().len(), 2);
    let unit2 = store
        .existing_filenames(night, Some(UnitId::new(2).unwrap()))
        .unwrap();
    assert_eq!(unit2.into_iter().collect::<Vec<_>>(), vec!["b.fits".to_string()]);
    assert_eq!(store.registered_filenames().unwrap().len(), 3);
}

#[test]
fn test_link_requires_existing_target() {
    let store = MemoryStore::new();
    let night = date(2025, 3, 1);
    store
        .insert_if_absent(science_record("a.fits", night, "M51", time(1, 0, 0), 1, None))
        .unwrap();
    let err = store.link_target_if_unlinked("a.fits", "M51").unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    assert!(!err.is_transient());
    assert!(StoreError::Unavailable("x".into()).is_transient());

    store.get_or_create_target("M51", TargetType::Exsci, "").unwrap();
    assert!(store.link_target_if_unlinked("a.fits", "M51").unwrap());
    assert!(!store.link_target_if_unlinked("a.fits", "M51").unwrap());
}

// ---------------------------------------------------------------------------
// Nights
// ---------------------------------------------------------------------------

#[test]
fn test_refresh_night_statistics() {
    let store = MemoryStore::new();
    let night = date(2025, 3, 1);
    let mut science = science_record("a.fits", night, "M51", time(1, 0, 0), 1, None);
    science.unit = Some(UnitId::new(3).unwrap());
    let mut bias = science_record("b.fits", night, "", time(1, 0, 0), 2, None);
    bias.frame_type = FrameType::Bias;
    bias.unit = Some(UnitId::new(3).unwrap());
    let mut flat = science_record("c.fits", night, "", time(1, 0, 0), 3, None);
    flat.frame_type = FrameType::Flat;
    for r in [science, bias, flat] {
        store.insert_if_absent(r).unwrap();
    }

    let refreshed = refresh_night_statistics(&store, night).unwrap();
    assert_eq!(refreshed.total_frames, 3);
    assert_eq!(refreshed.science_count, 1);
    assert_eq!(refreshed.count_for(FrameType::Bias), 1);
    assert_eq!(refreshed.count_for(FrameType::Flat), 1);
    assert_eq!(refreshed.count_for(FrameType::Dark), 0);
    assert_eq!(refreshed.unit_counts[&UnitId::new(3).unwrap()], 2);
    assert_eq!(store.get_night(night).unwrap(), Some(refreshed));
}

#[test]
fn test_refresh_without_frames_leaves_date_unregistered() {
    let store = MemoryStore::new();
    let night = date(2025, 3, 2);
    let refreshed = refresh_night_statistics(&store, night).unwrap();
    assert_eq!(refreshed, Night::new(night));
    assert_eq!(store.get_night(night).unwrap(), None);
}

#[test]
fn test_flush_night_removes_frames_and_night() {
    let store = MemoryStore::new();
    let night = date(2025, 3, 1);
    let other = date(2025, 3, 2);
    store.get_or_create_night(night).unwrap();
    store
        .insert_if_absent(science_record("a.fits", night, "M51", time(1, 0, 0), 1, None))
        .unwrap();
    store
        .insert_if_absent(science_record("b.fits", other, "M51", time(1, 0, 0), 1, None))
        .unwrap();

    let report = flush_night(&store, night).unwrap();
    assert_eq!(report.frames_deleted, 1);
    assert!(report.night_deleted);
    assert_eq!(store.get_night(night).unwrap(), None);
    assert!(store.contains_filename("b.fits").unwrap());

    let again = flush_night(&store, night).unwrap();
    assert_eq!(again.frames_deleted, 0);
    assert!(!again.night_deleted);
}

#[test]
fn test_update_unknown_night_is_not_found() {
    let store = MemoryStore::new();
    let night = skyledger_core::frame::Night::new(date(2025, 3, 1));
    assert!(matches!(
        store.update_night(&night),
        Err(StoreError::NotFound(_))
    ));
}

// ---------------------------------------------------------------------------
// Ledger file
// ---------------------------------------------------------------------------

#[test]
fn test_ledger_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("ledger.json");
    let night = date(2025, 3, 1);

    let store = MemoryStore::new();
    store.get_or_create_night(night).unwrap();
    let mut record = science_record("a.fits", night, "M51", time(1, 0, 0), 1, Some((202.47, 47.2)));
    record.unit = Some(UnitId::new(1).unwrap());
    store.insert_if_absent(record).unwrap();
    store.get_or_create_target("M51", TargetType::Exsci, "seed").unwrap();
    store.upsert_tile(Tile { id: 42, ra: 10.0, dec: -5.0 }).unwrap();
    refresh_night_statistics(&store, night).unwrap();
    store.save(&path).unwrap();

    assert!(path.exists());
    assert!(!dir.path().join("nested").join("ledger.json.tmp").exists());

    let loaded = MemoryStore::load(&path).unwrap();
    assert_eq!(loaded.frame_count(), 1);
    assert_eq!(loaded.target_count(), 1);
    assert_eq!(loaded.tile_count(), 1);
    assert_eq!(loaded.nights(), store.nights());

    let frame = loaded.frame("a.fits").unwrap();
    assert_eq!(frame.unit, Some(UnitId::new(1).unwrap()));
    assert_eq!(frame.obs_time, time(1, 0, 0));
    assert_relative_eq!(frame.object_ra.unwrap(), 202.47);
    assert_eq!(loaded.find_target("M51").unwrap().unwrap().description, "seed");
    assert_eq!(loaded.nights()[0].unit_counts.len(), 1);
}

#[test]
fn test_missing_ledger_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::load(&dir.path().join("absent.json")).unwrap();
    assert_eq!(store.frame_count(), 0);
}

#[test]
fn test_corrupt_ledger_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    std::fs::write(&path, b"{not json").unwrap();
    assert!(matches!(MemoryStore::load(&path), Err(LedgerError::Json(_))));
}

// ---------------------------------------------------------------------------
// Tile catalog
// ---------------------------------------------------------------------------

#[test]
fn test_parse_tile_catalog() {
    let text = "id ra dec\nT00001 0.0 -89.5\n\n2 15.25 -88.0\nT25344 150.5 -30.25\n";
    let tiles = parse_tile_catalog(Cursor::new(text)).unwrap();
    assert_eq!(tiles.len(), 3);
    assert_eq!(tiles[0].id, 1);
    assert_eq!(tiles[1].id, 2);
    assert_eq!(tiles[2].name(), "T25344");
    assert_relative_eq!(tiles[2].ra, 150.5);
    assert_relative_eq!(tiles[2].dec, -30.25);
}

#[test]
fn test_tile_catalog_errors_name_the_line() {
    let err = parse_tile_catalog(Cursor::new("header\nT1 1.0 2.0\nTX 1.0 2.0\n")).unwrap_err();
    assert!(matches!(err, LedgerError::Catalog { line: 3, .. }), "{err}");

    let err = parse_tile_catalog(Cursor::new("header\nT1 1.0\n")).unwrap_err();
    match err {
        LedgerError::Catalog { line, reason } => {
            assert_eq!(line, 2);
            assert!(reason.contains("dec"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_load_tile_catalog_and_upsert() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiles.txt");
    std::fs::write(&path, "tile ra dec\nT00001 1.0 2.0\nT00002 3.0 4.0\n").unwrap();

    let store = MemoryStore::new();
    let tiles = load_tile_catalog(&path).unwrap();
    let created = tiles
        .into_iter()
        .filter(|t| store.upsert_tile(t.clone()).unwrap())
        .count();
    assert_eq!(created, 2);
    assert!(!store.upsert_tile(Tile { id: 1, ra: 1.5, dec: 2.0 }).unwrap());
    assert_relative_eq!(store.find_tile(1).unwrap().unwrap().ra, 1.5);
    assert_eq!(store.tile_count(), 2);
}
