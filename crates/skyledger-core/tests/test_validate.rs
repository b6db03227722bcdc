mod common;

use approx::assert_relative_eq;

use common::{date, DataTree};
use skyledger_core::error::LedgerError;
use skyledger_core::scan::{classify_folder, validate_folders, FolderStatus, ScanOptions};

fn today() -> chrono::NaiveDate {
    date(2025, 3, 10)
}

fn mixed_tree() -> DataTree {
    let tree = DataTree::new();
    tree.touch("7DT01", "2025-03-01", "a.fits");
    tree.touch("7DT01", "2025-03-02_night", "a.fits");
    tree.touch("7DT01", "20250303", "a.fits");
    tree.touch("7DT01", "misc", "a.fits");
    tree.touch("7DT01", "2022-12-31", "a.fits");
    tree.touch("7DT02", "2025-03-01", "a.fits");
    tree.touch("7DT02", "2026-01-01", "a.fits");
    tree.touch("other", "junk", "a.fits");
    tree
}

// ---------------------------------------------------------------------------
// Folder names
// ---------------------------------------------------------------------------

#[test]
fn test_canonical_names_are_valid() {
    assert_eq!(
        classify_folder("2025-03-01", today()),
        (FolderStatus::Valid, Some(date(2025, 3, 1)))
    );
    assert_eq!(
        classify_folder("2025-03-01_extra", today()),
        (FolderStatus::Valid, Some(date(2025, 3, 1)))
    );
    // The folder for today is not in the future.
    assert_eq!(classify_folder("2025-03-10", today()).0, FolderStatus::Valid);
}

#[test]
fn test_non_canonical_dates_are_suspicious() {
    assert_eq!(
        classify_folder("backup_2025-03-01", today()),
        (FolderStatus::Suspicious, Some(date(2025, 3, 1)))
    );
    assert_eq!(
        classify_folder("20250301", today()),
        (FolderStatus::Suspicious, Some(date(2025, 3, 1)))
    );
    assert_eq!(
        classify_folder("250301", today()),
        (FolderStatus::Suspicious, Some(date(2025, 3, 1)))
    );
    assert_eq!(classify_folder("2025-03-01x", today()).0, FolderStatus::Suspicious);
}

#[test]
fn test_undated_names_are_invalid() {
    assert_eq!(classify_folder("misc", today()), (FolderStatus::InvalidDate, None));
    assert_eq!(classify_folder("2025-13-01", today()), (FolderStatus::InvalidDate, None));
    assert_eq!(classify_folder("2025031", today()), (FolderStatus::InvalidDate, None));
    assert_eq!(classify_folder("", today()), (FolderStatus::InvalidDate, None));
}

#[test]
fn test_out_of_range_dates() {
    assert_eq!(
        classify_folder("2022-05-01", today()),
        (FolderStatus::TooOld, Some(date(2022, 5, 1)))
    );
    assert_eq!(
        classify_folder("2026-01-01", today()),
        (FolderStatus::FutureDate, Some(date(2026, 1, 1)))
    );
    assert_eq!(classify_folder("2025-03-11_late", today()).0, FolderStatus::FutureDate);
    // Range checks win over the naming check.
    assert_eq!(classify_folder("20220501", today()).0, FolderStatus::TooOld);
}

#[test]
fn test_status_labels() {
    assert_eq!(FolderStatus::InvalidDate.to_string(), "invalid date");
    assert_eq!(FolderStatus::FutureDate.to_string(), "future date");
    assert_eq!(
        serde_json::to_string(&FolderStatus::TooOld).unwrap(),
        "\"too_old\""
    );
}

// ---------------------------------------------------------------------------
// Tree validation
// ---------------------------------------------------------------------------

#[test]
fn test_validate_counts_every_unit_folder() {
    let tree = mixed_tree();
    let report = validate_folders(tree.root(), &ScanOptions::default(), today()).unwrap();

    assert_eq!(report.total(), 7);
    assert_eq!(report.valid(), 3);
    assert_eq!(report.count(FolderStatus::Suspicious), 1);
    assert_eq!(report.count(FolderStatus::InvalidDate), 1);
    assert_eq!(report.count(FolderStatus::TooOld), 1);
    assert_eq!(report.count(FolderStatus::FutureDate), 1);
    assert_relative_eq!(report.compliance_rate(), 3.0 / 7.0 * 100.0, epsilon = 1e-9);

    // Sorted by unit, then folder name.
    let keys: Vec<(&str, &str)> = report
        .folders
        .iter()
        .map(|f| (f.unit.as_str(), f.folder_name.as_str()))
        .collect();
    assert_eq!(keys[0], ("7DT01", "2022-12-31"));
    assert_eq!(keys[6], ("7DT02", "2026-01-01"));
    assert!(report.folders.iter().all(|f| f.unit != "other"));

    let issues: Vec<&str> = report.issues().map(|f| f.folder_name.as_str()).collect();
    assert_eq!(issues, ["2022-12-31", "20250303", "misc", "2026-01-01"]);
}

#[test]
fn test_validate_honours_unit_selection_and_ignores_files() {
    let tree = mixed_tree();
    std::fs::write(tree.root().join("7DT02").join("notes.txt"), b"").unwrap();

    let options = ScanOptions {
        units: vec!["7DT02".to_string()],
        // Date filtering does not narrow validation.
        folder_date: Some(date(2025, 3, 1)),
    };
    let report = validate_folders(tree.root(), &options, today()).unwrap();
    assert_eq!(report.total(), 2);
    assert_eq!(report.valid(), 1);
    assert_eq!(report.count(FolderStatus::FutureDate), 1);
    assert!(report.unit_errors.is_empty());
}

#[test]
fn test_validate_empty_root_is_fully_compliant() {
    let tree = DataTree::new();
    let report = validate_folders(tree.root(), &ScanOptions::default(), today()).unwrap();
    assert_eq!(report.total(), 0);
    assert_relative_eq!(report.compliance_rate(), 100.0);
    assert_eq!(report.issues().count(), 0);
}

#[test]
fn test_validate_missing_root_is_fatal() {
    let tree = DataTree::new();
    let err = validate_folders(&tree.root().join("nope"), &ScanOptions::default(), today()).unwrap_err();
    assert!(matches!(err, LedgerError::RootNotFound(_)));
}

#[cfg(unix)]
#[test]
fn test_validate_records_unreadable_unit() {
    let tree = mixed_tree();
    std::os::unix::fs::symlink(tree.root().join("does-not-exist"), tree.root().join("7DT05")).unwrap();

    let report = validate_folders(tree.root(), &ScanOptions::default(), today()).unwrap();
    assert_eq!(report.unit_errors.len(), 1);
    assert_eq!(report.unit_errors[0].unit, "7DT05");
    assert_eq!(report.total(), 7);
}
