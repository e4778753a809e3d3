//! Import directory to order: scraper files are imported, archived and
//! ordered from the new active batch.

mod common;

use common::{DealershipBuilder, TestHarness, VehicleBuilder};

use silverfox::db::import_repo;
use silverfox::{ImportError, VehicleType};

const HONDA: &str = "Columbia Honda";

#[test]
fn test_import_directory_then_cao() {
    let harness = TestHarness::new();
    harness.add_dealership(
        &DealershipBuilder::new(HONDA)
            .vehicle_types(&[VehicleType::Used])
            .exclude_missing_stock()
            .build(),
    );
    harness.write_import(
        "honda.json",
        &[
            VehicleBuilder::new("A", HONDA).build(),
            VehicleBuilder::new("B", HONDA).no_stock().build(),
            VehicleBuilder::new("N", HONDA).vehicle_type("New").build(),
        ],
    );

    let summary = harness.importer().import_directory().unwrap().unwrap();
    assert_eq!(summary.imported, 3);
    assert!(harness
        .import_dir
        .join("archive")
        .join("2026-03-14_honda.json")
        .exists());

    let result = harness.processor().process_cao_order(HONDA, None, false);
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.total_vehicles, Some(1));
    assert_eq!(result.vins, vec!["A"]);
}

#[test]
fn test_reimport_replaces_active_inventory() {
    let harness = TestHarness::new();
    let importer = harness.importer();

    harness.write_import("day1.json", &[VehicleBuilder::new("OLD", HONDA).build()]);
    let first = importer.import_directory().unwrap().unwrap();

    harness.write_import("day2.json", &[VehicleBuilder::new("NEW", HONDA).build()]);
    let second = importer.import_directory().unwrap().unwrap();

    let active = import_repo::find_active(&harness.db).unwrap().unwrap();
    assert_eq!(active.import_id, second.import_id);
    assert_ne!(first.import_id, second.import_id);

    let result = harness.processor().process_cao_order(HONDA, None, true);
    assert_eq!(result.vins, vec!["NEW"]);
}

#[test]
fn test_scraper_spellings_and_blank_records() {
    let harness = TestHarness::new();
    let path = harness.import_dir.join("scrape.json");
    std::fs::write(
        &path,
        r#"[
            {"vin": " 1hgcm82633a004352 ", "stock_number": "H1", "condition": "Used",
             "price": "$19,995", "dealer_name": "Columbia Honda", "vdp_url": "https://x.example/1"},
            {"vin": "", "dealer_name": "Columbia Honda"},
            {"vin": "5FNRL6H78NB012345"}
        ]"#,
    )
    .unwrap();

    let summary = harness.importer().import_files(&[path], Some("manual")).unwrap();
    assert_eq!(summary.imported, 1);
    assert_eq!(summary.skipped, 2);

    let result = harness
        .processor()
        .process_list_order(HONDA, &["1HGCM82633A004352".to_string()], true);
    assert_eq!(result.vehicles_found, Some(1));
    assert_eq!(result.qr_codes_generated, 1);
}

#[test]
fn test_failed_import_keeps_previous_batch_active() {
    let harness = TestHarness::new();
    let importer = harness.importer();

    harness.write_import("good.json", &[VehicleBuilder::new("A", HONDA).build()]);
    let good = importer.import_directory().unwrap().unwrap();

    std::fs::write(harness.import_dir.join("broken.json"), "[{").unwrap();
    let err = importer.import_directory().unwrap_err();
    assert!(matches!(err, ImportError::ParseFile { .. }));

    // The broken file stays put for inspection.
    assert!(harness.import_dir.join("broken.json").exists());
    let active = import_repo::find_active(&harness.db).unwrap().unwrap();
    assert_eq!(active.import_id, good.import_id);
}

#[test]
fn test_empty_import_directory() {
    let harness = TestHarness::new();
    assert!(harness.importer().import_directory().unwrap().is_none());
    assert!(harness.importer().run_daily_import().is_none());
}
