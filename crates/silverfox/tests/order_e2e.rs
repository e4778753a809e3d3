//! End-to-end order tests: active inventory in SQLite through VIN diffing
//! to the folders, QR PNGs, CSV and order record on disk.

mod common;

use std::path::Path;

use common::harness::{list_pngs, read_csv};
use common::{DealershipBuilder, TestHarness, VehicleBuilder};

use silverfox::db::{order_repo, vin_log_repo};
use silverfox::{Vehicle, VehicleType};

const HONDA: &str = "Columbia Honda";
const HONDA_SLUG: &str = "columbia_honda";

fn used(vin: &str) -> Vehicle {
    VehicleBuilder::new(vin, HONDA).build()
}

/// One CAO run against a prepared inventory and history.
struct CaoCase {
    name: &'static str,
    /// `(vin, type, status)` rows of the active import.
    inventory: &'static [(&'static str, &'static str, &'static str)],
    /// VINs already ordered before the run.
    history: &'static [&'static str],
    vehicle_types: &'static [VehicleType],
    exclude_status: &'static [&'static str],
    /// VINs the order should contain, in inventory order.
    expected_vins: &'static [&'static str],
    expected_removed: usize,
}

const CAO_CASES: &[CaoCase] = &[
    CaoCase {
        name: "first_run_orders_everything",
        inventory: &[("A1", "Used", "In Stock"), ("A2", "Used", "In Stock")],
        history: &[],
        vehicle_types: &[],
        exclude_status: &[],
        expected_vins: &["A1", "A2"],
        expected_removed: 0,
    },
    CaoCase {
        name: "history_is_subtracted",
        inventory: &[
            ("A1", "Used", "In Stock"),
            ("B1", "Used", "In Stock"),
            ("C1", "Used", "In Stock"),
        ],
        history: &["B1", "Z9"],
        vehicle_types: &[],
        exclude_status: &[],
        expected_vins: &["A1", "C1"],
        expected_removed: 1,
    },
    CaoCase {
        name: "type_filter_cpo_matches_certified",
        inventory: &[
            ("N1", "New", "In Stock"),
            ("C1", "Certified Pre-Owned", "In Stock"),
            ("U1", "used", "In Stock"),
        ],
        history: &[],
        vehicle_types: &[VehicleType::Cpo],
        exclude_status: &[],
        expected_vins: &["C1"],
        expected_removed: 0,
    },
    CaoCase {
        name: "multiple_types_are_ored",
        inventory: &[
            ("N1", "New", "In Stock"),
            ("P1", "Pre-Owned", "In Stock"),
            ("U1", "Used", "In Stock"),
        ],
        history: &[],
        vehicle_types: &[VehicleType::Used, VehicleType::Po],
        exclude_status: &[],
        expected_vins: &["P1", "U1"],
        expected_removed: 0,
    },
    CaoCase {
        name: "excluded_status_is_dropped",
        inventory: &[("A1", "Used", "In Stock"), ("A2", "Used", "In-Transit")],
        history: &[],
        vehicle_types: &[],
        exclude_status: &["in-transit"],
        expected_vins: &["A1"],
        expected_removed: 0,
    },
    CaoCase {
        name: "everything_already_ordered",
        inventory: &[("A1", "Used", "In Stock")],
        history: &["A1"],
        vehicle_types: &[],
        exclude_status: &[],
        expected_vins: &[],
        expected_removed: 0,
    },
];

fn run_cao_case(case: &CaoCase) {
    let harness = TestHarness::new();
    harness.add_dealership(
        &DealershipBuilder::new(HONDA)
            .vehicle_types(case.vehicle_types)
            .exclude_status(case.exclude_status)
            .build(),
    );

    let inventory: Vec<Vehicle> = case
        .inventory
        .iter()
        .map(|(vin, vehicle_type, status)| {
            VehicleBuilder::new(vin, HONDA)
                .vehicle_type(vehicle_type)
                .status(status)
                .build()
        })
        .collect();
    harness.activate_inventory(&inventory);
    if !case.history.is_empty() {
        harness.seed_history(HONDA_SLUG, case.history);
    }

    let result = harness.processor().process_cao_order(HONDA, None, false);

    assert!(result.success, "[{}] failed: {:?}", case.name, result.error);
    assert_eq!(result.vins, case.expected_vins, "[{}] ordered VINs", case.name);
    assert_eq!(
        result.removed_vehicles,
        Some(case.expected_removed),
        "[{}] removed count",
        case.name
    );
    assert_eq!(
        result.order_id.is_some(),
        !case.expected_vins.is_empty(),
        "[{}] order record",
        case.name
    );
}

#[test]
fn test_cao_cases() {
    for case in CAO_CASES {
        run_cao_case(case);
    }
}

#[test]
fn test_cao_writes_qr_codes_csv_and_order_record() {
    let harness = TestHarness::new();
    harness.add_dealership(
        &DealershipBuilder::new(HONDA)
            .vehicle_types(&[VehicleType::Used])
            .build(),
    );
    harness.activate_inventory(&[used("A"), used("B"), used("C")]);
    harness.seed_history(HONDA_SLUG, &["B"]);

    let result = harness.processor().process_cao_order(HONDA, None, false);

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.total_vehicles, Some(3));
    assert_eq!(result.new_vehicles, Some(2));
    assert_eq!(result.vins, vec!["A", "C"]);
    assert_eq!(
        result.order_number.as_deref(),
        Some("columbia_honda_CAO_20260314_001")
    );

    // Folder layout.
    let export_dir = harness
        .output_dir
        .join("orders")
        .join(HONDA_SLUG)
        .join("20260314_080000");
    assert_eq!(
        result.export_folder.as_deref(),
        Some(export_dir.display().to_string().as_str())
    );

    // Two 388x388 QR codes named by batch position.
    let qr_dir = export_dir.join("qr_codes");
    let pngs = list_pngs(&qr_dir);
    assert_eq!(result.qr_codes_generated, 2);
    assert_eq!(
        pngs,
        vec![
            qr_dir.join("columbia_honda_QR_Code_1.png"),
            qr_dir.join("columbia_honda_QR_Code_2.png"),
        ]
    );
    for png in &pngs {
        assert_eq!(image::image_dimensions(png).unwrap(), (388, 388));
    }

    // CSV joins each row to its own QR file.
    let csv_path = export_dir.join("columbia_honda_CAO_20260314_080000.csv");
    assert_eq!(
        result.csv_file.as_deref(),
        Some(csv_path.display().to_string().as_str())
    );
    let (headers, rows) = read_csv(&csv_path);
    assert_eq!(headers.first().map(String::as_str), Some("VIN"));
    assert_eq!(headers.last().map(String::as_str), Some("QR_Code_Path"));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], "A");
    assert_eq!(rows[1][0], "C");
    assert!(rows[0].last().unwrap().ends_with("columbia_honda_QR_Code_1.png"));
    assert!(rows[1].last().unwrap().ends_with("columbia_honda_QR_Code_2.png"));

    // History now holds all three VINs; the order record matches the run.
    assert_eq!(harness.history_count(HONDA_SLUG), 3);
    let entry = vin_log_repo::find_entry(&harness.db, HONDA_SLUG, "A")
        .unwrap()
        .unwrap();
    assert_eq!(entry.order_number.as_deref(), result.order_number.as_deref());

    let record = order_repo::find_by_id(&harness.db, result.order_id.unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(record.dealership_name, HONDA);
    assert_eq!(record.job_type, "CAO");
    assert_eq!(record.vehicle_count, 2);
    assert_eq!(record.qr_count, 2);
    assert_eq!(record.created_at, "2026-03-14T08:00:00");
}

#[test]
fn test_second_cao_run_orders_only_new_arrivals() {
    let harness = TestHarness::new();
    harness.activate_inventory(&[used("A"), used("B")]);
    let processor = harness.processor();

    let first = processor.process_cao_order(HONDA, None, false);
    assert_eq!(first.new_vehicles, Some(2));

    harness.clock.advance(chrono::Duration::hours(1));
    harness.activate_inventory(&[used("B"), used("C")]);
    let second = processor.process_cao_order(HONDA, None, false);

    assert!(second.success, "{:?}", second.error);
    assert_eq!(second.vins, vec!["C"]);
    assert_eq!(second.removed_vehicles, Some(1));
    assert_eq!(
        second.order_number.as_deref(),
        Some("columbia_honda_CAO_20260314_002")
    );
    assert_ne!(first.export_folder, second.export_folder);

    let orders = order_repo::list_by_dealership(&harness.db, HONDA, 10).unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].id, second.order_id.unwrap());
}

#[test]
fn test_test_mode_writes_files_but_not_history() {
    let harness = TestHarness::new();
    harness.activate_inventory(&[used("A"), used("B")]);
    let processor = harness.processor();

    let dry = processor.process_cao_order(HONDA, None, true);
    let again = processor.process_cao_order(HONDA, None, true);

    assert!(dry.success);
    assert_eq!(dry.vins, again.vins);
    assert!(dry.order_number.is_none());
    assert!(dry.csv_file.is_some());
    assert_eq!(harness.history_count(HONDA_SLUG), 0);
}

#[test]
fn test_vehicle_without_url_gets_no_qr() {
    let harness = TestHarness::new();
    harness.activate_inventory(&[
        used("A"),
        VehicleBuilder::new("B", HONDA).no_url().build(),
    ]);

    let result = harness.processor().process_cao_order(HONDA, None, true);

    assert_eq!(result.new_vehicles, Some(2));
    assert_eq!(result.qr_codes_generated, 1);
    let (_, rows) = read_csv(Path::new(result.csv_file.as_deref().unwrap()));
    assert_eq!(rows.len(), 2);
    assert!(rows[1].last().unwrap().is_empty());
}

#[test]
fn test_qr_output_path_overrides_output_directory() {
    let harness = TestHarness::new();
    let custom = harness.temp_path().join("honda-qr");
    harness.add_dealership(
        &DealershipBuilder::new(HONDA)
            .qr_output_path(custom.to_str().unwrap())
            .build(),
    );
    harness.activate_inventory(&[used("A")]);

    let result = harness.processor().process_cao_order(HONDA, None, true);

    let export_folder = result.export_folder.unwrap();
    assert!(export_folder.starts_with(custom.to_str().unwrap()));
    assert!(!harness.output_dir.join("orders").exists());
}

#[test]
fn test_location_differs_from_name() {
    let harness = TestHarness::new();
    harness.add_dealership(
        &DealershipBuilder::new("Honda of Columbia")
            .location(HONDA)
            .build(),
    );
    harness.activate_inventory(&[used("A"), VehicleBuilder::new("X", "Other Dealer").build()]);

    let result = harness
        .processor()
        .process_cao_order("Honda of Columbia", None, false);

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.vins, vec!["A"]);
    assert_eq!(harness.history_count("honda_of_columbia"), 1);
}

#[test]
fn test_list_order_end_to_end() {
    let harness = TestHarness::new();
    harness.activate_inventory(&[used("AAA"), used("BBB")]);

    let requested = vec!["aaa".to_string(), "MISSING".to_string(), "BBB".to_string()];
    let result = harness
        .processor()
        .process_list_order(HONDA, &requested, false);

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.vehicles_requested, Some(3));
    assert_eq!(result.vehicles_found, Some(2));
    assert_eq!(result.missing_vins, vec!["MISSING"]);
    assert_eq!(
        result.order_number.as_deref(),
        Some("columbia_honda_LIST_20260314_001")
    );

    let csv_path = result.csv_file.clone().unwrap();
    assert!(csv_path.ends_with("columbia_honda_LIST_20260314_080000.csv"));
    let (_, rows) = read_csv(Path::new(&csv_path));
    assert_eq!(rows.len(), 2);

    // Listed VINs are history now, so CAO skips them.
    let cao = harness.processor().process_cao_order(HONDA, None, false);
    assert!(cao.success);
    assert_eq!(cao.new_vehicles, Some(0));
}

#[test]
fn test_list_order_with_no_matches_writes_nothing() {
    let harness = TestHarness::new();
    harness.activate_inventory(&[used("AAA")]);

    let result = harness
        .processor()
        .process_list_order(HONDA, &["ZZZ".to_string()], false);

    assert!(result.success);
    assert_eq!(result.vehicles_found, Some(0));
    assert!(result.order_id.is_none());
    assert!(result.order_number.is_none());
    assert!(!harness.output_dir.join("orders").exists());
}

#[test]
fn test_daily_cao_runs_each_configured_dealership() {
    let harness = TestHarness::new();
    harness.add_dealership(
        &DealershipBuilder::new(HONDA)
            .vehicle_types(&[VehicleType::Used])
            .build(),
    );
    harness.add_dealership(
        &DealershipBuilder::new("Dave Sinclair Lincoln")
            .vehicle_types(&[VehicleType::New])
            .build(),
    );
    harness.add_dealership(
        &DealershipBuilder::new("Closed Motors")
            .vehicle_types(&[VehicleType::Used])
            .inactive()
            .build(),
    );
    harness.activate_inventory(&[
        used("A"),
        VehicleBuilder::new("L1", "Dave Sinclair Lincoln")
            .vehicle_type("New")
            .build(),
        VehicleBuilder::new("Z1", "Closed Motors").build(),
    ]);

    let results = harness.processor().process_daily_cao_orders();

    let mut names: Vec<&str> = results.iter().map(|r| r.dealership.as_str()).collect();
    names.sort();
    assert_eq!(names, vec![HONDA, "Dave Sinclair Lincoln"]);
    assert!(results.iter().all(|r| r.success && r.new_vehicles == Some(1)));
    assert_eq!(harness.history_count("closed_motors"), 0);
}
