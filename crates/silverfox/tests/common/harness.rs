//! Test harness for isolated test execution.
//!
//! Every `TestHarness` owns a temp directory holding the import directory,
//! the order output directory and a SQLite file, plus a manual clock so
//! order numbers and folder names are predictable.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tempfile::TempDir;

use silverfox::db::{dealership_repo, import_repo, vehicle_repo, vin_log_repo};
use silverfox::{
    Clock, Database, DealershipConfig, ImportManager, ManualClock, OrderProcessor, OrderType,
    QrGenerator, SqliteVinHistory, Vehicle, VinHistory,
};

/// Isolated environment for integration tests.
pub struct TestHarness {
    temp_dir: TempDir,
    /// Where scraper JSON files are dropped.
    pub import_dir: PathBuf,
    /// Root of the order output tree.
    pub output_dir: PathBuf,
    pub db: Database,
    pub clock: Arc<ManualClock>,
}

impl TestHarness {
    /// Harness with the clock at 2026-03-14 08:00.
    pub fn new() -> Self {
        Self::at(
            NaiveDate::from_ymd_opt(2026, 3, 14)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        )
    }

    pub fn at(now: NaiveDateTime) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        let import_dir = base.join("imports");
        let output_dir = base.join("output");
        std::fs::create_dir_all(&import_dir).expect("Failed to create import dir");
        std::fs::create_dir_all(&output_dir).expect("Failed to create output dir");

        let db = Database::open(&base.join("data").join("silverfox.db"))
            .expect("Failed to open database");

        Self {
            temp_dir,
            import_dir,
            output_dir,
            db,
            clock: Arc::new(ManualClock::new(now)),
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.now().date()
    }

    /// Order processor wired to the harness database, output dir and clock.
    pub fn processor(&self) -> OrderProcessor {
        let history: Arc<dyn VinHistory> = Arc::new(SqliteVinHistory::new(self.db.clone()));
        OrderProcessor::new(
            self.db.clone(),
            &self.output_dir,
            QrGenerator::default(),
            history,
            self.clock.clone(),
        )
    }

    pub fn importer(&self) -> ImportManager {
        ImportManager::new(self.db.clone(), &self.import_dir, self.clock.clone())
    }

    pub fn add_dealership(&self, config: &DealershipConfig) {
        dealership_repo::upsert(&self.db, config).expect("Failed to store dealership");
    }

    /// Writes vehicles as a scraper JSON file into the import directory.
    pub fn write_import(&self, filename: &str, vehicles: &[Vehicle]) -> PathBuf {
        let path = self.import_dir.join(filename);
        let json = serde_json::to_string_pretty(vehicles).expect("Failed to serialize vehicles");
        std::fs::write(&path, json).expect("Failed to write import file");
        path
    }

    /// Stores vehicles as the active import without going through files.
    pub fn activate_inventory(&self, vehicles: &[Vehicle]) -> i64 {
        let date = self.today().format("%Y-%m-%d").to_string();
        let id = import_repo::create_batch(&self.db, &date, Some("harness"), vehicles.len() as i64)
            .expect("Failed to create batch");
        vehicle_repo::insert_many(&self.db, id, vehicles).expect("Failed to insert vehicles");
        import_repo::activate(&self.db, id).expect("Failed to activate batch");
        id
    }

    /// Marks VINs as already ordered for a dealership slug.
    pub fn seed_history(&self, slug: &str, vins: &[&str]) {
        let vins: Vec<String> = vins.iter().map(|v| v.to_string()).collect();
        vin_log_repo::ensure_table(&self.db, slug).expect("Failed to create history table");
        vin_log_repo::insert_vins(&self.db, slug, &vins, OrderType::Cao, None, self.today())
            .expect("Failed to seed history");
    }

    pub fn history_count(&self, slug: &str) -> u64 {
        vin_log_repo::count(&self.db, slug).expect("Failed to count history")
    }
}

/// Data rows of a CSV export as string records.
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).expect("Failed to open CSV");
    let headers = reader
        .headers()
        .expect("Failed to read CSV header")
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|r| {
            r.expect("Failed to read CSV row")
                .iter()
                .map(str::to_string)
                .collect()
        })
        .collect();
    (headers, rows)
}

/// PNG files in a directory, sorted by name.
pub fn list_pngs(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .expect("Failed to read directory")
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "png"))
        .collect();
    files.sort();
    files
}
