//! Loads scraper output into the vehicle store.
//!
//! Scrapers drop JSON files, each an array of vehicle records, into the
//! import directory. One import call turns all given files into a single
//! batch and makes it the active one.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::Serialize;
use walkdir::WalkDir;

use crate::config::Config;
use crate::db::{import_repo, vehicle_repo, Database};
use crate::error::ImportError;
use crate::model::Vehicle;
use crate::sanitize;
use crate::schedule::{Clock, SystemClock};
use crate::storage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub import_id: i64,
    pub files: usize,
    pub imported: usize,
    /// Records dropped for a blank VIN or location.
    pub skipped: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub archived: Vec<PathBuf>,
}

fn read_vehicles(path: &Path) -> Result<Vec<Vehicle>, ImportError> {
    let content = std::fs::read_to_string(path).map_err(|e| ImportError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| ImportError::ParseFile {
        path: path.to_path_buf(),
        source: e,
    })
}

pub struct ImportManager {
    db: Database,
    directory: PathBuf,
    clock: Arc<dyn Clock>,
}

impl ImportManager {
    pub fn new<P: AsRef<Path>>(db: Database, directory: P, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            directory: directory.as_ref().to_path_buf(),
            clock,
        }
    }

    pub fn from_config(db: Database, config: &Config) -> Self {
        Self::new(db, &config.import_directory, Arc::new(SystemClock))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// `*.json` files directly inside the import directory, sorted by name.
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.directory)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.is_file())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("json"))
            })
            .collect();
        files.sort();
        debug!(
            "Found {} import files in {}",
            files.len(),
            self.directory.display()
        );
        files
    }

    /// Parses every file and stores all usable records as one new active
    /// batch. Any unreadable file aborts the import before anything is
    /// written.
    pub fn import_files(
        &self,
        paths: &[PathBuf],
        source: Option<&str>,
    ) -> Result<ImportSummary, ImportError> {
        let _span = tracing::info_span!("import", files = paths.len()).entered();

        let mut vehicles = Vec::new();
        let mut skipped = 0;
        for path in paths {
            for mut vehicle in read_vehicles(path)? {
                let vin = sanitize::normalize_vin(&vehicle.vin);
                match vin {
                    Some(vin) if !vehicle.location.trim().is_empty() => {
                        if !sanitize::is_plausible_vin(&vin) {
                            debug!("Unusual VIN {} in {}", vin, sanitize::redact_path(path));
                        }
                        vehicle.vin = vin;
                        vehicle.location = vehicle.location.trim().to_string();
                        vehicles.push(vehicle);
                    }
                    _ => {
                        skipped += 1;
                        warn!(
                            "Skipping record without VIN or location in {}",
                            sanitize::redact_path(path)
                        );
                    }
                }
            }
        }

        if vehicles.is_empty() {
            return Err(ImportError::Empty { files: paths.len() });
        }

        let import_date = self.clock.now().format("%Y-%m-%d").to_string();
        let import_id =
            import_repo::create_batch(&self.db, &import_date, source, vehicles.len() as i64)?;
        let imported = vehicle_repo::insert_many(&self.db, import_id, &vehicles)?;
        import_repo::activate(&self.db, import_id)?;

        info!(
            "Import {} active: {} vehicles from {} files ({} skipped)",
            import_id,
            imported,
            paths.len(),
            skipped
        );

        Ok(ImportSummary {
            import_id,
            files: paths.len(),
            imported,
            skipped,
            archived: Vec::new(),
        })
    }

    /// Imports everything waiting in the import directory and moves the
    /// files to `archive/`. Returns `None` when there is nothing to import.
    pub fn import_directory(&self) -> Result<Option<ImportSummary>, ImportError> {
        let files = self.scan();
        if files.is_empty() {
            return Ok(None);
        }

        let source = self.directory.display().to_string();
        let mut summary = self.import_files(&files, Some(&source))?;

        let today = self.clock.now().date();
        for file in &files {
            match storage::archive_file(file, &self.directory, today) {
                Ok(path) => summary.archived.push(path),
                Err(e) => warn!("Imported but could not archive: {}", e),
            }
        }

        Ok(Some(summary))
    }

    /// Scheduled daily import. Errors are logged, not returned.
    pub fn run_daily_import(&self) -> Option<ImportSummary> {
        match self.import_directory() {
            Ok(Some(summary)) => Some(summary),
            Ok(None) => {
                info!("No import files in {}", self.directory.display());
                None
            }
            Err(e) => {
                error!("Daily import failed: {}", e);
                None
            }
        }
    }
}
