use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, info_span, warn};

use crate::config::{Config, DealershipConfig};
use crate::db::{dealership_repo, import_repo, order_repo, vehicle_repo, Database};
use crate::differ::{SqliteVinHistory, VinDiffer, VinHistory};
use crate::error::OrderError;
use crate::export::{CsvExporter, QrGenerator};
use crate::filter::{self, VehicleType};
use crate::model::OrderType;
use crate::sanitize;
use crate::schedule::{Clock, SystemClock};
use crate::storage::OrderStorage;

use super::context::OrderContext;
use super::progress::{NoopProgress, OrderPhase, ProgressEvent, ProgressReporter};
use super::result::OrderResult;

pub struct OrderProcessor {
    db: Database,
    differ: VinDiffer,
    qr: QrGenerator,
    output_directory: PathBuf,
    clock: Arc<dyn Clock>,
    progress: Arc<dyn ProgressReporter>,
}

impl OrderProcessor {
    /// Production constructor: SQLite history, system clock, settings from
    /// `config`.
    pub fn from_config(db: Database, config: &Config) -> Self {
        let history: Arc<dyn VinHistory> = Arc::new(SqliteVinHistory::new(db.clone()));
        Self::new(
            db,
            &config.output_directory,
            QrGenerator::new(config.qr.size),
            history,
            Arc::new(SystemClock),
        )
    }

    pub fn new<P: AsRef<Path>>(
        db: Database,
        output_directory: P,
        qr: QrGenerator,
        history: Arc<dyn VinHistory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            differ: VinDiffer::new(history, Arc::clone(&clock)),
            qr,
            output_directory: output_directory.as_ref().to_path_buf(),
            clock,
            progress: Arc::new(NoopProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Comparative Analysis Order: the dealership's filtered active
    /// inventory minus everything already ordered. `vehicle_types`, when
    /// given, replaces the configured type filter.
    pub fn process_cao_order(
        &self,
        dealership_name: &str,
        vehicle_types: Option<&[VehicleType]>,
        test_mode: bool,
    ) -> OrderResult {
        let _order_span = info_span!("cao_order",
            dealership = %dealership_name,
            test_mode = test_mode,
        )
        .entered();

        let outcome = self
            .load_context(dealership_name, OrderType::Cao, test_mode)
            .and_then(|mut ctx| {
                self.run_cao(&mut ctx, vehicle_types)?;
                Ok(ctx)
            });
        self.finish(dealership_name, OrderType::Cao, test_mode, outcome)
    }

    /// Order for an explicit VIN list. VINs with no stored vehicle are
    /// reported as missing and do not fail the order.
    pub fn process_list_order(
        &self,
        dealership_name: &str,
        vins: &[String],
        test_mode: bool,
    ) -> OrderResult {
        let _order_span = info_span!("list_order",
            dealership = %dealership_name,
            requested = vins.len(),
            test_mode = test_mode,
        )
        .entered();

        let outcome = self
            .load_context(dealership_name, OrderType::List, test_mode)
            .and_then(|mut ctx| {
                self.run_list(&mut ctx, vins)?;
                Ok(ctx)
            });
        self.finish(dealership_name, OrderType::List, test_mode, outcome)
    }

    /// CAO for every active dealership that has a vehicle-type filter. A
    /// failing dealership does not stop the others.
    pub fn process_daily_cao_orders(&self) -> Vec<OrderResult> {
        let _span = info_span!("daily_cao").entered();

        let dealerships = match dealership_repo::list_active(&self.db) {
            Ok(d) => d,
            Err(e) => {
                log::error!("Failed to load dealership configs: {}", e);
                return Vec::new();
            }
        };

        let mut results = Vec::new();
        for dealership in dealerships {
            if dealership.filtering_rules.vehicle_types.is_empty() {
                debug!("Skipping {}: no vehicle types configured", dealership.name);
                continue;
            }
            results.push(self.process_cao_order(&dealership.name, None, false));
        }

        let failed = results.iter().filter(|r| !r.success).count();
        info!(
            "Daily CAO finished: {} dealerships, {} failed",
            results.len(),
            failed
        );
        results
    }

    fn finish(
        &self,
        dealership_name: &str,
        order_type: OrderType,
        test_mode: bool,
        outcome: Result<OrderContext, OrderError>,
    ) -> OrderResult {
        match outcome {
            Ok(ctx) => {
                self.progress.report(ProgressEvent::Completed {
                    dealership: ctx.dealership.name.clone(),
                    order_number: ctx.order_number.clone(),
                    vehicles: ctx.vehicles.len(),
                    qr_codes: ctx.qr_codes.len(),
                });
                OrderResult::from_context(&ctx)
            }
            Err(e) => {
                let message = e.to_string();
                log::error!("{} order for {} failed: {}", order_type, dealership_name, message);
                self.progress.report(ProgressEvent::Failed {
                    dealership: dealership_name.to_string(),
                    error: message.clone(),
                });
                OrderResult::failure(dealership_name, order_type, test_mode, message)
            }
        }
    }

    fn phase(&self, ctx: &OrderContext, phase: OrderPhase, message: impl Into<String>) {
        self.progress.report(ProgressEvent::Phase {
            dealership: ctx.dealership.name.clone(),
            phase,
            message: message.into(),
        });
    }

    fn load_context(
        &self,
        dealership_name: &str,
        order_type: OrderType,
        test_mode: bool,
    ) -> Result<OrderContext, OrderError> {
        let _step = info_span!("load_dealership").entered();

        let stored = dealership_repo::find_by_name(&self.db, dealership_name)?;
        let (dealership, message) = match stored {
            Some(config) => (config, "Loaded dealership configuration".to_string()),
            None => self.fallback_dealership(dealership_name)?,
        };

        if sanitize::vin_log_table(&dealership.slug()).is_none() {
            return Err(OrderError::InvalidDealership(dealership_name.to_string()));
        }

        let ctx = OrderContext::new(dealership, order_type, test_mode, self.clock.now());
        self.phase(&ctx, OrderPhase::LoadingDealership, message);
        Ok(ctx)
    }

    /// Default config for an unconfigured name. The VIN log is keyed by
    /// slug, so a name that slugifies like a configured dealership (a typo
    /// such as "Columbia-Honda") reads and writes that dealership's history.
    fn fallback_dealership(
        &self,
        dealership_name: &str,
    ) -> Result<(DealershipConfig, String), OrderError> {
        let dealership = DealershipConfig::fallback(dealership_name);
        let slug = dealership.slug();
        let message = match dealership_repo::find_by_slug(&self.db, &slug)? {
            Some(configured) => {
                warn!(
                    "No configuration for dealership '{}'; its slug '{}' belongs to configured \
                     dealership '{}', whose VIN history this order will use",
                    dealership_name, slug, configured.name
                );
                format!("Using defaults; VIN history shared with '{}'", configured.name)
            }
            None => {
                warn!(
                    "No configuration for dealership '{}', using defaults",
                    dealership_name
                );
                "Using default dealership configuration".to_string()
            }
        };
        Ok((dealership, message))
    }

    fn run_cao(
        &self,
        ctx: &mut OrderContext,
        vehicle_types: Option<&[VehicleType]>,
    ) -> Result<(), OrderError> {
        {
            let _step = info_span!("query_inventory").entered();
            self.phase(ctx, OrderPhase::QueryingInventory, "Querying active inventory...");
            self.step_query_inventory(ctx, vehicle_types)?;
        }

        {
            let _step = info_span!("compare_vins").entered();
            self.phase(ctx, OrderPhase::ComparingVins, "Comparing VINs against history...");
            self.step_compare_vins(ctx);
        }

        self.emit(ctx)
    }

    fn run_list(&self, ctx: &mut OrderContext, vins: &[String]) -> Result<(), OrderError> {
        {
            let _step = info_span!("lookup_vins").entered();
            self.phase(ctx, OrderPhase::LookingUpVins, "Looking up requested VINs...");
            self.step_lookup_vins(ctx, vins)?;
        }

        if !ctx.test_mode && !ctx.vehicles.is_empty() {
            let _step = info_span!("record_history").entered();
            let recorded = self
                .differ
                .record(&ctx.slug, &ctx.vins(), OrderType::List)?;
            ctx.order_number = Some(recorded.order_number);
        }

        self.emit(ctx)
    }

    fn step_query_inventory(
        &self,
        ctx: &mut OrderContext,
        vehicle_types: Option<&[VehicleType]>,
    ) -> Result<(), OrderError> {
        let active = import_repo::find_active(&self.db)?.ok_or(OrderError::NoActiveImport)?;

        let mut rules = ctx.dealership.filtering_rules.clone();
        if let Some(types) = vehicle_types {
            rules.vehicle_types = types.to_vec();
        }
        let predicate = filter::compose(&rules, ctx.dealership.location(), active.import_id);

        let rows = vehicle_repo::query_filtered(&self.db, &predicate)?;
        ctx.inventory = rows.into_iter().map(|row| row.vehicle).collect();

        info!(
            "{} vehicles match filters for {} in import {}",
            ctx.inventory.len(),
            ctx.dealership.name,
            active.import_id
        );
        Ok(())
    }

    fn step_compare_vins(&self, ctx: &mut OrderContext) {
        let current: Vec<String> = ctx.inventory.iter().map(|v| v.vin.clone()).collect();
        let diff = self
            .differ
            .diff(&ctx.slug, &current, OrderType::Cao, ctx.test_mode);

        let new_vins: HashSet<&str> = diff.new_vins.iter().map(String::as_str).collect();
        let mut taken = HashSet::new();
        ctx.vehicles = ctx
            .inventory
            .iter()
            .filter(|v| new_vins.contains(v.vin.as_str()) && taken.insert(v.vin.clone()))
            .cloned()
            .collect();
        ctx.order_number = diff.order_number.clone();
        ctx.diff = Some(diff);
    }

    fn step_lookup_vins(&self, ctx: &mut OrderContext, vins: &[String]) -> Result<(), OrderError> {
        let mut seen = HashSet::new();
        ctx.requested_vins = vins
            .iter()
            .filter_map(|raw| sanitize::normalize_vin(raw))
            .filter(|vin| seen.insert(vin.clone()))
            .collect();

        let location = ctx.dealership.location().to_string();
        for vin in &ctx.requested_vins {
            match vehicle_repo::find_latest_by_vin(&self.db, vin, &location)? {
                Some(row) => ctx.vehicles.push(row.vehicle),
                None => {
                    warn!("VIN {} not found for {}", vin, ctx.dealership.name);
                    ctx.missing_vins.push(vin.clone());
                }
            }
        }

        info!(
            "{} of {} requested VINs found for {}",
            ctx.vehicles.len(),
            ctx.requested_vins.len(),
            ctx.dealership.name
        );
        Ok(())
    }

    /// Folders, QR images, CSV and the order record. Skipped entirely when
    /// the order has no vehicles.
    fn emit(&self, ctx: &mut OrderContext) -> Result<(), OrderError> {
        if ctx.vehicles.is_empty() {
            info!("No vehicles to export for {}", ctx.dealership.name);
            return Ok(());
        }

        let folders = {
            let _step = info_span!("create_folders").entered();
            self.phase(ctx, OrderPhase::CreatingFolders, "Creating output folders...");
            let root = ctx
                .dealership
                .qr_output_path
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(|| self.output_directory.clone());
            OrderStorage::new(root).create_batch_folders(&ctx.slug, ctx.started_at)?
        };
        ctx.folders = Some(folders.clone());

        if ctx.dealership.output_rules.generate_qr {
            let _step = info_span!("generate_qr").entered();
            self.phase(ctx, OrderPhase::GeneratingQrCodes, "Generating QR codes...");
            ctx.qr_codes = self.qr.generate(&ctx.vehicles, &folders.qr_dir, &ctx.slug);
        }

        {
            let _step = info_span!("write_csv").entered();
            self.phase(ctx, OrderPhase::WritingCsv, "Writing CSV export...");
            let csv_path = folders.export_dir.join(format!(
                "{}_{}_{}.csv",
                ctx.slug, ctx.order_type, folders.batch_name
            ));
            CsvExporter::write(&csv_path, &ctx.vehicles, &ctx.qr_codes)?;
            debug!("Wrote {}", sanitize::redact_path(&csv_path));
            ctx.csv_path = Some(csv_path);
        }

        {
            let _step = info_span!("record_order").entered();
            self.phase(ctx, OrderPhase::RecordingOrder, "Recording order...");
            let export_file = ctx.csv_path.as_ref().map(|p| p.display().to_string());
            let qr_folder = folders.qr_dir.display().to_string();
            let created_at = self.clock.now().format("%Y-%m-%dT%H:%M:%S").to_string();
            let order_id = order_repo::insert(
                &self.db,
                &order_repo::NewOrder {
                    dealership_name: &ctx.dealership.name,
                    order_type: ctx.order_type,
                    order_number: ctx.order_number.as_deref(),
                    vehicle_count: ctx.vehicles.len(),
                    qr_count: ctx.qr_codes.len(),
                    export_file: export_file.as_deref(),
                    qr_folder: Some(&qr_folder),
                    created_at: &created_at,
                },
            )?;
            ctx.order_id = Some(order_id);
        }

        Ok(())
    }
}
