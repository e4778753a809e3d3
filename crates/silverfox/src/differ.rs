//! VIN differ: current inventory against a dealership's order history.
//!
//! `diff` never fails. When the history store cannot be read or written the
//! whole current list is treated as new and an empty removed list is
//! returned, so a broken history produces an oversized order rather than
//! no order at all.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::db::{order_repo, vin_log_repo, Database, DatabaseError};
use crate::error::OrderError;
use crate::model::OrderType;
use crate::schedule::Clock;

/// Storage for per-dealership VIN history.
pub trait VinHistory: Send + Sync {
    /// All VINs already ordered for the dealership, creating its history
    /// on first use.
    fn load(&self, slug: &str) -> Result<HashSet<String>, OrderError>;

    /// Appends VINs. Already-recorded VINs are left untouched. Returns the
    /// number of VINs actually added.
    fn record(
        &self,
        slug: &str,
        vins: &[String],
        order_type: OrderType,
        order_number: &str,
        order_date: NaiveDate,
    ) -> Result<usize, OrderError>;

    fn next_order_number(
        &self,
        slug: &str,
        order_type: OrderType,
        order_date: NaiveDate,
    ) -> Result<String, OrderError>;
}

fn history_error(err: DatabaseError) -> OrderError {
    match err {
        DatabaseError::TableMissing { table } => OrderError::HistoryTableMissing { table },
        other => OrderError::Database(other),
    }
}

/// History kept in `{slug}_vin_log` tables.
#[derive(Clone)]
pub struct SqliteVinHistory {
    db: Database,
}

impl SqliteVinHistory {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl VinHistory for SqliteVinHistory {
    fn load(&self, slug: &str) -> Result<HashSet<String>, OrderError> {
        vin_log_repo::ensure_table(&self.db, slug).map_err(history_error)?;
        vin_log_repo::load_vins(&self.db, slug).map_err(history_error)
    }

    fn record(
        &self,
        slug: &str,
        vins: &[String],
        order_type: OrderType,
        order_number: &str,
        order_date: NaiveDate,
    ) -> Result<usize, OrderError> {
        vin_log_repo::ensure_table(&self.db, slug).map_err(history_error)?;
        vin_log_repo::insert_vins(
            &self.db,
            slug,
            vins,
            order_type,
            Some(order_number),
            order_date,
        )
        .map_err(history_error)
    }

    fn next_order_number(
        &self,
        slug: &str,
        order_type: OrderType,
        order_date: NaiveDate,
    ) -> Result<String, OrderError> {
        order_repo::next_order_number(&self.db, slug, order_type, order_date).map_err(history_error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VinDiff {
    /// Current VINs not yet in history, in input order.
    pub new_vins: Vec<String>,
    /// History VINs no longer in inventory, sorted.
    pub removed_vins: Vec<String>,
    /// Set when new VINs were persisted.
    pub order_number: Option<String>,
    /// True when the history was unusable and every current VIN counts as new.
    pub fallback: bool,
}

/// Result of appending VINs to history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedVins {
    pub order_number: String,
    pub inserted: usize,
}

pub struct VinDiffer {
    history: Arc<dyn VinHistory>,
    clock: Arc<dyn Clock>,
}

impl VinDiffer {
    pub fn new(history: Arc<dyn VinHistory>, clock: Arc<dyn Clock>) -> Self {
        Self { history, clock }
    }

    pub fn diff(
        &self,
        slug: &str,
        current_vins: &[String],
        order_type: OrderType,
        test_mode: bool,
    ) -> VinDiff {
        match self.try_diff(slug, current_vins, order_type, test_mode) {
            Ok(diff) => diff,
            Err(e) => {
                log::error!(
                    "VIN comparison failed for {}: {}; treating all {} current VINs as new",
                    slug,
                    e,
                    current_vins.len()
                );
                VinDiff {
                    new_vins: current_vins.to_vec(),
                    removed_vins: Vec::new(),
                    order_number: None,
                    fallback: true,
                }
            }
        }
    }

    pub fn try_diff(
        &self,
        slug: &str,
        current_vins: &[String],
        order_type: OrderType,
        test_mode: bool,
    ) -> Result<VinDiff, OrderError> {
        let history = self.history.load(slug)?;

        let mut seen = HashSet::new();
        let current: Vec<&String> = current_vins
            .iter()
            .filter(|v| seen.insert(v.as_str()))
            .collect();

        let new_vins: Vec<String> = current
            .iter()
            .filter(|v| !history.contains(v.as_str()))
            .map(|v| v.to_string())
            .collect();

        let mut removed_vins: Vec<String> = history
            .iter()
            .filter(|v| !seen.contains(v.as_str()))
            .cloned()
            .collect();
        removed_vins.sort();

        log::info!(
            "{}: {} current, {} in history, {} new, {} removed",
            slug,
            current.len(),
            history.len(),
            new_vins.len(),
            removed_vins.len()
        );

        let order_number = if test_mode || new_vins.is_empty() {
            None
        } else {
            Some(self.record(slug, &new_vins, order_type)?.order_number)
        };

        Ok(VinDiff {
            new_vins,
            removed_vins,
            order_number,
            fallback: false,
        })
    }

    /// Allocates an order number and appends `vins` to history under it.
    pub fn record(
        &self,
        slug: &str,
        vins: &[String],
        order_type: OrderType,
    ) -> Result<RecordedVins, OrderError> {
        let order_date = self.clock.now().date();
        let order_number = self.order_number(slug, order_type, order_date);
        let inserted = self
            .history
            .record(slug, vins, order_type, &order_number, order_date)?;
        log::debug!("Recorded {} VINs for {} as {}", inserted, slug, order_number);
        Ok(RecordedVins {
            order_number,
            inserted,
        })
    }

    fn order_number(&self, slug: &str, order_type: OrderType, order_date: NaiveDate) -> String {
        match self.history.next_order_number(slug, order_type, order_date) {
            Ok(number) => number,
            Err(e) => {
                log::warn!("Order number sequence unavailable for {}: {}", slug, e);
                order_repo::format_order_number(slug, order_type, order_date, 1)
            }
        }
    }
}
