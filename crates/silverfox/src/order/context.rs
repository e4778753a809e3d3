use std::path::PathBuf;

use chrono::NaiveDateTime;

use crate::config::DealershipConfig;
use crate::differ::VinDiff;
use crate::export::GeneratedQr;
use crate::model::{OrderType, Vehicle};
use crate::storage::BatchFolders;

pub struct OrderContext {
    // Input
    pub dealership: DealershipConfig,
    pub slug: String,
    pub order_type: OrderType,
    pub test_mode: bool,
    pub started_at: NaiveDateTime,

    // CAO: filtered active inventory and its diff against history
    pub inventory: Vec<Vehicle>,
    pub diff: Option<VinDiff>,

    // LIST: normalized request and the VINs with no stored vehicle
    pub requested_vins: Vec<String>,
    pub missing_vins: Vec<String>,

    // Vehicles that go into the order
    pub vehicles: Vec<Vehicle>,
    pub order_number: Option<String>,

    // Outputs, unset when there was nothing to export
    pub folders: Option<BatchFolders>,
    pub qr_codes: Vec<GeneratedQr>,
    pub csv_path: Option<PathBuf>,
    pub order_id: Option<i64>,
}

impl OrderContext {
    pub fn new(
        dealership: DealershipConfig,
        order_type: OrderType,
        test_mode: bool,
        started_at: NaiveDateTime,
    ) -> Self {
        let slug = dealership.slug();
        Self {
            dealership,
            slug,
            order_type,
            test_mode,
            started_at,
            inventory: Vec::new(),
            diff: None,
            requested_vins: Vec::new(),
            missing_vins: Vec::new(),
            vehicles: Vec::new(),
            order_number: None,
            folders: None,
            qr_codes: Vec::new(),
            csv_path: None,
            order_id: None,
        }
    }

    pub fn vins(&self) -> Vec<String> {
        self.vehicles.iter().map(|v| v.vin.clone()).collect()
    }
}
