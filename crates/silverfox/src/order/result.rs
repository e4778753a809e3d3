use serde::Serialize;

use crate::model::OrderType;

use super::context::OrderContext;

/// Outcome of one order run, printed as JSON by the CLI.
///
/// CAO runs fill the inventory counts, LIST runs the request counts; the
/// other group is omitted from the JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub order_id: Option<i64>,
    pub order_number: Option<String>,
    pub dealership: String,
    pub order_type: OrderType,
    pub test_mode: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_vehicles: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_vehicles: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_vehicles: Option<usize>,
    /// Set when the VIN history could not be used and every VIN counted as new.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub history_fallback: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicles_requested: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicles_found: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicles_missing: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_vins: Vec<String>,

    pub qr_codes_generated: usize,
    pub export_folder: Option<String>,
    pub qr_folder: Option<String>,
    pub csv_file: Option<String>,
    pub vins: Vec<String>,
}

impl OrderResult {
    fn empty(dealership: &str, order_type: OrderType, test_mode: bool) -> Self {
        Self {
            success: false,
            error: None,
            order_id: None,
            order_number: None,
            dealership: dealership.to_string(),
            order_type,
            test_mode,
            total_vehicles: None,
            new_vehicles: None,
            removed_vehicles: None,
            history_fallback: false,
            vehicles_requested: None,
            vehicles_found: None,
            vehicles_missing: None,
            missing_vins: Vec::new(),
            qr_codes_generated: 0,
            export_folder: None,
            qr_folder: None,
            csv_file: None,
            vins: Vec::new(),
        }
    }

    pub fn failure(
        dealership: &str,
        order_type: OrderType,
        test_mode: bool,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::empty(dealership, order_type, test_mode)
        }
    }

    pub fn from_context(ctx: &OrderContext) -> Self {
        let mut result = Self::empty(&ctx.dealership.name, ctx.order_type, ctx.test_mode);
        result.success = true;
        result.order_id = ctx.order_id;
        result.order_number = ctx.order_number.clone();

        match ctx.order_type {
            OrderType::Cao => {
                result.total_vehicles = Some(ctx.inventory.len());
                result.new_vehicles = Some(ctx.vehicles.len());
                if let Some(diff) = &ctx.diff {
                    result.removed_vehicles = Some(diff.removed_vins.len());
                    result.history_fallback = diff.fallback;
                }
            }
            OrderType::List => {
                result.vehicles_requested = Some(ctx.requested_vins.len());
                result.vehicles_found = Some(ctx.vehicles.len());
                result.vehicles_missing = Some(ctx.missing_vins.len());
                result.missing_vins = ctx.missing_vins.clone();
            }
        }

        result.qr_codes_generated = ctx.qr_codes.len();
        if let Some(folders) = &ctx.folders {
            result.export_folder = Some(folders.export_dir.display().to_string());
            result.qr_folder = Some(folders.qr_dir.display().to_string());
        }
        result.csv_file = ctx.csv_path.as_ref().map(|p| p.display().to_string());
        result.vins = ctx.vins();
        result
    }
}
