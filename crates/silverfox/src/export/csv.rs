use std::collections::HashMap;
use std::path::Path;

use crate::error::ExportError;
use crate::model::Vehicle;

use super::qr::GeneratedQr;

pub const CSV_HEADERS: [&str; 22] = [
    "VIN",
    "Stock",
    "Type",
    "Year",
    "Make",
    "Model",
    "Trim",
    "Ext Color",
    "Status",
    "Price",
    "Body Style",
    "Fuel Type",
    "MSRP",
    "Date In Stock",
    "Street Address",
    "Locality",
    "Postal Code",
    "Region",
    "Country",
    "Location",
    "Vehicle URL",
    "QR_Code_Path",
];

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn number<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn row(vehicle: &Vehicle, qr_path: Option<&Path>) -> Vec<String> {
    vec![
        vehicle.vin.clone(),
        text(&vehicle.stock),
        text(&vehicle.vehicle_type),
        number(vehicle.year),
        text(&vehicle.make),
        text(&vehicle.model),
        text(&vehicle.trim),
        text(&vehicle.ext_color),
        text(&vehicle.status),
        number(vehicle.price),
        text(&vehicle.body_style),
        text(&vehicle.fuel_type),
        number(vehicle.msrp),
        text(&vehicle.date_in_stock),
        text(&vehicle.street_address),
        text(&vehicle.locality),
        text(&vehicle.postal_code),
        text(&vehicle.region),
        text(&vehicle.country),
        vehicle.location.clone(),
        text(&vehicle.vehicle_url),
        qr_path.map(|p| p.display().to_string()).unwrap_or_default(),
    ]
}

/// Writes order CSVs for the print shop.
pub struct CsvExporter;

impl CsvExporter {
    /// One row per vehicle. The QR column is looked up by VIN and left empty
    /// for vehicles without an image. Returns the number of data rows.
    pub fn write(
        path: &Path,
        vehicles: &[Vehicle],
        qr_codes: &[GeneratedQr],
    ) -> Result<usize, ExportError> {
        let qr_by_vin: HashMap<&str, &Path> = qr_codes
            .iter()
            .map(|qr| (qr.vin.as_str(), qr.path.as_path()))
            .collect();

        let csv_error = |e: csv::Error| ExportError::WriteCsv {
            path: path.to_path_buf(),
            source: e,
        };

        let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
        writer.write_record(CSV_HEADERS).map_err(csv_error)?;
        for vehicle in vehicles {
            let qr_path = qr_by_vin.get(vehicle.vin.as_str()).copied();
            writer
                .write_record(row(vehicle, qr_path))
                .map_err(csv_error)?;
        }
        writer.flush().map_err(|e| ExportError::FlushCsv {
            path: path.to_path_buf(),
            source: e,
        })?;

        log::info!("Wrote {} rows to {}", vehicles.len(), path.display());
        Ok(vehicles.len())
    }
}
