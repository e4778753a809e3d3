use std::path::{Path, PathBuf};

use image::{GrayImage, ImageFormat, Luma};
use qrcode::{Color, EcLevel, QrCode};

use crate::error::ExportError;
use crate::model::Vehicle;

/// Modules of light border around the symbol.
const QUIET_ZONE: usize = 4;

pub const DEFAULT_QR_SIZE: u32 = 388;

/// A QR image written for one vehicle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQr {
    pub vin: String,
    pub path: PathBuf,
}

pub struct QrGenerator {
    size: u32,
}

impl Default for QrGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_QR_SIZE)
    }
}

impl QrGenerator {
    pub fn new(size: u32) -> Self {
        Self { size }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Renders `data` as a `size`×`size` greyscale image, ECC level M.
    pub fn render(&self, data: &str) -> Result<GrayImage, qrcode::types::QrError> {
        let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)?;
        let modules = code.width();
        let colors = code.to_colors();
        let total = modules + 2 * QUIET_ZONE;
        let size = self.size as usize;

        Ok(GrayImage::from_fn(self.size, self.size, |x, y| {
            let mx = x as usize * total / size;
            let my = y as usize * total / size;
            let inside = (QUIET_ZONE..QUIET_ZONE + modules).contains(&mx)
                && (QUIET_ZONE..QUIET_ZONE + modules).contains(&my);
            let dark = inside
                && colors[(my - QUIET_ZONE) * modules + (mx - QUIET_ZONE)] == Color::Dark;
            Luma([if dark { 0 } else { 255 }])
        }))
    }

    /// Renders one vehicle's listing URL to `path`.
    pub fn write(&self, vehicle: &Vehicle, url: &str, path: &Path) -> Result<(), ExportError> {
        let image = self.render(url).map_err(|e| ExportError::QrEncode {
            vin: vehicle.vin.clone(),
            reason: e.to_string(),
        })?;
        image
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| ExportError::WriteImage {
                path: path.to_path_buf(),
                source: e,
            })
    }

    /// Writes `{prefix}_QR_Code_{n}.png` into `dir` for every vehicle with a
    /// listing URL, `n` being the vehicle's 1-based position in `vehicles`.
    /// Vehicles without a URL and per-vehicle failures are skipped.
    pub fn generate(&self, vehicles: &[Vehicle], dir: &Path, prefix: &str) -> Vec<GeneratedQr> {
        let _span = tracing::info_span!("qr.generate", count = vehicles.len()).entered();
        let mut generated = Vec::new();

        for (index, vehicle) in vehicles.iter().enumerate() {
            let Some(url) = vehicle.listing_url() else {
                log::debug!("No listing URL for {}, skipping QR", vehicle.vin);
                continue;
            };

            let path = dir.join(format!("{}_QR_Code_{}.png", prefix, index + 1));
            match self.write(vehicle, url, &path) {
                Ok(()) => generated.push(GeneratedQr {
                    vin: vehicle.vin.clone(),
                    path,
                }),
                Err(e) => log::warn!("QR generation failed: {}", e),
            }
        }

        log::info!(
            "Generated {} QR codes for {} vehicles",
            generated.len(),
            vehicles.len()
        );
        generated
    }
}
