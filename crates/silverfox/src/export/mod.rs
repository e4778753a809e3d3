//! Order artifacts: QR images and the print-shop CSV.

pub mod csv;
pub mod qr;

pub use self::csv::{CsvExporter, CSV_HEADERS};
pub use self::qr::{GeneratedQr, QrGenerator, DEFAULT_QR_SIZE};
