pub mod config;
pub mod db;
pub mod differ;
pub mod error;
pub mod export;
pub mod filter;
pub mod import;
pub mod model;
pub mod order;
pub mod sanitize;
pub mod schedule;
pub mod storage;

pub use config::{load_config, Config, DealershipConfig};
pub use db::{Database, DatabaseError};
pub use differ::{SqliteVinHistory, VinDiff, VinDiffer, VinHistory};
pub use error::{
    ConfigError, ExportError, ImportError, OrderError, Result, SilverFoxError, StorageError,
};
pub use export::{CsvExporter, GeneratedQr, QrGenerator};
pub use filter::{FilterRules, VehicleType};
pub use import::{ImportManager, ImportSummary};
pub use model::{OrderType, Vehicle};
pub use order::{LogProgress, OrderProcessor, OrderResult};
pub use schedule::{Clock, ManualClock, Scheduler, SystemClock};
