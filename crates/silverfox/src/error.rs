use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SilverFoxError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid dealership '{name}': {reason}")]
    InvalidDealership { name: String, reason: String },

    #[error("Invalid schedule time '{value}': expected HH:MM")]
    InvalidTime { value: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move file from '{from}' to '{to}': {source}")]
    MoveFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory already exists: {0}")]
    DirectoryExists(PathBuf),

    #[error("File already exists: {0}")]
    FileExists(PathBuf),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to encode QR code for VIN {vin}: {reason}")]
    QrEncode { vin: String, reason: String },

    #[error("Failed to write image '{path}': {source}")]
    WriteImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write CSV '{path}': {source}")]
    WriteCsv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to flush CSV '{path}': {source}")]
    FlushCsv {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to read import file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse import file '{path}': {source}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No vehicles with a VIN found in {files} file(s)")]
    Empty { files: usize },

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

/// Failure kinds of the order pipeline.
#[derive(Error, Debug)]
pub enum OrderError {
    #[error("No active import found")]
    NoActiveImport,

    #[error("VIN history table '{table}' does not exist")]
    HistoryTableMissing { table: String },

    #[error("Invalid dealership name '{0}'")]
    InvalidDealership(String),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

pub type Result<T> = std::result::Result<T, SilverFoxError>;
