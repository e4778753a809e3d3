use std::path::PathBuf;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::filter::FilterRules;
use crate::sanitize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default = "default_output_directory")]
    pub output_directory: String,
    #[serde(default = "default_import_directory")]
    pub import_directory: String,
    #[serde(default)]
    pub qr: QrConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub dealerships: Vec<DealershipConfig>,
}

fn default_output_directory() -> String {
    "output".to_string()
}

fn default_import_directory() -> String {
    "imports".to_string()
}

impl Config {
    /// Configured database path, or `~/.silverfox/data/silverfox.db`.
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .as_ref()
            .map(PathBuf::from)
            .or_else(crate::db::default_database_path)
            .unwrap_or_else(|| PathBuf::from("silverfox.db"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrConfig {
    /// Edge length of the rendered PNG in pixels.
    #[serde(default = "default_qr_size")]
    pub size: u32,
}

fn default_qr_size() -> u32 {
    388
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            size: default_qr_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Daily import time, `HH:MM` local.
    #[serde(default = "default_import_at")]
    pub import_at: String,
    /// Daily CAO processing time, `HH:MM` local.
    #[serde(default = "default_cao_at")]
    pub cao_at: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_import_at() -> String {
    "04:00".to_string()
}

fn default_cao_at() -> String {
    "08:00".to_string()
}

fn default_poll_interval() -> u64 {
    60
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            import_at: default_import_at(),
            cao_at: default_cao_at(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

/// Parses an `HH:MM` wall-clock time.
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// Per-dealership processing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealershipConfig {
    pub name: String,
    /// Value of the `location` column for this dealership's vehicles.
    /// Defaults to `name`.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub filtering_rules: FilterRules,
    #[serde(default)]
    pub output_rules: OutputRules,
    /// Overrides the global output directory for this dealership's orders.
    #[serde(default)]
    pub qr_output_path: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl DealershipConfig {
    /// Config used when a dealership has no stored configuration.
    pub fn fallback(name: &str) -> Self {
        Self {
            name: name.to_string(),
            location: None,
            filtering_rules: FilterRules::default(),
            output_rules: OutputRules::default(),
            qr_output_path: None,
            active: true,
        }
    }

    pub fn slug(&self) -> String {
        sanitize::slugify(&self.name)
    }

    pub fn location(&self) -> &str {
        self.location.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRules {
    /// When false only the CSV is produced and its QR column stays empty.
    #[serde(default = "default_true")]
    pub generate_qr: bool,
}

impl Default for OutputRules {
    fn default() -> Self {
        Self { generate_qr: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dealership_defaults() {
        let d: DealershipConfig = serde_json::from_str(r#"{"name": "Columbia Honda"}"#).unwrap();
        assert!(d.active);
        assert!(d.output_rules.generate_qr);
        assert_eq!(d.location(), "Columbia Honda");
        assert_eq!(d.slug(), "columbia_honda");
        assert_eq!(d.filtering_rules, FilterRules::default());
    }

    #[test]
    fn test_location_override() {
        let d: DealershipConfig = serde_json::from_str(
            r#"{"name": "BMW of West St. Louis", "location": "BMW West STL"}"#,
        )
        .unwrap();
        assert_eq!(d.location(), "BMW West STL");
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(
            parse_time_of_day("04:00"),
            NaiveTime::from_hms_opt(4, 0, 0)
        );
        assert!(parse_time_of_day("25:00").is_none());
        assert!(parse_time_of_day("4am").is_none());
    }

    #[test]
    fn test_schedule_defaults() {
        let s = ScheduleConfig::default();
        assert_eq!(s.import_at, "04:00");
        assert_eq!(s.cao_at, "08:00");
        assert_eq!(s.poll_interval_secs, 60);
    }
}
