//! Helpers for turning dealership names and scraped values into safe
//! identifiers, and for keeping full paths out of log lines.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

static RE_NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Lower-cases a dealership name and collapses every run of
/// non-alphanumeric characters into a single underscore.
///
/// - `Columbia Honda` → `columbia_honda`
/// - `BMW of West St. Louis` → `bmw_of_west_st_louis`
/// - `  Dave Sinclair Lincoln (South) ` → `dave_sinclair_lincoln_south`
pub fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    RE_NON_ALNUM
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string()
}

/// Returns true when `ident` can be interpolated into SQL as a table name.
pub fn validate_identifier(ident: &str) -> bool {
    !ident.is_empty()
        && ident.len() <= 63
        && ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !ident.starts_with(|c: char| c.is_ascii_digit())
}

/// Name of the per-dealership VIN history table, or `None` when the slug
/// cannot form a valid identifier.
pub fn vin_log_table(slug: &str) -> Option<String> {
    if slug.is_empty() {
        return None;
    }
    let table = format!("{}_vin_log", slug);
    validate_identifier(&table).then_some(table)
}

/// Trims and upper-cases a VIN. Returns `None` for blank input.
pub fn normalize_vin(raw: &str) -> Option<String> {
    let vin = raw.trim().to_uppercase();
    (!vin.is_empty()).then_some(vin)
}

/// 17 alphanumeric characters, none of which are I, O or Q.
pub fn is_plausible_vin(vin: &str) -> bool {
    vin.len() == 17
        && vin
            .chars()
            .all(|c| c.is_ascii_alphanumeric() && !matches!(c, 'I' | 'O' | 'Q' | 'i' | 'o' | 'q'))
}

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}
