//! Vehicle and order types shared by the import, order and export layers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// A single scraped vehicle listing.
///
/// This is both the shape scrapers drop into the import directory and the
/// content of a `raw_vehicle_data` row. Scrapers disagree on field names, so
/// the common spellings are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(default, deserialize_with = "lenient_required_text")]
    pub vin: String,
    #[serde(default, deserialize_with = "lenient_text", alias = "stock_number", alias = "stock_no")]
    pub stock: Option<String>,
    /// New / used / certified pre-owned, as reported by the dealer site.
    #[serde(
        default,
        deserialize_with = "lenient_text",
        rename = "type",
        alias = "vehicle_type",
        alias = "condition"
    )]
    pub vehicle_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub make: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub trim: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", alias = "exterior_color", alias = "color")]
    pub ext_color: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_money")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub body_style: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub fuel_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_money")]
    pub msrp: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date_in_stock: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", alias = "street_addr")]
    pub street_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub locality: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub postal_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub country: Option<String>,
    /// Dealership name the listing belongs to.
    #[serde(
        default,
        deserialize_with = "lenient_required_text",
        alias = "dealership",
        alias = "dealer_name"
    )]
    pub location: String,
    #[serde(default, deserialize_with = "lenient_text", alias = "url", alias = "vdp_url")]
    pub vehicle_url: Option<String>,
}

impl Vehicle {
    /// Listing URL, if present and non-blank.
    pub fn listing_url(&self) -> Option<&str> {
        self.vehicle_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}

/// A `raw_vehicle_data` row: the vehicle plus its batch bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleRow {
    pub id: i64,
    pub import_id: i64,
    pub is_archived: bool,
    pub created_at: String,
    pub vehicle: Vehicle,
}

/// How the vehicles of an order were selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// Comparative Analysis Order: current inventory diffed against history.
    Cao,
    /// An explicit, externally supplied VIN list.
    List,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Cao => "CAO",
            OrderType::List => "LIST",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CAO" => Ok(OrderType::Cao),
            "LIST" => Ok(OrderType::List),
            other => Err(format!("unknown order type '{}'", other)),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Int(i64),
    Float(f64),
    Text(String),
}

impl NumberOrText {
    fn into_text(self) -> String {
        match self {
            NumberOrText::Int(i) => i.to_string(),
            NumberOrText::Float(f) => f.to_string(),
            NumberOrText::Text(s) => s,
        }
    }
}

/// Scrapers emit stock numbers and postal codes as JSON numbers about as
/// often as strings; both are kept as text. `null` is a missing value.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<NumberOrText> = Option::deserialize(deserializer)?;
    Ok(value.map(NumberOrText::into_text))
}

/// Like `lenient_text`, with `null` read as blank. Blank VINs and
/// locations are skipped at import rather than failing the file.
fn lenient_required_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

/// Accepts `23995`, `23995.0`, `"$23,995"` and blanks.
fn lenient_money<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<NumberOrText> = Option::deserialize(deserializer)?;
    Ok(match value {
        None => None,
        Some(NumberOrText::Int(i)) => Some(i as f64),
        Some(NumberOrText::Float(f)) => Some(f),
        Some(NumberOrText::Text(s)) => parse_money(&s),
    })
}

fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<NumberOrText> = Option::deserialize(deserializer)?;
    Ok(match value {
        None => None,
        Some(NumberOrText::Int(i)) => i32::try_from(i).ok(),
        Some(NumberOrText::Float(f)) => Some(f as i32),
        Some(NumberOrText::Text(s)) => s.trim().parse().ok(),
    })
}

/// Parses a dealer-site price string. Unparseable text ("Call for price")
/// is treated as missing.
pub fn parse_money(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_aliases() {
        let json = r#"{
            "vin": "1HGCM82633A004352",
            "stock_number": "H1234",
            "vehicle_type": "Used",
            "year": "2021",
            "price": "$23,995",
            "msrp": 25000,
            "dealership": "Columbia Honda",
            "url": "https://example.com/vdp/1"
        }"#;
        let v: Vehicle = serde_json::from_str(json).unwrap();
        assert_eq!(v.stock.as_deref(), Some("H1234"));
        assert_eq!(v.vehicle_type.as_deref(), Some("Used"));
        assert_eq!(v.year, Some(2021));
        assert_eq!(v.price, Some(23995.0));
        assert_eq!(v.msrp, Some(25000.0));
        assert_eq!(v.location, "Columbia Honda");
        assert_eq!(v.listing_url(), Some("https://example.com/vdp/1"));
    }

    #[test]
    fn test_deserialize_minimal_record() {
        let v: Vehicle = serde_json::from_str(r#"{"vin": "X"}"#).unwrap();
        assert_eq!(v.vin, "X");
        assert!(v.price.is_none());
        assert!(v.location.is_empty());
    }

    #[test]
    fn test_deserialize_numeric_and_null_text() {
        let json = r#"{
            "vin": null,
            "stock": 12345,
            "postal_code": 65201,
            "model": 3,
            "trim": null,
            "location": "Columbia Honda"
        }"#;
        let v: Vehicle = serde_json::from_str(json).unwrap();
        assert!(v.vin.is_empty());
        assert_eq!(v.stock.as_deref(), Some("12345"));
        assert_eq!(v.postal_code.as_deref(), Some("65201"));
        assert_eq!(v.model.as_deref(), Some("3"));
        assert!(v.trim.is_none());
        assert_eq!(v.location, "Columbia Honda");
    }

    #[test]
    fn test_deserialize_missing_vin_is_blank() {
        let v: Vehicle = serde_json::from_str(r#"{"location": "Columbia Honda"}"#).unwrap();
        assert!(v.vin.is_empty());
    }

    #[test]
    fn test_parse_money() {
        assert_eq!(parse_money("$23,995"), Some(23995.0));
        assert_eq!(parse_money("19999.99"), Some(19999.99));
        assert_eq!(parse_money("Call for price"), None);
        assert_eq!(parse_money(""), None);
    }

    #[test]
    fn test_listing_url_blank_is_none() {
        let v = Vehicle {
            vehicle_url: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(v.listing_url().is_none());
    }

    #[test]
    fn test_order_type_round_trip_names() {
        assert_eq!(OrderType::Cao.as_str(), "CAO");
        assert_eq!("list".parse::<OrderType>().unwrap(), OrderType::List);
        assert!("bogus".parse::<OrderType>().is_err());
        assert_eq!(serde_json::to_string(&OrderType::Cao).unwrap(), "\"CAO\"");
    }
}
