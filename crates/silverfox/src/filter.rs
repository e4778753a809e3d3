//! Filter composer: turns a dealership's declarative filtering rules into a
//! parameterized SQL predicate over `raw_vehicle_data`.
//!
//! Column names come from the closed [`Column`] enum and every value is a
//! bound parameter, so nothing user-supplied is ever spliced into the SQL.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

/// Vehicle condition flags a dealership can order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    New,
    Cpo,
    Used,
    Po,
}

impl VehicleType {
    /// Lower-cased `type` values this flag matches.
    pub fn type_values(&self) -> &'static [&'static str] {
        match self {
            VehicleType::New => &["new"],
            VehicleType::Cpo => &["certified pre-owned", "certified", "cpo"],
            VehicleType::Used => &["used"],
            VehicleType::Po => &["pre-owned", "po"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::New => "new",
            VehicleType::Cpo => "cpo",
            VehicleType::Used => "used",
            VehicleType::Po => "po",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(VehicleType::New),
            "cpo" | "certified" => Ok(VehicleType::Cpo),
            "used" => Ok(VehicleType::Used),
            "po" | "pre-owned" => Ok(VehicleType::Po),
            other => Err(format!("unknown vehicle type '{}'", other)),
        }
    }
}

/// Declarative filtering rules stored per dealership.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterRules {
    #[serde(default)]
    pub exclude_missing_stock: bool,
    /// Takes precedence over `exclude_status` when non-empty.
    #[serde(default)]
    pub require_status: Vec<String>,
    #[serde(default)]
    pub exclude_status: Vec<String>,
    #[serde(default)]
    pub exclude_missing_price: bool,
    #[serde(default)]
    pub vehicle_types: Vec<VehicleType>,
}

/// Columns of `raw_vehicle_data` a predicate may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Vin,
    Stock,
    VehicleType,
    Status,
    Price,
    Location,
    ImportId,
    IsArchived,
}

impl Column {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Column::Vin => "vin",
            Column::Stock => "stock",
            Column::VehicleType => "type",
            Column::Status => "status",
            Column::Price => "price",
            Column::Location => "location",
            Column::ImportId => "import_id",
            Column::IsArchived => "is_archived",
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Column::Price | Column::ImportId | Column::IsArchived)
    }
}

/// Predicate tree evaluated by [`Predicate::to_sql`].
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    True,
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Eq(Column, Value),
    /// Case-insensitive membership.
    In(Column, Vec<String>),
    /// Case-insensitive non-membership; NULL values pass.
    NotIn(Column, Vec<String>),
    /// Text: non-NULL and non-blank. Numeric: non-NULL and positive.
    IsPresent(Column),
}

impl Predicate {
    /// Conjunction that drops `True` members and collapses trivial cases.
    pub fn and(parts: Vec<Predicate>) -> Predicate {
        let mut parts: Vec<Predicate> = parts
            .into_iter()
            .filter(|p| !matches!(p, Predicate::True))
            .collect();
        match parts.len() {
            0 => Predicate::True,
            1 => parts.remove(0),
            _ => Predicate::And(parts),
        }
    }

    pub fn or(parts: Vec<Predicate>) -> Predicate {
        if parts.iter().any(|p| matches!(p, Predicate::True)) || parts.is_empty() {
            return Predicate::True;
        }
        let mut parts = parts;
        if parts.len() == 1 {
            return parts.remove(0);
        }
        Predicate::Or(parts)
    }

    /// Renders the predicate into SQL with anonymous `?` placeholders.
    pub fn to_sql(&self) -> SqlFragment {
        let mut fragment = SqlFragment::default();
        self.render(&mut fragment);
        fragment
    }

    fn render(&self, out: &mut SqlFragment) {
        match self {
            Predicate::True => out.sql.push_str("TRUE"),
            Predicate::And(parts) => render_joined(parts, " AND ", "TRUE", out),
            Predicate::Or(parts) => render_joined(parts, " OR ", "FALSE", out),
            Predicate::Eq(column, value) => {
                out.sql.push_str(column.as_sql());
                out.sql.push_str(" = ?");
                out.params.push(value.clone());
            }
            Predicate::In(column, values) => {
                if values.is_empty() {
                    out.sql.push_str("FALSE");
                    return;
                }
                let open = format!("LOWER(TRIM({})) IN (", column.as_sql());
                out.sql.push_str(&open);
                push_placeholders(values, out);
                out.sql.push(')');
            }
            Predicate::NotIn(column, values) => {
                if values.is_empty() {
                    out.sql.push_str("TRUE");
                    return;
                }
                let col = column.as_sql();
                let open = format!("({} IS NULL OR LOWER(TRIM({})) NOT IN (", col, col);
                out.sql.push_str(&open);
                push_placeholders(values, out);
                out.sql.push_str("))");
            }
            Predicate::IsPresent(column) => {
                let col = column.as_sql();
                let clause = if column.is_numeric() {
                    format!("({} IS NOT NULL AND {} > 0)", col, col)
                } else {
                    format!("({} IS NOT NULL AND TRIM({}) <> '')", col, col)
                };
                out.sql.push_str(&clause);
            }
        }
    }
}

fn render_joined(parts: &[Predicate], sep: &str, empty: &str, out: &mut SqlFragment) {
    if parts.is_empty() {
        out.sql.push_str(empty);
        return;
    }
    out.sql.push('(');
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.sql.push_str(sep);
        }
        part.render(out);
    }
    out.sql.push(')');
}

fn push_placeholders(values: &[String], out: &mut SqlFragment) {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.sql.push_str(", ");
        }
        out.sql.push('?');
        out.params.push(Value::Text(value.trim().to_lowercase()));
    }
}

/// A rendered WHERE-clause fragment and its bound parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Predicate for the dealership's rules alone. An empty rule set yields
/// `Predicate::True`.
pub fn rule_predicate(rules: &FilterRules) -> Predicate {
    let mut parts = Vec::new();

    if rules.exclude_missing_stock {
        parts.push(Predicate::IsPresent(Column::Stock));
    }

    if !rules.require_status.is_empty() {
        parts.push(Predicate::In(Column::Status, rules.require_status.clone()));
    } else if !rules.exclude_status.is_empty() {
        let excluded = rules.exclude_status.clone();
        parts.push(Predicate::NotIn(Column::Status, excluded));
    }

    if rules.exclude_missing_price {
        parts.push(Predicate::IsPresent(Column::Price));
    }

    if !rules.vehicle_types.is_empty() {
        let branches = rules
            .vehicle_types
            .iter()
            .map(|t| {
                Predicate::In(
                    Column::VehicleType,
                    t.type_values().iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect();
        parts.push(Predicate::or(branches));
    }

    Predicate::and(parts)
}

/// Full inventory predicate: the given import batch, non-archived rows, the
/// dealership's location, and its rules.
pub fn compose(rules: &FilterRules, location: &str, import_id: i64) -> Predicate {
    Predicate::and(vec![
        Predicate::Eq(Column::ImportId, Value::Integer(import_id)),
        Predicate::Eq(Column::IsArchived, Value::Integer(0)),
        Predicate::Eq(Column::Location, Value::Text(location.to_string())),
        rule_predicate(rules),
    ])
}
