//! Per-dealership VIN history for the `{slug}_vin_log` tables.
//!
//! Each table is append-only and keyed on VIN, so recording a VIN twice is a
//! no-op. Tables are created on first use; the slug is validated before it
//! is spliced into any statement.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::model::OrderType;
use crate::sanitize;

use super::{Database, DatabaseError};

/// One history row.
#[derive(Debug, Clone, PartialEq)]
pub struct VinLogEntry {
    pub vin: String,
    pub processed_date: String,
    pub order_type: String,
    pub order_number: Option<String>,
    pub order_date: String,
}

impl VinLogEntry {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            vin: row.get("vin")?,
            processed_date: row.get("processed_date")?,
            order_type: row.get("order_type")?,
            order_number: row.get("order_number")?,
            order_date: row.get("order_date")?,
        })
    }
}

/// Validated table name for a dealership slug.
pub fn table_name(slug: &str) -> Result<String, DatabaseError> {
    sanitize::vin_log_table(slug).ok_or_else(|| DatabaseError::InvalidIdentifier(slug.to_string()))
}

fn exists(conn: &Connection, table: &str) -> Result<bool, DatabaseError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Creates the dealership's history table if needed and returns its name.
pub fn ensure_table(db: &Database, slug: &str) -> Result<String, DatabaseError> {
    let table = table_name(slug)?;
    db.with_conn(|conn| {
        if !exists(conn, &table)? {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    vin TEXT PRIMARY KEY,
                    processed_date TEXT NOT NULL,
                    order_type TEXT NOT NULL,
                    order_number TEXT,
                    order_date TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                );"
            ))?;
            log::info!("Created VIN history table {}", table);
        }
        Ok(())
    })?;
    Ok(table)
}

pub fn table_exists(db: &Database, slug: &str) -> Result<bool, DatabaseError> {
    let table = table_name(slug)?;
    db.with_conn(|conn| exists(conn, &table))
}

/// All VINs in the dealership's history. Fails with `TableMissing` when the
/// table has not been created.
pub fn load_vins(db: &Database, slug: &str) -> Result<HashSet<String>, DatabaseError> {
    let table = table_name(slug)?;
    db.with_conn(|conn| {
        if !exists(conn, &table)? {
            return Err(DatabaseError::TableMissing { table: table.clone() });
        }
        let mut stmt = conn.prepare(&format!("SELECT vin FROM {}", table))?;
        let vins = stmt
            .query_map([], |r| r.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(vins)
    })
}

/// Records VINs with `ON CONFLICT(vin) DO NOTHING`. Returns the number of
/// rows actually inserted.
pub fn insert_vins(
    db: &Database,
    slug: &str,
    vins: &[String],
    order_type: OrderType,
    order_number: Option<&str>,
    order_date: NaiveDate,
) -> Result<usize, DatabaseError> {
    let table = table_name(slug)?;
    let processed_date = Utc::now().to_rfc3339();
    let order_date = order_date.format("%Y-%m-%d").to_string();

    db.with_conn(|conn| {
        if !exists(conn, &table)? {
            return Err(DatabaseError::TableMissing { table: table.clone() });
        }
        let tx = conn.unchecked_transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (vin, processed_date, order_type, order_number, order_date)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(vin) DO NOTHING",
                table
            ))?;
            for vin in vins {
                inserted += stmt.execute(params![
                    vin,
                    processed_date,
                    order_type.as_str(),
                    order_number,
                    order_date,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    })
}

pub fn find_entry(
    db: &Database,
    slug: &str,
    vin: &str,
) -> Result<Option<VinLogEntry>, DatabaseError> {
    let table = table_name(slug)?;
    db.with_conn(|conn| {
        if !exists(conn, &table)? {
            return Ok(None);
        }
        let entry = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE vin = ?1", table),
                params![vin],
                VinLogEntry::from_row,
            )
            .optional()?;
        Ok(entry)
    })
}

pub fn count(db: &Database, slug: &str) -> Result<u64, DatabaseError> {
    let table = table_name(slug)?;
    db.with_conn(|conn| {
        if !exists(conn, &table)? {
            return Ok(0);
        }
        let n: u64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| {
            r.get(0)
        })?;
        Ok(n)
    })
}
