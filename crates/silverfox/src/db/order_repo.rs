//! Order repository for `order_processing_jobs` and the order-number sequence.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use crate::model::OrderType;

use super::{Database, DatabaseError};

/// A stored order record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRecord {
    pub id: i64,
    pub dealership_name: String,
    pub job_type: String,
    pub order_number: Option<String>,
    pub vehicle_count: i64,
    pub qr_count: i64,
    pub export_file: Option<String>,
    pub qr_folder: Option<String>,
    pub status: String,
    pub created_at: String,
}

impl OrderRecord {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            dealership_name: row.get("dealership_name")?,
            job_type: row.get("job_type")?,
            order_number: row.get("order_number")?,
            vehicle_count: row.get("vehicle_count")?,
            qr_count: row.get("qr_count")?,
            export_file: row.get("export_file")?,
            qr_folder: row.get("qr_folder")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Fields of an order record at insert time.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub dealership_name: &'a str,
    pub order_type: OrderType,
    pub order_number: Option<&'a str>,
    pub vehicle_count: usize,
    pub qr_count: usize,
    pub export_file: Option<&'a str>,
    pub qr_folder: Option<&'a str>,
    pub created_at: &'a str,
}

/// Inserts a completed order and returns its id.
pub fn insert(db: &Database, order: &NewOrder<'_>) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO order_processing_jobs (dealership_name, job_type, order_number,
             vehicle_count, qr_count, export_file, qr_folder, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'completed', ?8)",
            params![
                order.dealership_name,
                order.order_type.as_str(),
                order.order_number,
                order.vehicle_count as i64,
                order.qr_count as i64,
                order.export_file,
                order.qr_folder,
                order.created_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

pub fn find_by_id(db: &Database, id: i64) -> Result<Option<OrderRecord>, DatabaseError> {
    db.with_conn(|conn| {
        let order = conn
            .query_row(
                "SELECT * FROM order_processing_jobs WHERE id = ?1",
                params![id],
                OrderRecord::from_row,
            )
            .optional()?;
        Ok(order)
    })
}

/// Most recent orders for a dealership first.
pub fn list_by_dealership(
    db: &Database,
    dealership_name: &str,
    limit: u32,
) -> Result<Vec<OrderRecord>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM order_processing_jobs WHERE dealership_name = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![dealership_name, limit], OrderRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// `{slug}_{TYPE}_{YYYYMMDD}_{NNN}`.
pub fn format_order_number(
    slug: &str,
    order_type: OrderType,
    date: NaiveDate,
    sequence: i64,
) -> String {
    format!(
        "{}_{}_{}_{:03}",
        slug,
        order_type.as_str(),
        date.format("%Y%m%d"),
        sequence
    )
}

/// Allocates the next order number for `(slug, type, date)`. Sequences
/// start at 1 each day.
pub fn next_order_number(
    db: &Database,
    slug: &str,
    order_type: OrderType,
    date: NaiveDate,
) -> Result<String, DatabaseError> {
    let day = date.format("%Y-%m-%d").to_string();
    let sequence: i64 = db.with_conn(|conn| {
        Ok(conn.query_row(
            "INSERT INTO order_sequences (slug, order_type, order_date, last_sequence)
             VALUES (?1, ?2, ?3, 1)
             ON CONFLICT(slug, order_type, order_date)
             DO UPDATE SET last_sequence = last_sequence + 1
             RETURNING last_sequence",
            params![slug, order_type.as_str(), day],
            |r| r.get(0),
        )?)
    })?;
    Ok(format_order_number(slug, order_type, date, sequence))
}
