//! Vehicle repository for the `raw_vehicle_data` table.

use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use crate::filter::Predicate;
use crate::model::{Vehicle, VehicleRow};

use super::{Database, DatabaseError};

impl VehicleRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            import_id: row.get("import_id")?,
            is_archived: row.get::<_, i64>("is_archived")? != 0,
            created_at: row.get("created_at")?,
            vehicle: Vehicle {
                vin: row.get("vin")?,
                stock: row.get("stock")?,
                vehicle_type: row.get("type")?,
                year: row.get("year")?,
                make: row.get("make")?,
                model: row.get("model")?,
                trim: row.get("trim")?,
                ext_color: row.get("ext_color")?,
                status: row.get("status")?,
                price: row.get("price")?,
                body_style: row.get("body_style")?,
                fuel_type: row.get("fuel_type")?,
                msrp: row.get("msrp")?,
                date_in_stock: row.get("date_in_stock")?,
                street_address: row.get("street_address")?,
                locality: row.get("locality")?,
                postal_code: row.get("postal_code")?,
                region: row.get("region")?,
                country: row.get("country")?,
                location: row.get("location")?,
                vehicle_url: row.get("vehicle_url")?,
            },
        })
    }
}

/// Inserts all vehicles into `import_id` in one transaction. Returns the
/// number of rows written.
pub fn insert_many(
    db: &Database,
    import_id: i64,
    vehicles: &[Vehicle],
) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO raw_vehicle_data (vin, stock, type, year, make, model, trim,
                 ext_color, status, price, body_style, fuel_type, msrp, date_in_stock,
                 street_address, locality, postal_code, region, country, location,
                 vehicle_url, import_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                 ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
            )?;
            for v in vehicles {
                stmt.execute(params![
                    v.vin,
                    v.stock,
                    v.vehicle_type,
                    v.year,
                    v.make,
                    v.model,
                    v.trim,
                    v.ext_color,
                    v.status,
                    v.price,
                    v.body_style,
                    v.fuel_type,
                    v.msrp,
                    v.date_in_stock,
                    v.street_address,
                    v.locality,
                    v.postal_code,
                    v.region,
                    v.country,
                    v.location,
                    v.vehicle_url,
                    import_id,
                ])?;
            }
        }
        tx.commit()?;
        Ok(vehicles.len())
    })
}

/// Returns every row matching `predicate`, in insertion order.
pub fn query_filtered(
    db: &Database,
    predicate: &Predicate,
) -> Result<Vec<VehicleRow>, DatabaseError> {
    let fragment = predicate.to_sql();
    let sql = format!(
        "SELECT * FROM raw_vehicle_data WHERE {} ORDER BY id",
        fragment.sql
    );
    log::debug!("Inventory query: {} ({} params)", sql, fragment.params.len());

    db.with_conn(|conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(fragment.params.iter()), VehicleRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Most recent row for a VIN at a dealership, from any batch.
pub fn find_latest_by_vin(
    db: &Database,
    vin: &str,
    location: &str,
) -> Result<Option<VehicleRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM raw_vehicle_data WHERE vin = ?1 AND location = ?2
                 ORDER BY import_id DESC, id DESC LIMIT 1",
                params![vin, location],
                VehicleRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

pub fn count_by_import(db: &Database, import_id: i64) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM raw_vehicle_data WHERE import_id = ?1",
            params![import_id],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
