//! Dealership configuration repository for the `dealership_configs` table.
//!
//! Rule sets are stored as JSON text so new rule fields do not need a
//! migration.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::config::DealershipConfig;

use super::{Database, DatabaseError};

struct DealershipRow {
    name: String,
    location: String,
    filtering_rules: String,
    output_rules: String,
    qr_output_path: Option<String>,
    is_active: bool,
}

impl DealershipRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            name: row.get("name")?,
            location: row.get("location")?,
            filtering_rules: row.get("filtering_rules")?,
            output_rules: row.get("output_rules")?,
            qr_output_path: row.get("qr_output_path")?,
            is_active: row.get::<_, i64>("is_active")? != 0,
        })
    }

    fn into_config(self) -> Result<DealershipConfig, DatabaseError> {
        let location = (self.location != self.name).then_some(self.location);
        Ok(DealershipConfig {
            name: self.name,
            location,
            filtering_rules: serde_json::from_str(&self.filtering_rules)?,
            output_rules: serde_json::from_str(&self.output_rules)?,
            qr_output_path: self.qr_output_path,
            active: self.is_active,
        })
    }
}

/// Inserts or replaces the stored config for `config.name`.
pub fn upsert(db: &Database, config: &DealershipConfig) -> Result<(), DatabaseError> {
    db.with_conn(|conn| write_config(conn, config))
}

fn write_config(conn: &Connection, config: &DealershipConfig) -> Result<(), DatabaseError> {
    let filtering_rules = serde_json::to_string(&config.filtering_rules)?;
    let output_rules = serde_json::to_string(&config.output_rules)?;
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO dealership_configs (name, slug, location, filtering_rules,
         output_rules, qr_output_path, is_active, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(name) DO UPDATE SET
           slug = excluded.slug,
           location = excluded.location,
           filtering_rules = excluded.filtering_rules,
           output_rules = excluded.output_rules,
           qr_output_path = excluded.qr_output_path,
           is_active = excluded.is_active,
           updated_at = excluded.updated_at",
        params![
            config.name,
            config.slug(),
            config.location(),
            filtering_rules,
            output_rules,
            config.qr_output_path,
            config.active as i64,
            now,
        ],
    )?;
    Ok(())
}

pub fn find_by_name(db: &Database, name: &str) -> Result<Option<DealershipConfig>, DatabaseError> {
    let row = db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM dealership_configs WHERE name = ?1",
                params![name],
                DealershipRow::from_row,
            )
            .optional()?)
    })?;
    row.map(DealershipRow::into_config).transpose()
}

/// The stored config whose slug is `slug`, whatever its name.
pub fn find_by_slug(db: &Database, slug: &str) -> Result<Option<DealershipConfig>, DatabaseError> {
    let row = db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM dealership_configs WHERE slug = ?1",
                params![slug],
                DealershipRow::from_row,
            )
            .optional()?)
    })?;
    row.map(DealershipRow::into_config).transpose()
}

/// Active dealerships ordered by name.
pub fn list_active(db: &Database) -> Result<Vec<DealershipConfig>, DatabaseError> {
    let rows = db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM dealership_configs WHERE is_active = 1 ORDER BY name",
        )?;
        let rows = stmt
            .query_map([], DealershipRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })?;
    rows.into_iter().map(DealershipRow::into_config).collect()
}

/// Upserts every configured dealership in one transaction. A stored row
/// whose slug now belongs to a differently named config (a rename such as
/// "Columbia Honda" to "Columbia-Honda") is replaced, so the VIN log keyed
/// by that slug carries over. Other stored dealerships are left as they are.
pub fn sync_from_config(
    db: &Database,
    configs: &[DealershipConfig],
) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        for config in configs {
            let replaced = tx.execute(
                "DELETE FROM dealership_configs WHERE slug = ?1 AND name <> ?2",
                params![config.slug(), config.name],
            )?;
            if replaced > 0 {
                log::info!(
                    "Dealership '{}' replaces a stored config with slug '{}'",
                    config.name,
                    config.slug()
                );
            }
            write_config(&tx, config)?;
        }
        tx.commit()?;
        Ok(())
    })?;
    log::debug!("Synced {} dealership configs", configs.len());
    Ok(configs.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterRules, VehicleType};

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn honda() -> DealershipConfig {
        DealershipConfig {
            filtering_rules: FilterRules {
                vehicle_types: vec![VehicleType::Used],
                exclude_missing_stock: true,
                ..Default::default()
            },
            ..DealershipConfig::fallback("Columbia Honda")
        }
    }

    #[test]
    fn test_upsert_and_find() {
        let db = test_db();
        upsert(&db, &honda()).unwrap();

        let found = find_by_name(&db, "Columbia Honda").unwrap().unwrap();
        assert_eq!(found, honda());
        assert!(find_by_name(&db, "Nobody Motors").unwrap().is_none());
    }

    #[test]
    fn test_upsert_replaces_rules() {
        let db = test_db();
        upsert(&db, &honda()).unwrap();

        let mut updated = honda();
        updated.filtering_rules.vehicle_types = vec![VehicleType::New];
        updated.location = Some("Columbia Honda Lot 2".to_string());
        upsert(&db, &updated).unwrap();

        let found = find_by_name(&db, "Columbia Honda").unwrap().unwrap();
        assert_eq!(found.filtering_rules.vehicle_types, vec![VehicleType::New]);
        assert_eq!(found.location(), "Columbia Honda Lot 2");
    }

    #[test]
    fn test_find_by_slug() {
        let db = test_db();
        upsert(&db, &honda()).unwrap();

        let found = find_by_slug(&db, "columbia_honda").unwrap().unwrap();
        assert_eq!(found.name, "Columbia Honda");
        assert!(find_by_slug(&db, "nobody_motors").unwrap().is_none());
    }

    #[test]
    fn test_list_active_skips_inactive() {
        let db = test_db();
        upsert(&db, &honda()).unwrap();
        let mut bmw = DealershipConfig::fallback("BMW of West St. Louis");
        bmw.active = false;
        upsert(&db, &bmw).unwrap();

        let active = list_active(&db).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Columbia Honda");
    }

    #[test]
    fn test_sync_from_config() {
        let db = test_db();
        let configs = vec![honda(), DealershipConfig::fallback("BMW of West St. Louis")];
        assert_eq!(sync_from_config(&db, &configs).unwrap(), 2);
        assert_eq!(list_active(&db).unwrap().len(), 2);

        // Re-syncing is an update, not a duplicate.
        sync_from_config(&db, &configs).unwrap();
        assert_eq!(list_active(&db).unwrap().len(), 2);
    }

    #[test]
    fn test_sync_renamed_dealership_with_same_slug() {
        let db = test_db();
        sync_from_config(&db, &[honda()]).unwrap();

        let renamed = DealershipConfig {
            name: "Columbia-Honda".to_string(),
            ..honda()
        };
        assert_eq!(renamed.slug(), honda().slug());
        sync_from_config(&db, &[renamed.clone()]).unwrap();

        assert!(find_by_name(&db, "Columbia Honda").unwrap().is_none());
        let found = find_by_name(&db, "Columbia-Honda").unwrap().unwrap();
        assert_eq!(found, renamed);
        assert_eq!(list_active(&db).unwrap().len(), 1);

        // Syncing the renamed config again is stable.
        sync_from_config(&db, &[renamed]).unwrap();
        assert_eq!(list_active(&db).unwrap().len(), 1);
    }
}
