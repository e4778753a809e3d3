//! Database migration system.
//!
//! Tracks applied migrations in a `_migrations` table and applies
//! pending ones in order.
//!
//! Per-dealership `{slug}_vin_log` tables are not migrations; they are
//! created lazily by `vin_log_repo::ensure_table`.

use rusqlite::Connection;

use super::error::DatabaseError;

/// A single migration definition.
struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// All migrations in order. Each is applied at most once.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_imports_table",
        sql: include_str!("sql/001_create_imports.sql"),
    },
    Migration {
        version: 2,
        description: "create_raw_vehicle_data_table",
        sql: include_str!("sql/002_create_raw_vehicle_data.sql"),
    },
    Migration {
        version: 3,
        description: "create_dealership_configs_table",
        sql: include_str!("sql/003_create_dealership_configs.sql"),
    },
    Migration {
        version: 4,
        description: "create_order_processing_jobs_table",
        sql: include_str!("sql/004_create_order_processing_jobs.sql"),
    },
    Migration {
        version: 5,
        description: "create_order_sequences_table",
        sql: include_str!("sql/005_create_order_sequences.sql"),
    },
];

const BOOKKEEPING: &str = "CREATE TABLE IF NOT EXISTS _migrations (
    version INTEGER PRIMARY KEY,
    description TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);";

/// Highest applied migration version, 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> Result<u32, DatabaseError> {
    conn.execute_batch(BOOKKEEPING)?;
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;
    Ok(version)
}

/// Applies every migration newer than the recorded schema version. Each
/// migration and its `_migrations` row commit together.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    let applied = schema_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > applied).collect();
    if pending.is_empty() {
        log::debug!("Schema up to date at v{}", applied);
        return Ok(());
    }

    for migration in pending {
        apply(conn, migration)?;
    }
    Ok(())
}

fn apply(conn: &Connection, migration: &Migration) -> Result<(), DatabaseError> {
    let failed = |e: rusqlite::Error| DatabaseError::Migration {
        version: migration.version,
        reason: e.to_string(),
    };

    log::info!("Applying migration v{}: {}", migration.version, migration.description);
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(migration.sql).map_err(failed)?;
    tx.execute(
        "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
        rusqlite::params![migration.version, migration.description],
    )
    .map_err(failed)?;
    tx.commit()?;
    Ok(())
}
