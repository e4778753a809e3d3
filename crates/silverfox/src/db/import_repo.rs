//! Import batch repository for the `imports` table.
//!
//! Exactly one batch is active at a time. Activating a batch archives the
//! vehicle rows of every other batch.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// One scrape/import batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportBatch {
    pub import_id: i64,
    pub import_date: String,
    pub source: Option<String>,
    pub vehicle_count: i64,
    pub is_active: bool,
    pub created_at: String,
}

impl ImportBatch {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            import_id: row.get("import_id")?,
            import_date: row.get("import_date")?,
            source: row.get("source")?,
            vehicle_count: row.get("vehicle_count")?,
            is_active: row.get::<_, i64>("is_active")? != 0,
            created_at: row.get("created_at")?,
        })
    }
}

/// Creates a new, inactive batch and returns its id.
pub fn create_batch(
    db: &Database,
    import_date: &str,
    source: Option<&str>,
    vehicle_count: i64,
) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO imports (import_date, source, vehicle_count, is_active)
             VALUES (?1, ?2, ?3, 0)",
            params![import_date, source, vehicle_count],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Makes `import_id` the single active batch and archives the rows of all
/// other batches, in one transaction.
pub fn activate(db: &Database, import_id: i64) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        let updated = tx.execute(
            "UPDATE imports SET is_active = 1 WHERE import_id = ?1",
            params![import_id],
        )?;
        if updated == 0 {
            return Err(DatabaseError::Sqlite(rusqlite::Error::QueryReturnedNoRows));
        }
        tx.execute(
            "UPDATE imports SET is_active = 0 WHERE import_id <> ?1 AND is_active = 1",
            params![import_id],
        )?;
        let archived = tx.execute(
            "UPDATE raw_vehicle_data SET is_archived = 1
             WHERE import_id <> ?1 AND is_archived = 0",
            params![import_id],
        )?;
        tx.commit()?;
        log::info!(
            "Activated import {} ({} rows from earlier imports archived)",
            import_id,
            archived
        );
        Ok(())
    })
}

/// Returns the active batch, if any.
pub fn find_active(db: &Database) -> Result<Option<ImportBatch>, DatabaseError> {
    db.with_conn(|conn| {
        let batch = conn
            .query_row(
                "SELECT * FROM imports WHERE is_active = 1
                 ORDER BY import_id DESC LIMIT 1",
                [],
                ImportBatch::from_row,
            )
            .optional()?;
        Ok(batch)
    })
}

pub fn find_by_id(db: &Database, import_id: i64) -> Result<Option<ImportBatch>, DatabaseError> {
    db.with_conn(|conn| {
        let batch = conn
            .query_row(
                "SELECT * FROM imports WHERE import_id = ?1",
                params![import_id],
                ImportBatch::from_row,
            )
            .optional()?;
        Ok(batch)
    })
}

/// Most recent batches first.
pub fn list_recent(db: &Database, limit: u32) -> Result<Vec<ImportBatch>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM imports ORDER BY import_id DESC LIMIT ?1")?;
        let rows = stmt
            .query_map(params![limit], ImportBatch::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
