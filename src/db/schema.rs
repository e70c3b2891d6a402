//! Table definitions and schema version handling.
//!
//! There is no migration path: a database carrying any other schema version
//! is wiped and recreated empty. Local rows have no server of record, so
//! this loses data; [`SchemaStatus::Recreated`] reports when it happened.

use sqlx::{Executor, SqlitePool};

use super::error::StoreError;

/// Bump whenever a table definition below changes.
pub const SCHEMA_VERSION: i64 = 1;

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_details (
    user_id INTEGER PRIMARY KEY NOT NULL,
    age INTEGER NOT NULL,
    height REAL NOT NULL,
    weight REAL NOT NULL,
    birthday TEXT NOT NULL,
    gender TEXT NOT NULL,
    goal TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS workout_plans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    target_sets INTEGER NOT NULL,
    completed_sets INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS diet_plans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    food TEXT NOT NULL,
    meal_type INTEGER NOT NULL CHECK (meal_type BETWEEN 0 AND 2),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS calendar_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    summary TEXT NOT NULL,
    start_at TEXT NOT NULL,
    end_at TEXT NOT NULL,
    is_finished INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_workout_plans_user_id ON workout_plans(user_id);
CREATE INDEX IF NOT EXISTS idx_diet_plans_user_meal ON diet_plans(user_id, meal_type);
CREATE INDEX IF NOT EXISTS idx_calendar_events_user_start ON calendar_events(user_id, start_at);
"#;

/// What opening the store did to the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    /// Tables were already at [`SCHEMA_VERSION`].
    Current,
    /// The database was empty and tables were created.
    Created,
    /// A different schema version was found; all tables were dropped and
    /// recreated empty.
    Recreated { found: i64 },
}

/// Brings the database to [`SCHEMA_VERSION`], destroying data on mismatch.
///
/// Statements run as owned batches through the executor so the returned
/// future stays `Send`.
pub async fn reconcile(pool: &SqlitePool) -> Result<SchemaStatus, StoreError> {
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;
    if version == SCHEMA_VERSION {
        return Ok(SchemaStatus::Current);
    }

    let tables = user_tables(pool).await?;
    let status = if tables.is_empty() {
        SchemaStatus::Created
    } else {
        tracing::warn!(
            "Local database schema version {} does not match {}; dropping {} table(s) and all local data",
            version,
            SCHEMA_VERSION,
            tables.len()
        );
        drop_tables(pool, drop_batch(&tables)).await?;
        SchemaStatus::Recreated { found: version }
    };

    let create = format!(
        "{}\nPRAGMA user_version = {};",
        CREATE_TABLES, SCHEMA_VERSION
    );
    let mut tx = pool.begin().await?;
    (&mut *tx).execute(create.as_str()).await?;
    tx.commit().await?;

    Ok(status)
}

async fn user_tables(pool: &SqlitePool) -> Result<Vec<String>, StoreError> {
    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
    )
    .fetch_all(pool)
    .await?;
    Ok(tables)
}

/// One statement batch dropping `tables` with foreign keys switched off.
fn drop_batch(tables: &[String]) -> String {
    // Dropping a parent with enforcement on would cascade row by row
    let mut batch = String::from("PRAGMA foreign_keys = OFF;\n");
    for table in tables {
        batch.push_str(&format!(
            "DROP TABLE IF EXISTS \"{}\";\n",
            table.replace('"', "\"\"")
        ));
    }
    batch.push_str("PRAGMA foreign_keys = ON;");
    batch
}

async fn drop_tables(pool: &SqlitePool, batch: String) -> Result<(), StoreError> {
    let mut conn = pool.acquire().await?;
    if let Err(e) = (&mut *conn).execute(batch.as_str()).await {
        // The connection may still have enforcement off; keep it out of the pool
        drop(conn.detach());
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_batch_quotes_names() {
        let batch = drop_batch(&["users".to_string(), "odd\"name".to_string()]);
        assert!(batch.starts_with("PRAGMA foreign_keys = OFF;"));
        assert!(batch.contains("DROP TABLE IF EXISTS \"users\";"));
        assert!(batch.contains("DROP TABLE IF EXISTS \"odd\"\"name\";"));
        assert!(batch.ends_with("PRAGMA foreign_keys = ON;"));
    }
}
