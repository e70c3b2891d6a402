//! Local relational store.
//!
//! One SQLite database holds every table. [`Store`] is a cheap handle (pool
//! plus change feed) that hands out one access object per table; construct
//! it with [`Store::open`] and pass it along, or share the process-wide
//! instance from [`Store::get_instance`].

mod calendar_event_dao;
mod diet_plan_dao;
mod error;
pub mod live;
mod schema;
mod user_dao;
mod user_detail_dao;
mod workout_plan_dao;

pub use calendar_event_dao::CalendarEventDao;
pub use diet_plan_dao::DietPlanDao;
pub use error::StoreError;
pub use live::{ChangeFeed, LiveQuery, Table};
pub use schema::{SchemaStatus, SCHEMA_VERSION};
pub use user_dao::UserDao;
pub use user_detail_dao::UserDetailDao;
pub use workout_plan_dao::WorkoutPlanDao;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::sync::OnceCell;

static INSTANCE: OnceCell<Store> = OnceCell::const_new();

/// Handle to the local database.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
    changes: ChangeFeed,
    path: PathBuf,
    schema: SchemaStatus,
}

impl Store {
    /// Opens (creating if missing) the database at `path` and brings its
    /// schema up to date.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        // Ensure parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(parent.to_path_buf(), e))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", path.display());

        let options = SqliteConnectOptions::from_str(&db_url)?
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let schema = schema::reconcile(&pool).await?;
        match schema {
            SchemaStatus::Created => tracing::info!("Created local database at {}", path.display()),
            SchemaStatus::Recreated { found } => tracing::warn!(
                "Recreated local database at {} (found schema version {})",
                path.display(),
                found
            ),
            SchemaStatus::Current => tracing::debug!("Opened local database at {}", path.display()),
        }

        Ok(Self {
            pool,
            changes: ChangeFeed::new(),
            path,
            schema,
        })
    }

    /// Returns the process-wide store, opening it on first use.
    ///
    /// Concurrent first callers wait on a single construction; the first
    /// caller's `path` wins and every caller gets the same instance. A
    /// failed open leaves the cell empty so a later call can retry.
    pub async fn get_instance(path: impl AsRef<Path>) -> Result<&'static Store, StoreError> {
        let path = path.as_ref();
        let store = INSTANCE
            .get_or_try_init(|| async { Store::open(path).await })
            .await?;
        if store.path != path {
            tracing::warn!(
                "Store already open at {}; ignoring requested path {}",
                store.path.display(),
                path.display()
            );
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// What opening this store did to the schema.
    pub fn schema_status(&self) -> SchemaStatus {
        self.schema
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn changes(&self) -> &ChangeFeed {
        &self.changes
    }

    pub fn users(&self) -> UserDao {
        UserDao::new(self.pool.clone(), self.changes.clone())
    }

    pub fn user_details(&self) -> UserDetailDao {
        UserDetailDao::new(self.pool.clone(), self.changes.clone())
    }

    pub fn workout_plans(&self) -> WorkoutPlanDao {
        WorkoutPlanDao::new(self.pool.clone(), self.changes.clone())
    }

    pub fn diet_plans(&self) -> DietPlanDao {
        DietPlanDao::new(self.pool.clone(), self.changes.clone())
    }

    pub fn calendar_events(&self) -> CalendarEventDao {
        CalendarEventDao::new(self.pool.clone(), self.changes.clone())
    }
}

fn require_id(id: Option<i64>, table: Table) -> Result<i64, StoreError> {
    id.ok_or(StoreError::Unsaved(table))
}

/// Escapes `%`, `_` and `\` so `term` matches literally inside a
/// `LIKE ... ESCAPE '\'` pattern.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
