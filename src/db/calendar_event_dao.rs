use sqlx::SqlitePool;

use super::error::StoreError;
use super::live::{live_query, ChangeFeed, LiveQuery, Table};
use super::require_id;
use crate::models::CalendarEvent;

/// Access object for the `calendar_events` table. Inserts fail on conflict.
#[derive(Debug, Clone)]
pub struct CalendarEventDao {
    pool: SqlitePool,
    changes: ChangeFeed,
}

#[derive(sqlx::FromRow)]
struct CalendarEventRow {
    id: i64,
    user_id: i64,
    summary: String,
    start_at: String,
    end_at: String,
    is_finished: bool,
}

impl From<CalendarEventRow> for CalendarEvent {
    fn from(row: CalendarEventRow) -> Self {
        CalendarEvent {
            id: Some(row.id),
            user_id: row.user_id,
            summary: row.summary,
            start: row.start_at,
            end: row.end_at,
            is_finished: row.is_finished,
        }
    }
}

const INSERT: &str = r#"
    INSERT INTO calendar_events (id, user_id, summary, start_at, end_at, is_finished)
    VALUES (?, ?, ?, ?, ?, ?)
"#;

impl CalendarEventDao {
    pub(crate) fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        Self { pool, changes }
    }

    pub async fn insert(&self, event: &CalendarEvent) -> Result<i64, StoreError> {
        let result = sqlx::query(INSERT)
            .bind(event.id)
            .bind(event.user_id)
            .bind(&event.summary)
            .bind(&event.start)
            .bind(&event.end)
            .bind(event.is_finished)
            .execute(&self.pool)
            .await?;
        self.changes.notify(Table::CalendarEvents);
        Ok(result.last_insert_rowid())
    }

    pub async fn insert_many(&self, events: &[CalendarEvent]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for event in events {
            sqlx::query(INSERT)
                .bind(event.id)
                .bind(event.user_id)
                .bind(&event.summary)
                .bind(&event.start)
                .bind(&event.end)
                .bind(event.is_finished)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        self.changes.notify(Table::CalendarEvents);
        Ok(())
    }

    pub async fn update(&self, event: &CalendarEvent) -> Result<(), StoreError> {
        let id = require_id(event.id, Table::CalendarEvents)?;
        let result = sqlx::query(
            r#"
            UPDATE calendar_events
            SET user_id = ?, summary = ?, start_at = ?, end_at = ?, is_finished = ?
            WHERE id = ?
            "#,
        )
        .bind(event.user_id)
        .bind(&event.summary)
        .bind(&event.start)
        .bind(&event.end)
        .bind(event.is_finished)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                table: Table::CalendarEvents,
                key: id,
            });
        }
        self.changes.notify(Table::CalendarEvents);
        Ok(())
    }

    pub async fn delete(&self, event: &CalendarEvent) -> Result<(), StoreError> {
        let id = require_id(event.id, Table::CalendarEvents)?;
        sqlx::query("DELETE FROM calendar_events WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.changes.notify(Table::CalendarEvents);
        Ok(())
    }

    pub async fn delete_all_for_user(&self, user_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM calendar_events WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        self.changes.notify(Table::CalendarEvents);
        Ok(result.rows_affected())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<CalendarEvent>, StoreError> {
        let row: Option<CalendarEventRow> =
            sqlx::query_as("SELECT * FROM calendar_events WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(CalendarEvent::from))
    }

    /// Finds an event of `user_id` with exactly this summary and time span.
    pub async fn find_matching(
        &self,
        user_id: i64,
        summary: &str,
        start: &str,
        end: &str,
    ) -> Result<Option<CalendarEvent>, StoreError> {
        let row: Option<CalendarEventRow> = sqlx::query_as(
            r#"
            SELECT * FROM calendar_events
            WHERE user_id = ? AND summary = ? AND start_at = ? AND end_at = ?
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(summary)
        .bind(start)
        .bind(end)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(CalendarEvent::from))
    }

    /// The user's events in start order.
    pub fn observe_for_user(&self, user_id: i64) -> LiveQuery<Vec<CalendarEvent>> {
        let pool = self.pool.clone();
        live_query(self.changes.clone(), Table::CalendarEvents, move || {
            let pool = pool.clone();
            async move {
                let rows: Vec<CalendarEventRow> = sqlx::query_as(
                    "SELECT * FROM calendar_events WHERE user_id = ? ORDER BY start_at, id",
                )
                .bind(user_id)
                .fetch_all(&pool)
                .await?;
                Ok(rows.into_iter().map(CalendarEvent::from).collect())
            }
        })
    }

    /// The user's events starting in `[from, to)`, compared as strings.
    pub fn observe_between(
        &self,
        user_id: i64,
        from: &str,
        to: &str,
    ) -> LiveQuery<Vec<CalendarEvent>> {
        let pool = self.pool.clone();
        let (from, to) = (from.to_string(), to.to_string());
        live_query(self.changes.clone(), Table::CalendarEvents, move || {
            let pool = pool.clone();
            let (from, to) = (from.clone(), to.clone());
            async move {
                let rows: Vec<CalendarEventRow> = sqlx::query_as(
                    r#"
                    SELECT * FROM calendar_events
                    WHERE user_id = ? AND start_at >= ? AND start_at < ?
                    ORDER BY start_at, id
                    "#,
                )
                .bind(user_id)
                .bind(&from)
                .bind(&to)
                .fetch_all(&pool)
                .await?;
                Ok(rows.into_iter().map(CalendarEvent::from).collect())
            }
        })
    }
}
