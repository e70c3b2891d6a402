use sqlx::SqlitePool;

use super::error::StoreError;
use super::live::{live_query, ChangeFeed, LiveQuery, Table};
use super::{like_pattern, require_id};
use crate::models::WorkoutPlan;

/// Access object for the `workout_plans` table.
///
/// Inserts replace on conflict: a plan carrying an existing id overwrites
/// that row.
#[derive(Debug, Clone)]
pub struct WorkoutPlanDao {
    pool: SqlitePool,
    changes: ChangeFeed,
}

#[derive(sqlx::FromRow)]
struct WorkoutPlanRow {
    id: i64,
    user_id: i64,
    content: String,
    target_sets: i32,
    completed_sets: i32,
}

impl From<WorkoutPlanRow> for WorkoutPlan {
    fn from(row: WorkoutPlanRow) -> Self {
        WorkoutPlan {
            id: Some(row.id),
            user_id: row.user_id,
            content: row.content,
            target_sets: row.target_sets,
            completed_sets: row.completed_sets,
        }
    }
}

const UPSERT: &str = r#"
    INSERT OR REPLACE INTO workout_plans (id, user_id, content, target_sets, completed_sets)
    VALUES (?, ?, ?, ?, ?)
"#;

impl WorkoutPlanDao {
    pub(crate) fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        Self { pool, changes }
    }

    /// Inserts (or replaces) a plan, returning its id.
    pub async fn insert(&self, plan: &WorkoutPlan) -> Result<i64, StoreError> {
        let result = sqlx::query(UPSERT)
            .bind(plan.id)
            .bind(plan.user_id)
            .bind(&plan.content)
            .bind(plan.target_sets)
            .bind(plan.completed_sets)
            .execute(&self.pool)
            .await?;
        self.changes.notify(Table::WorkoutPlans);
        Ok(result.last_insert_rowid())
    }

    pub async fn insert_many(&self, plans: &[WorkoutPlan]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for plan in plans {
            sqlx::query(UPSERT)
                .bind(plan.id)
                .bind(plan.user_id)
                .bind(&plan.content)
                .bind(plan.target_sets)
                .bind(plan.completed_sets)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        self.changes.notify(Table::WorkoutPlans);
        Ok(())
    }

    pub async fn update(&self, plan: &WorkoutPlan) -> Result<(), StoreError> {
        let id = require_id(plan.id, Table::WorkoutPlans)?;
        let result = sqlx::query(
            r#"
            UPDATE workout_plans
            SET user_id = ?, content = ?, target_sets = ?, completed_sets = ?
            WHERE id = ?
            "#,
        )
        .bind(plan.user_id)
        .bind(&plan.content)
        .bind(plan.target_sets)
        .bind(plan.completed_sets)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                table: Table::WorkoutPlans,
                key: id,
            });
        }
        self.changes.notify(Table::WorkoutPlans);
        Ok(())
    }

    pub async fn delete(&self, plan: &WorkoutPlan) -> Result<(), StoreError> {
        let id = require_id(plan.id, Table::WorkoutPlans)?;
        sqlx::query("DELETE FROM workout_plans WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.changes.notify(Table::WorkoutPlans);
        Ok(())
    }

    /// Deletes every plan of `user_id`, returning how many were removed.
    pub async fn delete_all_for_user(&self, user_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM workout_plans WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        self.changes.notify(Table::WorkoutPlans);
        Ok(result.rows_affected())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<WorkoutPlan>, StoreError> {
        let row: Option<WorkoutPlanRow> =
            sqlx::query_as("SELECT * FROM workout_plans WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(WorkoutPlan::from))
    }

    /// The user's plans, newest first.
    pub fn observe_for_user(&self, user_id: i64) -> LiveQuery<Vec<WorkoutPlan>> {
        let pool = self.pool.clone();
        live_query(self.changes.clone(), Table::WorkoutPlans, move || {
            let pool = pool.clone();
            async move {
                let rows: Vec<WorkoutPlanRow> = sqlx::query_as(
                    "SELECT * FROM workout_plans WHERE user_id = ? ORDER BY id DESC",
                )
                .bind(user_id)
                .fetch_all(&pool)
                .await?;
                Ok(rows.into_iter().map(WorkoutPlan::from).collect())
            }
        })
    }

    /// The user's plans whose content contains `term`, newest first.
    ///
    /// Matching follows SQLite's `LIKE`: case-insensitive for ASCII letters.
    pub fn search(&self, user_id: i64, term: &str) -> LiveQuery<Vec<WorkoutPlan>> {
        let pool = self.pool.clone();
        let pattern = like_pattern(term);
        live_query(self.changes.clone(), Table::WorkoutPlans, move || {
            let pool = pool.clone();
            let pattern = pattern.clone();
            async move {
                let rows: Vec<WorkoutPlanRow> = sqlx::query_as(
                    r#"
                    SELECT * FROM workout_plans
                    WHERE user_id = ? AND content LIKE ? ESCAPE '\'
                    ORDER BY id DESC
                    "#,
                )
                .bind(user_id)
                .bind(&pattern)
                .fetch_all(&pool)
                .await?;
                Ok(rows.into_iter().map(WorkoutPlan::from).collect())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{insert_user, open_store};
    use futures::StreamExt;

    #[tokio::test]
    async fn test_insert_and_get_roundtrip() {
        let ctx = open_store().await;
        let user_id = insert_user(&ctx.store, "a@x.com").await;
        let dao = ctx.store.workout_plans();

        let plan = WorkoutPlan::new(user_id, "Bench press", 5).with_completed_sets(2);
        let id = dao.insert(&plan).await.unwrap();

        let mut expected = plan;
        expected.id = Some(id);
        assert_eq!(dao.get_by_id(id).await.unwrap(), Some(expected));
    }

    #[tokio::test]
    async fn test_insert_for_missing_user_fails() {
        let ctx = open_store().await;
        let err = ctx
            .store
            .workout_plans()
            .insert(&WorkoutPlan::new(7, "Squats", 3))
            .await
            .unwrap_err();
        assert!(err.is_constraint());
    }

    #[tokio::test]
    async fn test_insert_replaces_on_conflict() {
        let ctx = open_store().await;
        let user_id = insert_user(&ctx.store, "a@x.com").await;
        let dao = ctx.store.workout_plans();

        let id = dao.insert(&WorkoutPlan::new(user_id, "Squats", 3)).await.unwrap();
        let mut replacement = WorkoutPlan::new(user_id, "Lunges", 4);
        replacement.id = Some(id);
        assert_eq!(dao.insert(&replacement).await.unwrap(), id);

        assert_eq!(dao.get_by_id(id).await.unwrap(), Some(replacement));
    }

    #[tokio::test]
    async fn test_insert_many_twice_is_idempotent() {
        let ctx = open_store().await;
        let user_id = insert_user(&ctx.store, "a@x.com").await;
        let dao = ctx.store.workout_plans();

        let batch: Vec<WorkoutPlan> = (1..=3)
            .map(|i| {
                let mut plan = WorkoutPlan::new(user_id, format!("Exercise {}", i), i);
                plan.id = Some(i as i64 * 10);
                plan
            })
            .collect();

        dao.insert_many(&batch).await.unwrap();
        let mut stream = dao.observe_for_user(user_id);
        let once = stream.next().await.unwrap().unwrap();

        dao.insert_many(&batch).await.unwrap();
        let twice = stream.next().await.unwrap().unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice.len(), 3);
    }

    #[tokio::test]
    async fn test_update_and_not_found() {
        let ctx = open_store().await;
        let user_id = insert_user(&ctx.store, "a@x.com").await;
        let dao = ctx.store.workout_plans();

        let id = dao.insert(&WorkoutPlan::new(user_id, "Squats", 3)).await.unwrap();
        let mut plan = dao.get_by_id(id).await.unwrap().unwrap();
        plan.record_set();
        dao.update(&plan).await.unwrap();
        assert_eq!(dao.get_by_id(id).await.unwrap().unwrap().completed_sets, 1);

        plan.id = Some(id + 100);
        let err = dao.update(&plan).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { table: Table::WorkoutPlans, .. }));

        let err = dao.update(&WorkoutPlan::new(user_id, "Unsaved", 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Unsaved(Table::WorkoutPlans)));
    }

    #[tokio::test]
    async fn test_observe_orders_newest_first() {
        let ctx = open_store().await;
        let user_id = insert_user(&ctx.store, "a@x.com").await;
        let other = insert_user(&ctx.store, "b@x.com").await;
        let dao = ctx.store.workout_plans();

        dao.insert(&WorkoutPlan::new(user_id, "Squats", 3)).await.unwrap();
        dao.insert(&WorkoutPlan::new(other, "Not mine", 3)).await.unwrap();

        let mut stream = dao.observe_for_user(user_id);
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);

        let new_id = dao.insert(&WorkoutPlan::new(user_id, "Deadlift", 5)).await.unwrap();
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].id, Some(new_id));
        assert_eq!(second[0].content, "Deadlift");
        assert_eq!(second[1].content, "Squats");
    }

    #[tokio::test]
    async fn test_delete_and_delete_all_for_user() {
        let ctx = open_store().await;
        let user_id = insert_user(&ctx.store, "a@x.com").await;
        let other = insert_user(&ctx.store, "b@x.com").await;
        let dao = ctx.store.workout_plans();

        let id = dao.insert(&WorkoutPlan::new(user_id, "Squats", 3)).await.unwrap();
        dao.insert(&WorkoutPlan::new(user_id, "Lunges", 3)).await.unwrap();
        let kept = dao.insert(&WorkoutPlan::new(other, "Rows", 3)).await.unwrap();

        let plan = dao.get_by_id(id).await.unwrap().unwrap();
        dao.delete(&plan).await.unwrap();
        assert!(dao.get_by_id(id).await.unwrap().is_none());

        assert_eq!(dao.delete_all_for_user(user_id).await.unwrap(), 1);
        assert!(dao.get_by_id(kept).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_search_matches_substring() {
        let ctx = open_store().await;
        let user_id = insert_user(&ctx.store, "a@x.com").await;
        let dao = ctx.store.workout_plans();

        dao.insert(&WorkoutPlan::new(user_id, "Push-ups", 3)).await.unwrap();
        dao.insert(&WorkoutPlan::new(user_id, "Pull-ups", 3)).await.unwrap();
        dao.insert(&WorkoutPlan::new(user_id, "100% effort sprint", 1)).await.unwrap();

        let mut results = dao.search(user_id, "ups");
        let found = results.next().await.unwrap().unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].content, "Pull-ups");

        let mut literal = dao.search(user_id, "0%");
        let found = literal.next().await.unwrap().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content, "100% effort sprint");

        let mut none = dao.search(user_id, "_");
        assert!(none.next().await.unwrap().unwrap().is_empty());
    }
}
