use sqlx::SqlitePool;

use super::error::StoreError;
use super::live::{live_query, ChangeFeed, LiveQuery, Table};
use super::require_id;
use crate::models::{DietPlan, MealType};

/// Access object for the `diet_plans` table.
///
/// Inserts replace on conflict, like workout plans.
#[derive(Debug, Clone)]
pub struct DietPlanDao {
    pool: SqlitePool,
    changes: ChangeFeed,
}

#[derive(sqlx::FromRow)]
struct DietPlanRow {
    id: i64,
    user_id: i64,
    food: String,
    meal_type: i64,
}

impl TryFrom<DietPlanRow> for DietPlan {
    type Error = StoreError;

    fn try_from(row: DietPlanRow) -> Result<Self, Self::Error> {
        let meal_type = MealType::from_index(row.meal_type).ok_or_else(|| {
            StoreError::Corrupt(format!(
                "diet plan {} has unknown meal type {}",
                row.id, row.meal_type
            ))
        })?;
        Ok(DietPlan {
            id: Some(row.id),
            user_id: row.user_id,
            food: row.food,
            meal_type,
        })
    }
}

fn hydrate(rows: Vec<DietPlanRow>) -> Result<Vec<DietPlan>, StoreError> {
    rows.into_iter().map(DietPlan::try_from).collect()
}

const UPSERT: &str = r#"
    INSERT OR REPLACE INTO diet_plans (id, user_id, food, meal_type)
    VALUES (?, ?, ?, ?)
"#;

const BY_MEAL_TYPE: &str =
    "SELECT * FROM diet_plans WHERE user_id = ? AND meal_type = ? ORDER BY id DESC";

impl DietPlanDao {
    pub(crate) fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        Self { pool, changes }
    }

    /// Inserts (or replaces) a plan, returning its id.
    pub async fn insert(&self, plan: &DietPlan) -> Result<i64, StoreError> {
        let result = sqlx::query(UPSERT)
            .bind(plan.id)
            .bind(plan.user_id)
            .bind(&plan.food)
            .bind(plan.meal_type.index())
            .execute(&self.pool)
            .await?;
        self.changes.notify(Table::DietPlans);
        Ok(result.last_insert_rowid())
    }

    pub async fn insert_many(&self, plans: &[DietPlan]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for plan in plans {
            sqlx::query(UPSERT)
                .bind(plan.id)
                .bind(plan.user_id)
                .bind(&plan.food)
                .bind(plan.meal_type.index())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        self.changes.notify(Table::DietPlans);
        Ok(())
    }

    pub async fn update(&self, plan: &DietPlan) -> Result<(), StoreError> {
        let id = require_id(plan.id, Table::DietPlans)?;
        let result =
            sqlx::query("UPDATE diet_plans SET user_id = ?, food = ?, meal_type = ? WHERE id = ?")
                .bind(plan.user_id)
                .bind(&plan.food)
                .bind(plan.meal_type.index())
                .bind(id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                table: Table::DietPlans,
                key: id,
            });
        }
        self.changes.notify(Table::DietPlans);
        Ok(())
    }

    pub async fn delete(&self, plan: &DietPlan) -> Result<(), StoreError> {
        let id = require_id(plan.id, Table::DietPlans)?;
        sqlx::query("DELETE FROM diet_plans WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.changes.notify(Table::DietPlans);
        Ok(())
    }

    pub async fn delete_all_for_user(&self, user_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM diet_plans WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        self.changes.notify(Table::DietPlans);
        Ok(result.rows_affected())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<DietPlan>, StoreError> {
        let row: Option<DietPlanRow> = sqlx::query_as("SELECT * FROM diet_plans WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(DietPlan::try_from).transpose()
    }

    /// One-shot read of the user's plans for a meal, newest first.
    pub async fn list_by_meal_type(
        &self,
        user_id: i64,
        meal_type: MealType,
    ) -> Result<Vec<DietPlan>, StoreError> {
        let rows: Vec<DietPlanRow> = sqlx::query_as(BY_MEAL_TYPE)
            .bind(user_id)
            .bind(meal_type.index())
            .fetch_all(&self.pool)
            .await?;
        hydrate(rows)
    }

    /// The user's plans, newest first.
    pub fn observe_for_user(&self, user_id: i64) -> LiveQuery<Vec<DietPlan>> {
        let pool = self.pool.clone();
        live_query(self.changes.clone(), Table::DietPlans, move || {
            let pool = pool.clone();
            async move {
                let rows: Vec<DietPlanRow> =
                    sqlx::query_as("SELECT * FROM diet_plans WHERE user_id = ? ORDER BY id DESC")
                        .bind(user_id)
                        .fetch_all(&pool)
                        .await?;
                hydrate(rows)
            }
        })
    }

    /// The user's plans for one meal, newest first.
    pub fn observe_by_meal_type(
        &self,
        user_id: i64,
        meal_type: MealType,
    ) -> LiveQuery<Vec<DietPlan>> {
        let pool = self.pool.clone();
        live_query(self.changes.clone(), Table::DietPlans, move || {
            let pool = pool.clone();
            async move {
                let rows: Vec<DietPlanRow> = sqlx::query_as(BY_MEAL_TYPE)
                    .bind(user_id)
                    .bind(meal_type.index())
                    .fetch_all(&pool)
                    .await?;
                hydrate(rows)
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
    async fn test_filter_by_meal_type() {
        let ctx = open_store().await;
        let user_id = insert_user(&ctx.store, "a@x.com").await;
        let dao = ctx.store.diet_plans();

        dao.insert(&DietPlan::new(user_id, "Eggs", MealType::Breakfast))
            .await
            .unwrap();
        dao.insert(&DietPlan::new(user_id, "Rice", MealType::Lunch))
            .await
            .unwrap();

        let breakfast = dao
            .list_by_meal_type(user_id, MealType::Breakfast)
            .await
            .unwrap();
        assert_eq!(breakfast.len(), 1);
        assert_eq!(breakfast[0].food, "Eggs");

        let mut lunch = dao.observe_by_meal_type(user_id, MealType::Lunch);
        let rows = lunch.next().await.unwrap().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].food, "Rice");
    }

    #[tokio::test]
    async fn test_insert_and_get_roundtrip() {
        let ctx = open_store().await;
        let user_id = insert_user(&ctx.store, "a@x.com").await;
        let dao = ctx.store.diet_plans();

        let plan = DietPlan::new(user_id, "Salmon", MealType::Dinner);
        let id = dao.insert(&plan).await.unwrap();

        let mut expected = plan;
        expected.id = Some(id);
        assert_eq!(dao.get_by_id(id).await.unwrap(), Some(expected));
    }

    #[tokio::test]
    async fn test_insert_many_replaces_on_conflict() {
        let ctx = open_store().await;
        let user_id = insert_user(&ctx.store, "a@x.com").await;
        let dao = ctx.store.diet_plans();

        let mut oats = DietPlan::new(user_id, "Oats", MealType::Breakfast);
        oats.id = Some(1);
        let mut soup = DietPlan::new(user_id, "Soup", MealType::Lunch);
        soup.id = Some(2);

        dao.insert_many(&[oats.clone(), soup.clone()]).await.unwrap();
        dao.insert_many(&[oats.clone(), soup.clone()]).await.unwrap();

        let mut stream = dao.observe_for_user(user_id);
        assert_eq!(stream.next().await.unwrap().unwrap(), vec![soup, oats]);
    }

    #[tokio::test]
    async fn test_observe_sees_insert_first() {
        let ctx = open_store().await;
        let user_id = insert_user(&ctx.store, "a@x.com").await;
        let dao = ctx.store.diet_plans();
        let mut stream = dao.observe_for_user(user_id);
        assert!(stream.next().await.unwrap().unwrap().is_empty());

        dao.insert(&DietPlan::new(user_id, "Eggs", MealType::Breakfast))
            .await
            .unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap().len(), 1);

        dao.insert(&DietPlan::new(user_id, "Pasta", MealType::Dinner))
            .await
            .unwrap();
        let rows = stream.next().await.unwrap().unwrap();
        assert_eq!(rows[0].food, "Pasta");
        assert_eq!(rows[1].food, "Eggs");
    }

    #[tokio::test]
    async fn test_update_delete_and_not_found() {
        let ctx = open_store().await;
        let user_id = insert_user(&ctx.store, "a@x.com").await;
        let dao = ctx.store.diet_plans();

        let id = dao
            .insert(&DietPlan::new(user_id, "Eggs", MealType::Breakfast))
            .await
            .unwrap();
        let mut plan = dao.get_by_id(id).await.unwrap().unwrap();
        plan.meal_type = MealType::Dinner;
        dao.update(&plan).await.unwrap();
        assert_eq!(
            dao.get_by_id(id).await.unwrap().unwrap().meal_type,
            MealType::Dinner
        );

        dao.delete(&plan).await.unwrap();
        assert!(dao.get_by_id(id).await.unwrap().is_none());
        let err = dao.update(&plan).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { table: Table::DietPlans, .. }));
    }

    #[tokio::test]
    async fn test_delete_all_for_user() {
        let ctx = open_store().await;
        let user_id = insert_user(&ctx.store, "a@x.com").await;
        let dao = ctx.store.diet_plans();

        for food in ["Eggs", "Toast", "Juice"] {
            dao.insert(&DietPlan::new(user_id, food, MealType::Breakfast))
                .await
                .unwrap();
        }
        assert_eq!(dao.delete_all_for_user(user_id).await.unwrap(), 3);
        assert!(dao
            .list_by_meal_type(user_id, MealType::Breakfast)
            .await
            .unwrap()
            .is_empty());
    }
}
