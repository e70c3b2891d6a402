use sqlx::SqlitePool;

use super::error::StoreError;
use super::live::{live_query, ChangeFeed, LiveQuery, Table};
use crate::models::UserDetail;

/// Access object for the `user_details` table, keyed by `user_id`.
#[derive(Debug, Clone)]
pub struct UserDetailDao {
    pool: SqlitePool,
    changes: ChangeFeed,
}

#[derive(sqlx::FromRow)]
struct UserDetailRow {
    user_id: i64,
    age: i32,
    height: f64,
    weight: f64,
    birthday: String,
    gender: String,
    goal: String,
}

impl From<UserDetailRow> for UserDetail {
    fn from(row: UserDetailRow) -> Self {
        UserDetail {
            user_id: row.user_id,
            age: row.age,
            height: row.height,
            weight: row.weight,
            birthday: row.birthday,
            gender: row.gender,
            goal: row.goal,
        }
    }
}

const INSERT: &str = r#"
    INSERT INTO user_details (user_id, age, height, weight, birthday, gender, goal)
    VALUES (?, ?, ?, ?, ?, ?, ?)
"#;

impl UserDetailDao {
    pub(crate) fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        Self { pool, changes }
    }

    /// Inserts a detail row. Fails if the user already has one or does not
    /// exist.
    pub async fn insert(&self, detail: &UserDetail) -> Result<(), StoreError> {
        bind_detail(sqlx::query(INSERT), detail)
            .execute(&self.pool)
            .await?;
        self.changes.notify(Table::UserDetails);
        Ok(())
    }

    pub async fn insert_many(&self, details: &[UserDetail]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for detail in details {
            bind_detail(sqlx::query(INSERT), detail)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        self.changes.notify(Table::UserDetails);
        Ok(())
    }

    /// Replaces the detail row of `detail.user_id`.
    pub async fn update(&self, detail: &UserDetail) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE user_details
            SET age = ?, height = ?, weight = ?, birthday = ?, gender = ?, goal = ?
            WHERE user_id = ?
            "#,
        )
        .bind(detail.age)
        .bind(detail.height)
        .bind(detail.weight)
        .bind(&detail.birthday)
        .bind(&detail.gender)
        .bind(&detail.goal)
        .bind(detail.user_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                table: Table::UserDetails,
                key: detail.user_id,
            });
        }
        self.changes.notify(Table::UserDetails);
        Ok(())
    }

    pub async fn delete(&self, detail: &UserDetail) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM user_details WHERE user_id = ?")
            .bind(detail.user_id)
            .execute(&self.pool)
            .await?;
        self.changes.notify(Table::UserDetails);
        Ok(())
    }

    pub async fn get_by_user(&self, user_id: i64) -> Result<Option<UserDetail>, StoreError> {
        fetch_detail(&self.pool, user_id).await
    }

    /// The user's detail row, re-emitted on every change to the table.
    pub fn observe(&self, user_id: i64) -> LiveQuery<Option<UserDetail>> {
        let pool = self.pool.clone();
        live_query(self.changes.clone(), Table::UserDetails, move || {
            let pool = pool.clone();
            async move { fetch_detail(&pool, user_id).await }
        })
    }
}

fn bind_detail<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    detail: &'q UserDetail,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(detail.user_id)
        .bind(detail.age)
        .bind(detail.height)
        .bind(detail.weight)
        .bind(&detail.birthday)
        .bind(&detail.gender)
        .bind(&detail.goal)
}

async fn fetch_detail(pool: &SqlitePool, user_id: i64) -> Result<Option<UserDetail>, StoreError> {
    let row: Option<UserDetailRow> =
        sqlx::query_as("SELECT * FROM user_details WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(UserDetail::from))
}
