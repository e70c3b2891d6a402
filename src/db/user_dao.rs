use sqlx::SqlitePool;

use super::error::StoreError;
use super::require_id;
use super::live::{live_query, ChangeFeed, LiveQuery, Table};
use crate::credentials;
use crate::models::User;

/// Access object for the `users` table.
///
/// Inserts fail on conflict: a second account with the same email is a
/// [`StoreError::Constraint`].
#[derive(Debug, Clone)]
pub struct UserDao {
    pool: SqlitePool,
    changes: ChangeFeed,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: Some(row.id),
            email: row.email,
            password: row.password,
        }
    }
}

impl UserDao {
    pub(crate) fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        Self { pool, changes }
    }

    /// Inserts a user, returning its id.
    pub async fn insert(&self, user: &User) -> Result<i64, StoreError> {
        let result = sqlx::query("INSERT INTO users (id, email, password) VALUES (?, ?, ?)")
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.password)
            .execute(&self.pool)
            .await?;
        self.changes.notify(Table::Users);
        Ok(result.last_insert_rowid())
    }

    /// Inserts every user in one transaction; any conflict rolls back the batch.
    pub async fn insert_many(&self, users: &[User]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for user in users {
            sqlx::query("INSERT INTO users (id, email, password) VALUES (?, ?, ?)")
                .bind(user.id)
                .bind(&user.email)
                .bind(&user.password)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        self.changes.notify(Table::Users);
        Ok(())
    }

    /// Replaces the row with the user's id.
    pub async fn update(&self, user: &User) -> Result<(), StoreError> {
        let id = require_id(user.id, Table::Users)?;
        let result = sqlx::query("UPDATE users SET email = ?, password = ? WHERE id = ?")
            .bind(&user.email)
            .bind(&user.password)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                table: Table::Users,
                key: id,
            });
        }
        self.changes.notify(Table::Users);
        Ok(())
    }

    /// Deletes the user and, through cascading foreign keys, every row that
    /// belongs to it.
    pub async fn delete(&self, user: &User) -> Result<(), StoreError> {
        let id = require_id(user.id, Table::Users)?;
        // CASCADE removes details, plans and events
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.changes.notify_all();
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    /// Returns the user with `email` if `password` matches its stored
    /// credential. A wrong password and an unknown email both give `None`.
    pub async fn get_by_credential(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = self.get_by_email(email).await?;
        Ok(user.filter(|u| credentials::verify(password, &u.password)))
    }

    /// Every user, ordered by id.
    pub fn observe_all(&self) -> LiveQuery<Vec<User>> {
        let pool = self.pool.clone();
        live_query(self.changes.clone(), Table::Users, move || {
            let pool = pool.clone();
            async move {
                let rows: Vec<UserRow> = sqlx::query_as("SELECT * FROM users ORDER BY id")
                    .fetch_all(&pool)
                    .await?;
                Ok(rows.into_iter().map(User::from).collect())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::open_store;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_insert_and_get_by_id_roundtrip() {
        let ctx = open_store().await;
        let dao = ctx.store.users();

        let user = User::new("a@x.com", "p");
        let id = dao.insert(&user).await.unwrap();

        let fetched = dao.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(fetched, user.with_id(id));
    }

    #[tokio::test]
    async fn test_get_by_credential() {
        let ctx = open_store().await;
        let dao = ctx.store.users();

        let id = dao.insert(&User::new("a@x.com", "p")).await.unwrap();
        dao.insert(&User::new("b@x.com", "wrong")).await.unwrap();

        let found = dao.get_by_credential("a@x.com", "p").await.unwrap().unwrap();
        assert_eq!(found.id, Some(id));
        assert_eq!(found.email, "a@x.com");

        assert!(dao.get_by_credential("a@x.com", "wrong").await.unwrap().is_none());
        assert!(dao.get_by_credential("nobody@x.com", "p").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_credential_with_hashed_password() {
        let ctx = open_store().await;
        let dao = ctx.store.users();

        dao.insert(&User::new("a@x.com", credentials::hash_password("p")))
            .await
            .unwrap();

        assert!(dao.get_by_credential("a@x.com", "p").await.unwrap().is_some());
        assert!(dao.get_by_credential("a@x.com", "P").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_constraint_violation() {
        let ctx = open_store().await;
        let dao = ctx.store.users();

        dao.insert(&User::new("a@x.com", "p")).await.unwrap();
        let err = dao.insert(&User::new("a@x.com", "q")).await.unwrap_err();
        assert!(err.is_constraint());
    }

    #[tokio::test]
    async fn test_insert_many_fails_atomically() {
        let ctx = open_store().await;
        let dao = ctx.store.users();

        let err = dao
            .insert_many(&[User::new("a@x.com", "p"), User::new("a@x.com", "q")])
            .await
            .unwrap_err();
        assert!(err.is_constraint());
        assert!(dao.get_by_email("a@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_replaces_row() {
        let ctx = open_store().await;
        let dao = ctx.store.users();

        let id = dao.insert(&User::new("a@x.com", "p")).await.unwrap();
        let updated = User::new("new@x.com", "q").with_id(id);
        dao.update(&updated).await.unwrap();

        assert_eq!(dao.get_by_id(id).await.unwrap().unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let ctx = open_store().await;
        let dao = ctx.store.users();

        let err = dao.update(&User::new("a@x.com", "p").with_id(99)).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::NotFound {
                table: Table::Users,
                key: 99
            }
        ));
    }

    #[tokio::test]
    async fn test_observe_all_sees_new_users() {
        let ctx = open_store().await;
        let dao = ctx.store.users();
        let mut users = dao.observe_all();

        assert!(users.next().await.unwrap().unwrap().is_empty());

        dao.insert(&User::new("a@x.com", "p")).await.unwrap();
        let snapshot = users.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].email, "a@x.com");
    }
}
