use crate::db::{LiveQuery, Store, StoreError, UserDetailDao};
use crate::models::UserDetail;

#[derive(Clone)]
pub struct UserDetailRepository {
    dao: UserDetailDao,
}

impl UserDetailRepository {
    pub fn new(store: &Store) -> Self {
        Self {
            dao: store.user_details(),
        }
    }

    /// Inserts the detail row if the user has none, otherwise replaces it.
    ///
    /// Look-up and write are separate statements: two concurrent first
    /// saves for one user can race, and the loser gets a constraint error.
    pub async fn upsert(&self, detail: &UserDetail) -> Result<(), StoreError> {
        match self.dao.get_by_user(detail.user_id).await? {
            Some(_) => self.dao.update(detail).await,
            None => self.dao.insert(detail).await,
        }
    }

    pub async fn get(&self, user_id: i64) -> Result<Option<UserDetail>, StoreError> {
        self.dao.get_by_user(user_id).await
    }

    pub async fn delete(&self, detail: &UserDetail) -> Result<(), StoreError> {
        self.dao.delete(detail).await
    }

    pub fn observe(&self, user_id: i64) -> LiveQuery<Option<UserDetail>> {
        self.dao.observe(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{insert_user, open_store};

    #[tokio::test]
    async fn test_upsert_twice_keeps_one_row_with_latest_values() {
        let ctx = open_store().await;
        let user_id = insert_user(&ctx.store, "a@x.com").await;
        let repo = UserDetailRepository::new(&ctx.store);

        let mut detail = UserDetail::new(user_id);
        detail.age = 30;
        detail.goal = "Build strength".to_string();
        repo.upsert(&detail).await.unwrap();

        detail.age = 31;
        detail.weight = 70.5;
        detail.goal = "Run a marathon".to_string();
        repo.upsert(&detail).await.unwrap();

        assert_eq!(repo.get(user_id).await.unwrap(), Some(detail));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_details WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(ctx.store.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_upsert_for_missing_user_propagates_constraint() {
        let ctx = open_store().await;
        let repo = UserDetailRepository::new(&ctx.store);

        let err = repo.upsert(&UserDetail::new(12)).await.unwrap_err();
        assert!(err.is_constraint());
    }
}
