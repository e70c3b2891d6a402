use crate::db::{LiveQuery, Store, StoreError, WorkoutPlanDao};
use crate::models::WorkoutPlan;

#[derive(Clone)]
pub struct WorkoutPlanRepository {
    dao: WorkoutPlanDao,
}

impl WorkoutPlanRepository {
    pub fn new(store: &Store) -> Self {
        Self {
            dao: store.workout_plans(),
        }
    }

    /// Stores a plan and returns it with its id.
    pub async fn add(&self, plan: &WorkoutPlan) -> Result<WorkoutPlan, StoreError> {
        let id = self.dao.insert(plan).await?;
        let mut stored = plan.clone();
        stored.id = Some(id);
        Ok(stored)
    }

    pub async fn add_all(&self, plans: &[WorkoutPlan]) -> Result<(), StoreError> {
        self.dao.insert_many(plans).await
    }

    pub async fn update(&self, plan: &WorkoutPlan) -> Result<(), StoreError> {
        self.dao.update(plan).await
    }

    pub async fn delete(&self, plan: &WorkoutPlan) -> Result<(), StoreError> {
        self.dao.delete(plan).await
    }

    pub async fn delete_all_for_user(&self, user_id: i64) -> Result<u64, StoreError> {
        self.dao.delete_all_for_user(user_id).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<WorkoutPlan>, StoreError> {
        self.dao.get_by_id(id).await
    }

    pub fn observe_for_user(&self, user_id: i64) -> LiveQuery<Vec<WorkoutPlan>> {
        self.dao.observe_for_user(user_id)
    }

    pub fn search(&self, user_id: i64, term: &str) -> LiveQuery<Vec<WorkoutPlan>> {
        self.dao.search(user_id, term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{insert_user, open_store};
    use futures::StreamExt;

    #[tokio::test]
    async fn test_add_returns_stored_plan() {
        let ctx = open_store().await;
        let user_id = insert_user(&ctx.store, "a@x.com").await;
        let repo = WorkoutPlanRepository::new(&ctx.store);

        let stored = repo.add(&WorkoutPlan::new(user_id, "Plank", 3)).await.unwrap();
        assert_eq!(repo.get(stored.id.unwrap()).await.unwrap(), Some(stored));
    }

    #[tokio::test]
    async fn test_live_list_follows_adds_and_deletes() {
        let ctx = open_store().await;
        let user_id = insert_user(&ctx.store, "a@x.com").await;
        let repo = WorkoutPlanRepository::new(&ctx.store);
        let mut plans = repo.observe_for_user(user_id);
        assert!(plans.next().await.unwrap().unwrap().is_empty());

        let plank = repo.add(&WorkoutPlan::new(user_id, "Plank", 3)).await.unwrap();
        assert_eq!(plans.next().await.unwrap().unwrap(), vec![plank.clone()]);

        repo.delete(&plank).await.unwrap();
        assert!(plans.next().await.unwrap().unwrap().is_empty());
    }
}
