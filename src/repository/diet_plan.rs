use crate::db::{DietPlanDao, LiveQuery, Store, StoreError};
use crate::models::{DietPlan, MealType};

#[derive(Clone)]
pub struct DietPlanRepository {
    dao: DietPlanDao,
}

impl DietPlanRepository {
    pub fn new(store: &Store) -> Self {
        Self {
            dao: store.diet_plans(),
        }
    }

    /// Stores a plan and returns it with its id.
    pub async fn add(&self, plan: &DietPlan) -> Result<DietPlan, StoreError> {
        let id = self.dao.insert(plan).await?;
        let mut stored = plan.clone();
        stored.id = Some(id);
        Ok(stored)
    }

    pub async fn add_all(&self, plans: &[DietPlan]) -> Result<(), StoreError> {
        self.dao.insert_many(plans).await
    }

    pub async fn update(&self, plan: &DietPlan) -> Result<(), StoreError> {
        self.dao.update(plan).await
    }

    pub async fn delete(&self, plan: &DietPlan) -> Result<(), StoreError> {
        self.dao.delete(plan).await
    }

    pub async fn delete_all_for_user(&self, user_id: i64) -> Result<u64, StoreError> {
        self.dao.delete_all_for_user(user_id).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<DietPlan>, StoreError> {
        self.dao.get_by_id(id).await
    }

    pub async fn get_diet_plans_by_meal_type(
        &self,
        user_id: i64,
        meal_type: MealType,
    ) -> Result<Vec<DietPlan>, StoreError> {
        self.dao.list_by_meal_type(user_id, meal_type).await
    }

    pub fn observe_for_user(&self, user_id: i64) -> LiveQuery<Vec<DietPlan>> {
        self.dao.observe_for_user(user_id)
    }

    pub fn observe_by_meal_type(
        &self,
        user_id: i64,
        meal_type: MealType,
    ) -> LiveQuery<Vec<DietPlan>> {
        self.dao.observe_by_meal_type(user_id, meal_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::open_store;
    use crate::models::User;

    #[tokio::test]
    async fn test_get_diet_plans_by_meal_type() {
        let ctx = open_store().await;
        let user_id = ctx
            .store
            .users()
            .insert(&User::new("a@x.com", "p").with_id(1))
            .await
            .unwrap();
        assert_eq!(user_id, 1);
        let repo = DietPlanRepository::new(&ctx.store);

        repo.add(&DietPlan::new(1, "Eggs", MealType::Breakfast))
            .await
            .unwrap();
        repo.add(&DietPlan::new(1, "Rice", MealType::Lunch))
            .await
            .unwrap();

        let breakfast = repo
            .get_diet_plans_by_meal_type(1, MealType::Breakfast)
            .await
            .unwrap();
        assert_eq!(breakfast.len(), 1);
        assert_eq!(breakfast[0].food, "Eggs");
        assert_eq!(breakfast[0].meal_type, MealType::Breakfast);
    }
}
