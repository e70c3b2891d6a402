use tokio::sync::watch;

use super::{spawn_snapshot, Background, Pending, ViewError};
use crate::db::{LiveQuery, Store};
use crate::models::{DietPlan, MealType};
use crate::repository::DietPlanRepository;

pub struct DietPlanViewModel {
    repository: DietPlanRepository,
    user: watch::Sender<Option<i64>>,
    plans: watch::Receiver<Vec<DietPlan>>,
    background: Background,
}

impl DietPlanViewModel {
    pub fn new(store: &Store) -> Self {
        let repository = DietPlanRepository::new(store);
        let (user, current) = watch::channel(None);
        let mut background = Background::new("diet plans");

        let source = repository.clone();
        let (plans, task) = spawn_snapshot(current, background.errors(), move |user_id| {
            source.observe_for_user(user_id)
        });
        background.track(task);

        Self {
            repository,
            user,
            plans,
            background,
        }
    }

    pub fn set_current_user(&self, user_id: i64) {
        self.user.send_replace(Some(user_id));
    }

    pub fn clear_current_user(&self) {
        self.user.send_replace(None);
    }

    pub fn current_user(&self) -> Option<i64> {
        *self.user.borrow()
    }

    pub fn plans(&self) -> watch::Receiver<Vec<DietPlan>> {
        self.plans.clone()
    }

    pub fn stream(&self) -> Result<LiveQuery<Vec<DietPlan>>, ViewError> {
        let user_id = self.current_user().ok_or(ViewError::NoCurrentUser)?;
        Ok(self.repository.observe_for_user(user_id))
    }

    /// Live entries for one meal of the current user.
    pub fn by_meal_type(&self, meal_type: MealType) -> Result<LiveQuery<Vec<DietPlan>>, ViewError> {
        let user_id = self.current_user().ok_or(ViewError::NoCurrentUser)?;
        Ok(self.repository.observe_by_meal_type(user_id, meal_type))
    }

    pub fn add(&self, food: &str, meal_type: MealType) -> Pending<DietPlan> {
        let Some(user_id) = self.current_user() else {
            return self.background.reject("add", ViewError::NoCurrentUser);
        };
        let plan = DietPlan::new(user_id, food, meal_type);
        let repository = self.repository.clone();
        self.background
            .submit("add", async move { repository.add(&plan).await })
    }

    pub fn update(&self, plan: DietPlan) -> Pending<()> {
        let repository = self.repository.clone();
        self.background
            .submit("update", async move { repository.update(&plan).await })
    }

    pub fn delete(&self, plan: DietPlan) -> Pending<()> {
        let repository = self.repository.clone();
        self.background
            .submit("delete", async move { repository.delete(&plan).await })
    }

    pub fn delete_all(&self) -> Pending<u64> {
        let Some(user_id) = self.current_user() else {
            return self.background.reject("delete all", ViewError::NoCurrentUser);
        };
        let repository = self.repository.clone();
        self.background.submit("delete all", async move {
            repository.delete_all_for_user(user_id).await
        })
    }

    pub fn last_error(&self) -> watch::Receiver<Option<String>> {
        self.background.last_error()
    }
}
