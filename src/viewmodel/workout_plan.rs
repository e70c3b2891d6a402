use tokio::sync::watch;

use super::{spawn_snapshot, Background, Pending, ViewError};
use crate::db::{LiveQuery, Store};
use crate::models::WorkoutPlan;
use crate::repository::WorkoutPlanRepository;

/// Workout checklist for the signed-in user.
pub struct WorkoutPlanViewModel {
    repository: WorkoutPlanRepository,
    user: watch::Sender<Option<i64>>,
    plans: watch::Receiver<Vec<WorkoutPlan>>,
    background: Background,
}

impl WorkoutPlanViewModel {
    pub fn new(store: &Store) -> Self {
        let repository = WorkoutPlanRepository::new(store);
        let (user, current) = watch::channel(None);
        let mut background = Background::new("workout plans");

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

    /// Latest plans for the current user, newest first.
    pub fn plans(&self) -> watch::Receiver<Vec<WorkoutPlan>> {
        self.plans.clone()
    }

    /// Live plans for the current user, independent of the cached snapshot.
    pub fn stream(&self) -> Result<LiveQuery<Vec<WorkoutPlan>>, ViewError> {
        let user_id = self.current_user().ok_or(ViewError::NoCurrentUser)?;
        Ok(self.repository.observe_for_user(user_id))
    }

    pub fn search(&self, term: &str) -> Result<LiveQuery<Vec<WorkoutPlan>>, ViewError> {
        let user_id = self.current_user().ok_or(ViewError::NoCurrentUser)?;
        Ok(self.repository.search(user_id, term))
    }

    pub fn add(&self, content: &str, target_sets: i32) -> Pending<WorkoutPlan> {
        let Some(user_id) = self.current_user() else {
            return self.background.reject("add", ViewError::NoCurrentUser);
        };
        let plan = WorkoutPlan::new(user_id, content, target_sets);
        let repository = self.repository.clone();
        self.background
            .submit("add", async move { repository.add(&plan).await })
    }

    pub fn update(&self, plan: WorkoutPlan) -> Pending<()> {
        let repository = self.repository.clone();
        self.background
            .submit("update", async move { repository.update(&plan).await })
    }

    /// Marks one more set as done and stores the result.
    pub fn record_set(&self, mut plan: WorkoutPlan) -> Pending<WorkoutPlan> {
        plan.record_set();
        let repository = self.repository.clone();
        self.background.submit("record set", async move {
            repository.update(&plan).await?;
            Ok(plan)
        })
    }

    pub fn delete(&self, plan: WorkoutPlan) -> Pending<()> {
        let repository = self.repository.clone();
        self.background
            .submit("delete", async move { repository.delete(&plan).await })
    }

    /// Removes every plan of the current user.
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
