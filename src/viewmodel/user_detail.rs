use tokio::sync::watch;

use super::{spawn_snapshot, Background, Pending, ViewError};
use crate::db::Store;
use crate::models::UserDetail;
use crate::repository::UserDetailRepository;

/// Profile screen for the signed-in user.
pub struct UserDetailViewModel {
    repository: UserDetailRepository,
    user: watch::Sender<Option<i64>>,
    detail: watch::Receiver<Option<UserDetail>>,
    background: Background,
}

impl UserDetailViewModel {
    pub fn new(store: &Store) -> Self {
        let repository = UserDetailRepository::new(store);
        let (user, current) = watch::channel(None);
        let mut background = Background::new("user detail");

        let source = repository.clone();
        let (detail, task) =
            spawn_snapshot(current, background.errors(), move |user_id| source.observe(user_id));
        background.track(task);

        Self {
            repository,
            user,
            detail,
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

    /// The current user's profile, `None` until one is saved.
    pub fn detail(&self) -> watch::Receiver<Option<UserDetail>> {
        self.detail.clone()
    }

    /// Creates or replaces the current user's profile. The `user_id` on
    /// `detail` is overwritten with the current user.
    pub fn save(&self, mut detail: UserDetail) -> Pending<()> {
        let Some(user_id) = self.current_user() else {
            return self.background.reject("save", ViewError::NoCurrentUser);
        };
        detail.user_id = user_id;
        let repository = self.repository.clone();
        self.background
            .submit("save", async move { repository.upsert(&detail).await })
    }

    pub fn delete(&self, detail: UserDetail) -> Pending<()> {
        let repository = self.repository.clone();
        self.background
            .submit("delete", async move { repository.delete(&detail).await })
    }

    pub fn last_error(&self) -> watch::Receiver<Option<String>> {
        self.background.last_error()
    }
}
