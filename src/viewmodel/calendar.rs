use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;

use super::{spawn_snapshot, Background, Pending, ViewError};
use crate::db::{LiveQuery, Store};
use crate::models::CalendarEvent;
use crate::remote::{
    fetch_remote_events, insert_remote_event, AccountHandle, CalendarService, RemoteOutcome,
    TimeWindow,
};
use crate::repository::CalendarEventRepository;

/// Calendar screen: local events for the signed-in user plus optional
/// synchronisation with a remote calendar.
pub struct CalendarViewModel {
    repository: CalendarEventRepository,
    service: Arc<dyn CalendarService>,
    user: watch::Sender<Option<i64>>,
    events: watch::Receiver<Vec<CalendarEvent>>,
    background: Background,
}

impl CalendarViewModel {
    pub fn new(store: &Store, service: Arc<dyn CalendarService>) -> Self {
        let repository = CalendarEventRepository::new(store);
        let (user, current) = watch::channel(None);
        let mut background = Background::new("calendar");

        let source = repository.clone();
        let (events, task) = spawn_snapshot(current, background.errors(), move |user_id| {
            source.observe_for_user(user_id)
        });
        background.track(task);

        Self {
            repository,
            service,
            user,
            events,
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

    /// Latest events for the current user in start order.
    pub fn events(&self) -> watch::Receiver<Vec<CalendarEvent>> {
        self.events.clone()
    }

    pub fn stream(&self) -> Result<LiveQuery<Vec<CalendarEvent>>, ViewError> {
        let user_id = self.current_user().ok_or(ViewError::NoCurrentUser)?;
        Ok(self.repository.observe_for_user(user_id))
    }

    /// Live events starting in `[from, to)`.
    pub fn between(&self, from: &str, to: &str) -> Result<LiveQuery<Vec<CalendarEvent>>, ViewError> {
        let user_id = self.current_user().ok_or(ViewError::NoCurrentUser)?;
        Ok(self.repository.observe_between(user_id, from, to))
    }

    pub fn add(&self, summary: &str, start: &str, end: &str) -> Pending<CalendarEvent> {
        let Some(user_id) = self.current_user() else {
            return self.background.reject("add", ViewError::NoCurrentUser);
        };
        let event = CalendarEvent::new(user_id, summary, start, end);
        let repository = self.repository.clone();
        self.background
            .submit("add", async move { repository.add(&event).await })
    }

    pub fn update(&self, event: CalendarEvent) -> Pending<()> {
        let repository = self.repository.clone();
        self.background
            .submit("update", async move { repository.update(&event).await })
    }

    pub fn set_finished(&self, event: CalendarEvent, finished: bool) -> Pending<CalendarEvent> {
        let repository = self.repository.clone();
        self.background.submit("set finished", async move {
            repository.set_finished(&event, finished).await
        })
    }

    pub fn delete(&self, event: CalendarEvent) -> Pending<()> {
        let repository = self.repository.clone();
        self.background
            .submit("delete", async move { repository.delete(&event).await })
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

    /// Pulls the account's events in `window` and stores the ones not yet
    /// present locally. `Ready` carries the number of new rows.
    ///
    /// Remote failures are part of the outcome; only store failures make the
    /// pending write fail.
    pub fn sync_from_remote(
        &self,
        account: AccountHandle,
        window: TimeWindow,
    ) -> Pending<RemoteOutcome<usize>> {
        let Some(user_id) = self.current_user() else {
            return self.background.reject("sync", ViewError::NoCurrentUser);
        };
        let repository = self.repository.clone();
        let service = self.service.clone();
        self.background.submit("sync", async move {
            let outcome = match fetch_remote_events(&*service, &account, &window, user_id).await {
                RemoteOutcome::Ready(events) => {
                    let added = repository.mirror_remote(user_id, &events).await?;
                    tracing::info!(
                        "Mirrored {} of {} remote event(s) for {}",
                        added,
                        events.len(),
                        account.email
                    );
                    RemoteOutcome::Ready(added)
                }
                RemoteOutcome::Empty => RemoteOutcome::Empty,
                RemoteOutcome::NeedsReauthorization => RemoteOutcome::NeedsReauthorization,
                RemoteOutcome::Unavailable(reason) => RemoteOutcome::Unavailable(reason),
            };
            Ok(outcome)
        })
    }

    /// Creates an event on the remote calendar. The local copy arrives with
    /// the next sync.
    pub fn push_remote(
        &self,
        account: AccountHandle,
        title: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Pending<RemoteOutcome<()>> {
        let service = self.service.clone();
        self.background.submit("push", async move {
            Ok(insert_remote_event(&*service, &account, &title, start, end).await)
        })
    }

    pub fn last_error(&self) -> watch::Receiver<Option<String>> {
        self.background.last_error()
    }
}
