use crate::db::{CalendarEventDao, LiveQuery, Store, StoreError};
use crate::models::CalendarEvent;

#[derive(Clone)]
pub struct CalendarEventRepository {
    dao: CalendarEventDao,
}

impl CalendarEventRepository {
    pub fn new(store: &Store) -> Self {
        Self {
            dao: store.calendar_events(),
        }
    }

    pub async fn add(&self, event: &CalendarEvent) -> Result<CalendarEvent, StoreError> {
        let id = self.dao.insert(event).await?;
        let mut stored = event.clone();
        stored.id = Some(id);
        Ok(stored)
    }

    pub async fn update(&self, event: &CalendarEvent) -> Result<(), StoreError> {
        self.dao.update(event).await
    }

    pub async fn set_finished(
        &self,
        event: &CalendarEvent,
        finished: bool,
    ) -> Result<CalendarEvent, StoreError> {
        let mut updated = event.clone();
        updated.is_finished = finished;
        self.dao.update(&updated).await?;
        Ok(updated)
    }

    pub async fn delete(&self, event: &CalendarEvent) -> Result<(), StoreError> {
        self.dao.delete(event).await
    }

    pub async fn delete_all_for_user(&self, user_id: i64) -> Result<u64, StoreError> {
        self.dao.delete_all_for_user(user_id).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<CalendarEvent>, StoreError> {
        self.dao.get_by_id(id).await
    }

    pub fn observe_for_user(&self, user_id: i64) -> LiveQuery<Vec<CalendarEvent>> {
        self.dao.observe_for_user(user_id)
    }

    pub fn observe_between(
        &self,
        user_id: i64,
        from: &str,
        to: &str,
    ) -> LiveQuery<Vec<CalendarEvent>> {
        self.dao.observe_between(user_id, from, to)
    }

    /// Stores events fetched from a remote calendar for `user_id`, skipping
    /// any already present with the same summary and time span. Returns how
    /// many were inserted.
    pub async fn mirror_remote(
        &self,
        user_id: i64,
        events: &[CalendarEvent],
    ) -> Result<usize, StoreError> {
        let mut fresh = Vec::new();
        for event in events {
            let existing = self
                .dao
                .find_matching(user_id, &event.summary, &event.start, &event.end)
                .await?;
            let already_queued = fresh.iter().any(|e: &CalendarEvent| {
                e.summary == event.summary && e.start == event.start && e.end == event.end
            });
            if existing.is_none() && !already_queued {
                let mut local = event.clone();
                local.id = None;
                local.user_id = user_id;
                fresh.push(local);
            }
        }

        if !fresh.is_empty() {
            self.dao.insert_many(&fresh).await?;
        }
        Ok(fresh.len())
    }
}
