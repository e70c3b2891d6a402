//! Observable result sets.
//!
//! Writers notify a [`ChangeFeed`] with the tables they touched; a
//! [`LiveQuery`] re-runs its fetch whenever its table changes and yields the
//! fresh snapshot. Nothing here knows about SQLite: any store that notifies
//! the feed after committing can back a live query.

use futures::stream::{self, BoxStream, StreamExt};
use std::fmt;
use std::future::Future;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};

use super::error::StoreError;

const FEED_CAPACITY: usize = 64;

/// Tables in the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    UserDetails,
    WorkoutPlans,
    DietPlans,
    CalendarEvents,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Users,
        Table::UserDetails,
        Table::WorkoutPlans,
        Table::DietPlans,
        Table::CalendarEvents,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::UserDetails => "user_details",
            Table::WorkoutPlans => "workout_plans",
            Table::DietPlans => "diet_plans",
            Table::CalendarEvents => "calendar_events",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Broadcasts which tables changed.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<Table>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self { sender }
    }

    pub fn notify(&self, table: Table) {
        // No receivers just means nobody is observing
        let _ = self.sender.send(table);
    }

    pub fn notify_all(&self) {
        for table in Table::ALL {
            self.notify(table);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Table> {
        self.sender.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// A cold, restartable stream of snapshots.
///
/// The first poll emits the current result; every later item follows a
/// change to the observed table. The stream only ends once the feed's
/// sender (the store) is gone.
pub type LiveQuery<S> = BoxStream<'static, Result<S, StoreError>>;

enum Phase {
    Pending(ChangeFeed),
    Live(broadcast::Receiver<Table>),
}

/// Builds a [`LiveQuery`] that re-runs `fetch` after each change to `table`.
pub fn live_query<S, F, Fut>(feed: ChangeFeed, table: Table, fetch: F) -> LiveQuery<S>
where
    S: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<S, StoreError>> + Send + 'static,
{
    stream::unfold(
        (Phase::Pending(feed), fetch),
        move |(phase, fetch)| async move {
            let receiver = match phase {
                // Subscribe before the first fetch so no write slips between them
                Phase::Pending(feed) => feed.subscribe(),
                Phase::Live(mut receiver) => {
                    if !wait_for_change(&mut receiver, table).await {
                        return None;
                    }
                    receiver
                }
            };
            let snapshot = fetch().await;
            Some((snapshot, (Phase::Live(receiver), fetch)))
        },
    )
    .boxed()
}

/// Waits for a change to `table`, then drains queued notifications so a
/// burst of writes costs a single re-fetch. Returns false once the feed is
/// closed.
async fn wait_for_change(receiver: &mut broadcast::Receiver<Table>, table: Table) -> bool {
    loop {
        match receiver.recv().await {
            Ok(changed) if changed == table => break,
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Live query on {} lagged by {} change(s)", table, skipped);
                break;
            }
            Err(RecvError::Closed) => return false,
        }
    }

    loop {
        match receiver.try_recv() {
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn counting_query(feed: &ChangeFeed, table: Table) -> (LiveQuery<usize>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let query = live_query(feed.clone(), table, move || {
            let counter = counter.clone();
            async move { Ok(counter.fetch_add(1, Ordering::SeqCst) + 1) }
        });
        (query, calls)
    }

    #[tokio::test]
    async fn test_first_poll_emits_current_snapshot() {
        let feed = ChangeFeed::new();
        let (mut query, _) = counting_query(&feed, Table::WorkoutPlans);

        assert_eq!(query.next().await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reemits_on_matching_change() {
        let feed = ChangeFeed::new();
        let (mut query, _) = counting_query(&feed, Table::WorkoutPlans);
        query.next().await.unwrap().unwrap();

        feed.notify(Table::WorkoutPlans);
        assert_eq!(query.next().await.unwrap().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_ignores_other_tables() {
        let feed = ChangeFeed::new();
        let (mut query, calls) = counting_query(&feed, Table::WorkoutPlans);
        query.next().await.unwrap().unwrap();

        feed.notify(Table::DietPlans);
        let next = tokio::time::timeout(Duration::from_millis(50), query.next()).await;
        assert!(next.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_burst_is_coalesced() {
        let feed = ChangeFeed::new();
        let (mut query, calls) = counting_query(&feed, Table::DietPlans);
        query.next().await.unwrap().unwrap();

        for _ in 0..10 {
            feed.notify(Table::DietPlans);
        }
        query.next().await.unwrap().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_lagged_receiver_refetches() {
        let feed = ChangeFeed::new();
        let (mut query, _) = counting_query(&feed, Table::Users);
        query.next().await.unwrap().unwrap();

        for _ in 0..(FEED_CAPACITY * 2) {
            feed.notify(Table::CalendarEvents);
        }
        assert_eq!(query.next().await.unwrap().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_ends_when_feed_dropped() {
        let feed = ChangeFeed::new();
        let (mut query, _) = counting_query(&feed, Table::Users);
        query.next().await.unwrap().unwrap();

        drop(feed);
        assert!(query.next().await.is_none());
    }
}
