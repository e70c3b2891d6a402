//! Per-screen view-state holders.
//!
//! A holder owns one repository, a current-user cell and a [`Background`]
//! worker. Reads are exposed as live streams or as `watch` snapshots that
//! follow the current user; writes are queued on the worker and return a
//! [`Pending`] the caller may await or drop.
//!
//! Holders spawn tasks, so they must be created inside a Tokio runtime.
//! Dropping a holder aborts its worker and snapshot tasks.

mod calendar;
mod diet_plan;
mod user;
mod user_detail;
mod workout_plan;

pub use calendar::CalendarViewModel;
pub use diet_plan::DietPlanViewModel;
pub use user::{AuthError, AuthState, UserViewModel};
pub use user_detail::UserDetailViewModel;
pub use workout_plan::WorkoutPlanViewModel;

use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use std::future::Future;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::db::{LiveQuery, StoreError};

#[derive(Error, Debug)]
pub enum ViewError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("No user is signed in")]
    NoCurrentUser,

    /// The holder was dropped before the write ran.
    #[error("Operation cancelled")]
    Cancelled,
}

/// Handle to a queued write.
///
/// Dropping it does not cancel the write; failures are still logged and
/// published on the holder's `last_error` channel.
#[must_use = "await the pending write or drop it explicitly to fire and forget"]
pub struct Pending<T> {
    receiver: oneshot::Receiver<Result<T, ViewError>>,
}

impl<T> Pending<T> {
    fn ready(result: Result<T, ViewError>) -> Self {
        let (sender, receiver) = oneshot::channel();
        let _ = sender.send(result);
        Self { receiver }
    }

    pub async fn wait(self) -> Result<T, ViewError> {
        self.receiver.await.unwrap_or(Err(ViewError::Cancelled))
    }
}

type Job = BoxFuture<'static, ()>;

/// Single background worker owned by one holder.
///
/// Jobs run one at a time in submission order.
pub(crate) struct Background {
    label: &'static str,
    jobs: mpsc::UnboundedSender<Job>,
    worker: JoinHandle<()>,
    tasks: Vec<JoinHandle<()>>,
    last_error: watch::Sender<Option<String>>,
}

impl Background {
    pub(crate) fn new(label: &'static str) -> Self {
        let (jobs, mut queue) = mpsc::unbounded_channel::<Job>();
        let worker = tokio::spawn(async move {
            while let Some(job) = queue.recv().await {
                job.await;
            }
        });
        let (last_error, _) = watch::channel(None);
        Self {
            label,
            jobs,
            worker,
            tasks: Vec::new(),
            last_error,
        }
    }

    /// Queues `operation`, reporting a failure under `name`.
    pub(crate) fn submit<T, Fut>(&self, name: &'static str, operation: Fut) -> Pending<T>
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, StoreError>> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let label = self.label;
        let last_error = self.last_error.clone();
        let job = async move {
            let result = operation.await.map_err(ViewError::from);
            if let Err(e) = &result {
                tracing::warn!("{} {} failed: {}", label, name, e);
                last_error.send_replace(Some(format!("{}: {}", name, e)));
            }
            let _ = sender.send(result);
        }
        .boxed();

        if self.jobs.send(job).is_err() {
            tracing::warn!("{} worker stopped; dropping {}", label, name);
        }
        Pending { receiver }
    }

    /// Fails a write before it reaches the queue.
    pub(crate) fn reject<T>(&self, name: &'static str, error: ViewError) -> Pending<T> {
        tracing::warn!("{} {} rejected: {}", self.label, name, error);
        self.last_error
            .send_replace(Some(format!("{}: {}", name, error)));
        Pending::ready(Err(error))
    }

    /// Ties a task's lifetime to this worker.
    pub(crate) fn track(&mut self, task: JoinHandle<()>) {
        self.tasks.push(task);
    }

    pub(crate) fn errors(&self) -> watch::Sender<Option<String>> {
        self.last_error.clone()
    }

    pub(crate) fn last_error(&self) -> watch::Receiver<Option<String>> {
        self.last_error.subscribe()
    }
}

impl Drop for Background {
    fn drop(&mut self) {
        self.worker.abort();
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Feeds a `watch` snapshot from whichever live query belongs to the
/// current user, switching queries when the user changes and resetting to
/// `S::default()` when the user is cleared.
pub(crate) fn spawn_snapshot<S, F>(
    mut user: watch::Receiver<Option<i64>>,
    errors: watch::Sender<Option<String>>,
    open: F,
) -> (watch::Receiver<S>, JoinHandle<()>)
where
    S: Default + Send + Sync + 'static,
    F: Fn(i64) -> LiveQuery<S> + Send + Sync + 'static,
{
    let (sender, receiver) = watch::channel(S::default());
    let task = tokio::spawn(async move {
        let mut query = (*user.borrow_and_update()).map(&open);
        loop {
            tokio::select! {
                changed = user.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = *user.borrow_and_update();
                    // Dropping the old stream cancels its subscription
                    query = current.map(&open);
                    if query.is_none() {
                        sender.send_replace(S::default());
                    }
                }
                next = next_snapshot(&mut query) => match next {
                    Some(Ok(snapshot)) => {
                        sender.send_replace(snapshot);
                    }
                    Some(Err(e)) => {
                        tracing::warn!("Live query failed: {}", e);
                        errors.send_replace(Some(e.to_string()));
                    }
                    None => query = None,
                }
            }
        }
    });
    (receiver, task)
}

async fn next_snapshot<S>(query: &mut Option<LiveQuery<S>>) -> Option<Result<S, StoreError>> {
    match query {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}
