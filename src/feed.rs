//! Change feed - Push-on-change list queries for the presentation layer.
//!
//! Writers publish a [`Change`] naming the kind of record they touched. A
//! [`Subscription`] re-runs its query whenever a change of a kind it cares
//! about arrives and exposes the latest result through a `watch` channel.

use crate::errors::Result;
use std::future::Future;
use tokio::sync::{broadcast, broadcast::error::RecvError, watch};
use tokio::task::JoinHandle;
use tracing::{trace, warn};

/// Kind of record a write touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Change {
    Users,
    Cars,
    CarImages,
    Reservations,
    Ratings,
}

/// Broadcast of [`Change`] events within one process.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<Change>,
}

impl ChangeFeed {
    /// Creates a feed buffering up to `capacity` unread changes per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Announces a write. Having no subscribers is not an error.
    pub fn publish(&self, change: Change) {
        let receivers = self.sender.send(change).unwrap_or(0);
        trace!(?change, receivers, "Published change");
    }

    /// Raw receiver for callers that want the events themselves.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.sender.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Latest result of a live query. The background task stops when this is dropped.
#[derive(Debug)]
pub struct Subscription<T> {
    receiver: watch::Receiver<Vec<T>>,
    task: JoinHandle<()>,
}

impl<T: Clone> Subscription<T> {
    /// Snapshot of the most recent query result.
    #[must_use]
    pub fn current(&self) -> Vec<T> {
        self.receiver.borrow().clone()
    }

    /// Waits for the next refreshed result. `None` once the feed has shut down.
    pub async fn changed(&mut self) -> Option<Vec<T>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Runs `query` now and again after every change in `kinds`.
///
/// A subscriber that fell behind re-queries instead of failing. A failing
/// re-query is logged and the previous result kept.
///
/// # Errors
/// Returns the error of the initial query.
pub async fn watch_query<T, F, Fut>(
    feed: &ChangeFeed,
    kinds: &[Change],
    query: F,
) -> Result<Subscription<T>>
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<T>>> + Send,
{
    // Subscribe first so a write racing the initial query is not missed
    let mut changes = feed.subscribe();
    let initial = query().await?;
    let (sender, receiver) = watch::channel(initial);
    let kinds = kinds.to_vec();

    let task = tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(change) if !kinds.contains(&change) => continue,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
            match query().await {
                Ok(rows) => {
                    if sender.send(rows).is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "Live query refresh failed"),
            }
        }
    });

    Ok(Subscription { receiver, task })
}
