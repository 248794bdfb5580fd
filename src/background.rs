//! Tracked background work.
//!
//! Tasks spawned here are never detached: [`BackgroundTasks::shutdown`] waits
//! for every one of them. Failures go to the operator log.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

#[derive(Default)]
struct Inner {
    set: JoinSet<anyhow::Result<()>>,
    closed: bool,
}

#[derive(Clone, Default)]
pub struct BackgroundTasks {
    inner: Arc<Mutex<Inner>>,
}

impl BackgroundTasks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `task` and reaps whatever has already finished.
    ///
    /// Once [`shutdown`](Self::shutdown) has started nothing new is tracked:
    /// the task runs to completion on the caller instead.
    pub async fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let mut inner = self.inner.lock().await;

        if inner.closed {
            drop(inner);
            warn!(task = name, "Shutting down, running background task inline");
            if let Err(e) = task.await {
                error!(task = name, error = %e, "Background task failed");
            }
            return;
        }

        while let Some(result) = inner.set.try_join_next() {
            log_outcome(result);
        }

        inner.set.spawn(async move {
            let result = task.await;
            if let Err(ref e) = result {
                error!(task = name, error = %e, "Background task failed");
            }
            result
        });

        let in_flight = inner.set.len();
        metrics::gauge!("background_tasks_in_flight").set(in_flight as f64);
        debug!(task = name, in_flight, "Background task spawned");
    }

    pub async fn in_flight(&self) -> usize {
        self.inner.lock().await.set.len()
    }

    /// Waits for every task spawned so far. New spawns are still accepted.
    pub async fn drain(&self) {
        let mut inner = self.inner.lock().await;
        let pending = inner.set.len();
        if pending > 0 {
            info!(pending, "Waiting for background tasks");
        }

        while let Some(result) = inner.set.join_next().await {
            log_outcome(result);
        }

        metrics::gauge!("background_tasks_in_flight").set(0.0);
    }

    /// Stops tracking new work, then blocks until every tracked task has completed.
    pub async fn shutdown(&self) {
        self.inner.lock().await.closed = true;
        self.drain().await;
        info!("Background tasks drained");
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.closed
    }
}

fn log_outcome(result: Result<anyhow::Result<()>, tokio::task::JoinError>) {
    match result {
        // Task-level errors are logged inside the task itself.
        Ok(_) => {}
        Err(e) if e.is_panic() => error!(error = %e, "Background task panicked"),
        Err(e) => error!(error = %e, "Background task was cancelled"),
    }
}
