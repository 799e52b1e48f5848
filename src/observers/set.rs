//! # ObserverSet: background workers over one channel
//!
//! [`ObserverSet`] subscribes once per [`Observe`] implementation and drives
//! each subscription from its own tokio task.
//!
//! ## What it guarantees
//! - Spawning never blocks the channel; senders are unaffected by slow observers.
//! - Per-observer monotonic view (values arrive in send order, some skipped).
//! - Panics inside `on_value` are caught and logged (isolation).
//! - `on_close` runs once per observer when the channel closes.
//!
//! ## What it does **not** guarantee
//! - No delivery of every value (conflated per observer).
//! - No ordering across different observers.
//!
//! ## Diagram
//! ```text
//!    ConflatedBroadcast::send(v)
//!        │
//!        ├────────────────► [slot O1] ─► worker O1 ─► on_value()
//!        ├────────────────► [slot O2] ─► worker O2 ─► on_value()
//!        └────────────────► [slot ON] ─► worker ON ─► on_value()
//! ```

use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

use crate::channel::ConflatedBroadcast;
use crate::subscription::Subscription;

use super::Observe;

/// Composite of observer workers, each with its own subscription.
///
/// Dropping the set stops its workers, as [`shutdown`](Self::shutdown) does,
/// without waiting for them.
pub struct ObserverSet {
    names: Vec<&'static str>,
    workers: Vec<JoinHandle<()>>,
    token: CancellationToken,
    _stop_on_drop: DropGuard,
}

impl ObserverSet {
    /// Subscribes every observer to `channel` and spawns one worker per observer.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn<T>(channel: &ConflatedBroadcast<T>, observers: Vec<Arc<dyn Observe<T>>>) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        let token = CancellationToken::new();
        let mut names = Vec::with_capacity(observers.len());
        let mut workers = Vec::with_capacity(observers.len());

        for obs in observers {
            let sub = channel.subscribe();
            names.push(obs.name());
            workers.push(tokio::spawn(run_worker(obs, sub, token.child_token())));
        }
        debug!(
            channel = channel.name(),
            observers = workers.len(),
            "observer workers started"
        );

        Self {
            names,
            workers,
            _stop_on_drop: token.clone().drop_guard(),
            token,
        }
    }

    /// Stops all workers and waits for them to exit.
    ///
    /// Each worker drops its subscription, detaching it from the channel.
    pub async fn shutdown(self) {
        self.token.cancel();
        for (name, h) in self.names.into_iter().zip(self.workers) {
            if let Err(e) = h.await {
                warn!(observer = name, error = %e, "observer worker did not exit cleanly");
            }
        }
    }

    /// Waits for all workers to finish on their own (after the channel closes).
    pub async fn join(self) {
        for (name, h) in self.names.into_iter().zip(self.workers) {
            if let Err(e) = h.await {
                warn!(observer = name, error = %e, "observer worker did not exit cleanly");
            }
        }
    }

    /// True if there are no observers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Number of observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.len()
    }
}

async fn run_worker<T>(obs: Arc<dyn Observe<T>>, mut sub: Subscription<T>, token: CancellationToken)
where
    T: Clone + Send + Sync + 'static,
{
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            next = sub.recv() => match next {
                Ok(value) => {
                    let fut = obs.on_value(&value);
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        warn!(
                            observer = obs.name(),
                            panic = %panic_message(panic_err.as_ref()),
                            "observer panicked"
                        );
                    }
                }
                Err(closed) => {
                    obs.on_close(closed.cause()).await;
                    break;
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
