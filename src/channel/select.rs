//! # Send as a select branch.
//!
//! [`SendClause`] lets a send take part in a multi-way choice. Sending never
//! waits, so the clause is resolved eagerly at registration:
//!
//! ```text
//! register()  ──► try_send(value) ──► ClauseOutcome::{Sent, Closed}
//! process()   ──► Sent   → Ok(&channel)
//!                 Closed → Err(stored cause | Closed)
//! ```
//!
//! The clause is also a [`Future`] that is ready on its first poll, so it can be
//! used directly as a `tokio::select!` branch:
//!
//! ```
//! use conflated_broadcast::ConflatedBroadcast;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let ch = ConflatedBroadcast::new();
//! let mut sub = ch.subscribe();
//!
//! tokio::select! {
//!     sent = ch.on_send(1) => assert!(sent.is_ok()),
//!     _ = tokio::time::sleep(std::time::Duration::from_secs(1)) => unreachable!(),
//! }
//! assert_eq!(sub.recv().await.unwrap(), 1);
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::{BroadcastError, TrySendError};

use super::core::ConflatedBroadcast;

/// Eager result of registering a [`SendClause`].
#[derive(Debug)]
pub enum ClauseOutcome<T> {
    /// The value was recorded and fanned out.
    Sent,
    /// The channel was closed; the value is handed back.
    Closed(TrySendError<T>),
}

/// Send branch of a select, built by [`ConflatedBroadcast::on_send`].
#[must_use = "a send clause does nothing until registered or polled"]
pub struct SendClause<'a, T> {
    channel: &'a ConflatedBroadcast<T>,
    value: Option<T>,
}

impl<'a, T: Clone> SendClause<'a, T> {
    /// Registration hook: performs the send right away and reports its outcome.
    ///
    /// # Panics
    /// If called again after the clause was already registered or polled to completion.
    pub fn register(&mut self) -> ClauseOutcome<T> {
        let value = self
            .value
            .take()
            .expect("send clause registered after completion");
        match self.channel.try_send(value) {
            Ok(()) => ClauseOutcome::Sent,
            Err(e) => ClauseOutcome::Closed(e),
        }
    }

    /// Result translation hook: a sent clause resolves to the channel itself,
    /// a closed one to the stored cause (or [`BroadcastError::Closed`]).
    pub fn process(
        &self,
        outcome: ClauseOutcome<T>,
    ) -> Result<&'a ConflatedBroadcast<T>, BroadcastError> {
        match outcome {
            ClauseOutcome::Sent => Ok(self.channel),
            ClauseOutcome::Closed(e) => Err(e.into_parts().1),
        }
    }
}

// never pin-projected
impl<T> Unpin for SendClause<'_, T> {}

impl<'a, T: Clone> Future for SendClause<'a, T> {
    type Output = Result<&'a ConflatedBroadcast<T>, BroadcastError>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let outcome = this.register();
        Poll::Ready(this.process(outcome))
    }
}

impl<T: Clone> ConflatedBroadcast<T> {
    /// Builds a select branch that sends `value`.
    pub fn on_send(&self, value: T) -> SendClause<'_, T> {
        SendClause {
            channel: self,
            value: Some(value),
        }
    }
}
