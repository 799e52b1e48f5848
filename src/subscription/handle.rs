//! # Subscription: the consumer end of a broadcast channel.
//!
//! A [`Subscription`] reads from its own single-slot buffer. It never sees
//! history: at any point it holds at most the latest value it has not yet read.
//!
//! ## Teardown
//! Dropping a subscription (or calling [`Subscription::cancel`]) detaches it
//! from the channel. Detaching is a no-op for a subscription the channel
//! already closed, so each subscription leaves the channel's list exactly once.

use std::fmt;
use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;

use crate::channel::Shared;
use crate::error::BroadcastError;

use super::slot::Slot;

/// Consumer handle created by [`ConflatedBroadcast::subscribe`](crate::ConflatedBroadcast::subscribe).
///
/// ### Properties
/// - **Conflated**: a value not read before the next send is replaced by it.
/// - **Seeded**: a subscription opened after a send starts with the latest value.
/// - **Close-aware**: once the channel closes, the remaining buffered value is
///   delivered, then every read reports the close cause.
pub struct Subscription<T> {
    slot: Arc<Slot<T>>,
    shared: Arc<Shared<T>>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(slot: Arc<Slot<T>>, shared: Arc<Shared<T>>) -> Self {
        Self { slot, shared }
    }

    /// Waits for the next value.
    ///
    /// Returns [`BroadcastError::Closed`] or [`BroadcastError::ClosedWithCause`]
    /// once the channel is closed and the buffered value (if any) was read.
    pub async fn recv(&mut self) -> Result<T, BroadcastError> {
        poll_fn(|cx| self.slot.poll_take(cx)).await
    }

    /// Takes the buffered value without waiting.
    ///
    /// - `Ok(Some(v))` → the latest unread value
    /// - `Ok(None)` → nothing new since the last read
    /// - `Err(_)` → the channel is closed and nothing is left to read
    pub fn try_recv(&mut self) -> Result<Option<T>, BroadcastError> {
        self.slot.try_take().transpose()
    }

    /// Polls for the next value; the building block of [`recv`](Self::recv).
    pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Result<T, BroadcastError>> {
        self.slot.poll_take(cx)
    }

    /// True once this subscription will never receive a new value.
    pub fn is_closed(&self) -> bool {
        self.slot.is_closed()
    }

    /// Tears the subscription down, detaching it from the channel.
    ///
    /// Same as dropping it.
    pub fn cancel(self) {
        drop(self);
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.shared.detach(&self.slot);
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    /// Yields values until the channel is closed; the close cause is not surfaced.
    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().slot.poll_take(cx).map(Result::ok)
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.shared.name())
            .field("closed", &self.is_closed())
            .finish()
    }
}
