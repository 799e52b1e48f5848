//! # ConflatedBroadcast: latest-value fan-out.
//!
//! [`ConflatedBroadcast`] keeps the most recently sent value and pushes every
//! new value into each live [`Subscription`]'s single-slot buffer.
//!
//! ## Architecture
//! ```text
//! Producers (many):                       Subscriptions (many):
//!   send(v) ──┐                        ┌──► [slot S1] ─► recv()
//!   send(v) ──┼──► lock ─► last = v ───┼──► [slot S2] ─► recv()
//!   close() ──┘                        └──► [slot SN] ─► recv()
//! ```
//!
//! ## Rules
//! - **Non-blocking**: no operation waits; each one completes or fails immediately.
//! - **Linearizable**: one lock covers every read and write, including the fan-out loop.
//! - **Lossy**: a subscription holds only the latest unread value.
//! - **Close once**: the first `close`/`cancel` wins; its cause is kept for late callers.
//! - **Handler once**: at most one close handler; it runs after the lock is released.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::config::Config;
use crate::error::{BroadcastError, Cancelled, Cause, TrySendError};
use crate::subscription::Subscription;
use crate::subscription::slot::{Lifecycle, Slot};

use super::state::{CloseHandler, HandlerSlot, LastValue, State};

/// State shared between a channel, its clones and its subscriptions.
pub(crate) struct Shared<T> {
    config: Config,
    state: Mutex<State<T>>,
}

impl<T> Shared<T> {
    pub(crate) fn name(&self) -> &'static str {
        self.config.name
    }

    /// Removes `slot` from the subscriber list on behalf of its consumer.
    ///
    /// A slot already closed by the channel is no longer listed and is skipped.
    pub(crate) fn detach(&self, slot: &Arc<Slot<T>>) {
        let mut st = self.state.lock();
        if !slot.abandon() {
            return;
        }
        match st.subscribers.iter().position(|s| Arc::ptr_eq(s, slot)) {
            Some(idx) => {
                st.subscribers.remove(idx);
                trace!(
                    channel = self.config.name,
                    subscribers = st.subscribers.len(),
                    "subscription detached"
                );
            }
            None => unreachable!("open subscription missing from subscriber list"),
        }
    }
}

/// Broadcast channel that conflates values: every subscriber observes only the
/// latest value at the time it reads.
///
/// Cloning is cheap and yields another handle to the same channel.
///
/// # Example
/// ```
/// use conflated_broadcast::ConflatedBroadcast;
///
/// let ch = ConflatedBroadcast::new();
/// let mut early = ch.subscribe();
/// ch.send(1).unwrap();
/// ch.send(2).unwrap();
///
/// // conflated: only the latest value is buffered
/// assert_eq!(early.try_recv().unwrap(), Some(2));
///
/// // late subscribers start with the latest value
/// let mut late = ch.subscribe();
/// assert_eq!(late.try_recv().unwrap(), Some(2));
///
/// assert!(ch.close(None));
/// assert!(ch.send(3).is_err());
/// ```
pub struct ConflatedBroadcast<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for ConflatedBroadcast<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone> Default for ConflatedBroadcast<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> ConflatedBroadcast<T> {
    /// Creates an open channel with no value.
    pub fn new() -> Self {
        Self::build(LastValue::Empty, Config::default())
    }

    /// Creates an open channel whose latest value is already `value`.
    pub fn with_value(value: T) -> Self {
        Self::build(LastValue::Value(value), Config::default())
    }

    /// Creates an open channel with no value and the given config.
    pub fn with_config(config: Config) -> Self {
        Self::build(LastValue::Empty, config)
    }

    fn build(last: LastValue<T>, config: Config) -> Self {
        let state = State::new(last, config.subscribers_hint_clamped());
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(state),
            }),
        }
    }

    /// Returns the latest value.
    ///
    /// ### Errors
    /// - [`BroadcastError::ClosedWithCause`] / [`BroadcastError::Closed`] once closed
    /// - [`BroadcastError::NoValueYet`] if open and nothing was sent
    pub fn value(&self) -> Result<T, BroadcastError> {
        let st = self.shared.state.lock();
        if let Some(cause) = st.closed_cause() {
            return Err(BroadcastError::closed(cause));
        }
        st.last.as_option().cloned().ok_or(BroadcastError::NoValueYet)
    }

    /// Returns the latest value, or `None` wherever [`value`](Self::value) would fail.
    pub fn value_or_none(&self) -> Option<T> {
        self.value().ok()
    }

    /// True once the channel has been closed or cancelled.
    pub fn is_closed_for_send(&self) -> bool {
        self.shared.state.lock().lifecycle.is_closed()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.shared.state.lock().subscribers.len()
    }

    /// Opens a new subscription.
    ///
    /// If a value was sent, the subscription starts with it buffered. On a closed
    /// channel the subscription is already closed with the stored cause and
    /// receives nothing.
    pub fn subscribe(&self) -> Subscription<T> {
        let slot = Slot::new();
        {
            let mut st = self.shared.state.lock();
            match &st.lifecycle {
                Lifecycle::Closed(cause) => {
                    slot.close(cause.clone());
                }
                Lifecycle::Open => {
                    if let Some(v) = st.last.as_option() {
                        slot.offer(v.clone());
                    }
                    st.subscribers.push(Arc::clone(&slot));
                    trace!(
                        channel = self.shared.config.name,
                        subscribers = st.subscribers.len(),
                        "subscription opened"
                    );
                }
            }
        }
        Subscription::new(slot, Arc::clone(&self.shared))
    }

    /// Records `value` as the latest and pushes it to every subscription.
    ///
    /// Never waits. On a closed channel the value is dropped and the stored
    /// cause (or [`BroadcastError::Closed`]) is returned.
    pub fn send(&self, value: T) -> Result<(), BroadcastError> {
        self.try_send(value).map_err(|e| e.into_parts().1)
    }

    /// Same as [`send`](Self::send), but a rejected value is handed back.
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        let mut st = self.shared.state.lock();
        if let Some(cause) = st.closed_cause() {
            let err = BroadcastError::closed(cause);
            return Err(TrySendError::new(value, err));
        }

        let mut dropped = 0usize;
        for slot in &st.subscribers {
            if slot.offer(value.clone()) {
                dropped += 1;
            }
        }
        trace!(
            channel = self.shared.config.name,
            subscribers = st.subscribers.len(),
            conflated = dropped,
            "value sent"
        );
        st.last = LastValue::Value(value);
        Ok(())
    }
}

impl<T> ConflatedBroadcast<T> {
    /// Closes the channel.
    ///
    /// Returns false if it was already closed; the first cause is kept.
    /// Every subscription is closed with `cause` and the registered close
    /// handler (if any) is invoked with it before this call returns.
    pub fn close(&self, cause: Option<Cause>) -> bool {
        let handler = {
            let mut st = self.shared.state.lock();
            if st.lifecycle.is_closed() {
                return false;
            }
            st.lifecycle = Lifecycle::Closed(cause.clone());
            let subscribers = std::mem::take(&mut st.subscribers);
            for slot in &subscribers {
                slot.close(cause.clone());
            }
            debug!(
                channel = self.shared.config.name,
                subscribers = subscribers.len(),
                cause = cause.as_ref().map(|c| c.to_string()),
                "channel closed"
            );
            st.on_close.take_for_fire()
        };

        if let Some(h) = handler {
            debug!(channel = self.shared.config.name, "invoking close handler");
            h(cause);
        }
        true
    }

    /// Cancels the channel: a [`close`](Self::close) whose cause, if any, is a [`Cancelled`].
    pub fn cancel(&self, cause: Option<Cancelled>) -> bool {
        self.close(cause.map(|c| Arc::new(c) as Cause))
    }

    /// Registers the close handler.
    ///
    /// If the channel is already closed, `handler` runs immediately, inside
    /// this call, with the stored cause.
    ///
    /// ### Errors
    /// [`BroadcastError::HandlerAlreadyRegistered`] if a handler was registered
    /// before; `fired` tells whether that one has already run.
    pub fn invoke_on_close<F>(&self, handler: F) -> Result<(), BroadcastError>
    where
        F: FnOnce(Option<Cause>) + Send + 'static,
    {
        let fire_now: Option<(CloseHandler, Option<Cause>)> = {
            let mut st = self.shared.state.lock();
            match st.on_close {
                HandlerSlot::Registered(_) => {
                    return Err(BroadcastError::HandlerAlreadyRegistered { fired: false });
                }
                HandlerSlot::Fired => {
                    return Err(BroadcastError::HandlerAlreadyRegistered { fired: true });
                }
                HandlerSlot::Empty => {}
            }
            match &st.lifecycle {
                Lifecycle::Open => {
                    st.on_close = HandlerSlot::Registered(Box::new(handler));
                    None
                }
                Lifecycle::Closed(cause) => {
                    let cause = cause.clone();
                    st.on_close = HandlerSlot::Fired;
                    let handler: CloseHandler = Box::new(handler);
                    Some((handler, cause))
                }
            }
        };

        if let Some((h, cause)) = fire_now {
            debug!(
                channel = self.shared.config.name,
                "channel already closed; invoking close handler"
            );
            h(cause);
        }
        Ok(())
    }

    /// Configured channel name.
    pub fn name(&self) -> &'static str {
        self.shared.config.name
    }
}

impl<T> fmt::Debug for ConflatedBroadcast<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.shared.state.lock();
        f.debug_struct("ConflatedBroadcast")
            .field("name", &self.shared.config.name)
            .field("has_value", &st.last.as_option().is_some())
            .field("subscribers", &st.subscribers.len())
            .field("closed", &st.lifecycle.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;

    #[derive(Debug, thiserror::Error)]
    #[error("upstream gone")]
    struct UpstreamGone;

    fn gone() -> Cause {
        Arc::new(UpstreamGone)
    }

    #[test]
    fn test_scenario_two_subscribers_then_close() {
        let ch = ConflatedBroadcast::new();
        let mut s1 = ch.subscribe();
        assert_eq!(s1.try_recv().unwrap(), None);

        ch.send(5).unwrap();
        assert_eq!(s1.try_recv().unwrap(), Some(5));

        let mut s2 = ch.subscribe();
        assert_eq!(s2.try_recv().unwrap(), Some(5));

        ch.send(7).unwrap();
        assert_eq!(s1.try_recv().unwrap(), Some(7));
        assert_eq!(s2.try_recv().unwrap(), Some(7));

        assert!(ch.close(None));
        assert!(matches!(ch.value(), Err(BroadcastError::Closed)));
        assert!(matches!(ch.send(9), Err(BroadcastError::Closed)));
        assert!(matches!(s1.try_recv(), Err(BroadcastError::Closed)));
        assert!(matches!(s2.try_recv(), Err(BroadcastError::Closed)));
    }

    #[test]
    fn test_latest_value_seeds_new_subscriber() {
        let ch = ConflatedBroadcast::new();
        for v in 1..=10 {
            ch.send(v).unwrap();
        }
        let mut sub = ch.subscribe();
        assert_eq!(sub.try_recv().unwrap(), Some(10));
        assert_eq!(sub.try_recv().unwrap(), None);
    }

    #[test]
    fn test_unconsumed_value_is_replaced() {
        let ch = ConflatedBroadcast::new();
        let mut sub = ch.subscribe();
        ch.send("first").unwrap();
        ch.send("second").unwrap();
        assert_eq!(sub.try_recv().unwrap(), Some("second"));
        assert_eq!(sub.try_recv().unwrap(), None);
    }

    #[test]
    fn test_huge_subscribers_hint_does_not_overallocate() {
        let ch: ConflatedBroadcast<u8> = ConflatedBroadcast::with_config(Config {
            subscribers_hint: usize::MAX,
            ..Config::named("huge")
        });
        let mut sub = ch.subscribe();
        ch.send(1).unwrap();
        assert_eq!(sub.try_recv().unwrap(), Some(1));
    }

    #[test]
    fn test_value_queries() {
        let ch: ConflatedBroadcast<u32> = ConflatedBroadcast::new();
        assert!(matches!(ch.value(), Err(BroadcastError::NoValueYet)));
        assert_eq!(ch.value_or_none(), None);
        assert!(!ch.is_closed_for_send());

        ch.send(3).unwrap();
        assert_eq!(ch.value().unwrap(), 3);
        assert_eq!(ch.value_or_none(), Some(3));

        ch.close(Some(gone()));
        assert!(ch.is_closed_for_send());
        assert_eq!(ch.value_or_none(), None);
        match ch.value() {
            Err(BroadcastError::ClosedWithCause(c)) => assert_eq!(c.to_string(), "upstream gone"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_sent_none_is_a_value() {
        let ch: ConflatedBroadcast<Option<u8>> = ConflatedBroadcast::new();
        ch.send(None).unwrap();
        assert_eq!(ch.value().unwrap(), None);
        let mut sub = ch.subscribe();
        assert_eq!(sub.try_recv().unwrap(), Some(None));
    }

    #[test]
    fn test_with_value_seeds_subscribers() {
        let ch = ConflatedBroadcast::with_value(1);
        assert_eq!(ch.value().unwrap(), 1);
        let mut sub = ch.subscribe();
        assert_eq!(sub.try_recv().unwrap(), Some(1));
    }

    #[test]
    fn test_close_is_idempotent_and_keeps_first_cause() {
        let ch: ConflatedBroadcast<u8> = ConflatedBroadcast::new();
        assert!(ch.close(Some(gone())));
        assert!(!ch.close(None));
        assert!(!ch.cancel(Some(Cancelled::new("late"))));
        match ch.send(1) {
            Err(BroadcastError::ClosedWithCause(c)) => assert_eq!(c.to_string(), "upstream gone"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_try_send_after_close_returns_value_and_cause() {
        let ch = ConflatedBroadcast::new();
        let mut sub = ch.subscribe();
        ch.close(Some(gone()));

        let err = ch.try_send(11).unwrap_err();
        assert!(matches!(err.error(), BroadcastError::ClosedWithCause(_)));
        assert_eq!(err.into_inner(), 11);
        assert!(matches!(sub.try_recv(), Err(BroadcastError::ClosedWithCause(_))));
    }

    #[test]
    fn test_cancel_carries_cancelled_cause() {
        let ch: ConflatedBroadcast<u8> = ConflatedBroadcast::new();
        assert!(ch.cancel(Some(Cancelled::new("shutdown"))));
        let err = ch.value().unwrap_err();
        assert_eq!(err.cause().unwrap().to_string(), "cancelled: shutdown");

        let plain: ConflatedBroadcast<u8> = ConflatedBroadcast::new();
        assert!(plain.cancel(None));
        assert!(matches!(plain.value(), Err(BroadcastError::Closed)));
    }

    #[test]
    fn test_buffered_value_survives_close() {
        let ch = ConflatedBroadcast::new();
        let mut sub = ch.subscribe();
        ch.send(1).unwrap();
        ch.close(None);
        assert_eq!(sub.try_recv().unwrap(), Some(1));
        assert!(matches!(sub.try_recv(), Err(BroadcastError::Closed)));
    }

    #[test]
    fn test_close_empties_subscriber_list() {
        let ch: ConflatedBroadcast<u8> = ConflatedBroadcast::new();
        let a = ch.subscribe();
        let b = ch.subscribe();
        assert_eq!(ch.subscriber_count(), 2);
        ch.close(None);
        assert_eq!(ch.subscriber_count(), 0);
        assert!(a.is_closed() && b.is_closed());
    }

    #[test]
    fn test_drop_detaches_subscription() {
        let ch: ConflatedBroadcast<u8> = ConflatedBroadcast::new();
        let a = ch.subscribe();
        let b = ch.subscribe();
        drop(a);
        assert_eq!(ch.subscriber_count(), 1);
        b.cancel();
        assert_eq!(ch.subscriber_count(), 0);
        ch.send(1).unwrap();
    }

    #[test]
    fn test_close_removes_subscription_before_its_teardown() {
        let ch: ConflatedBroadcast<u8> = ConflatedBroadcast::new();
        let sub = ch.subscribe();
        ch.close(None);
        assert_eq!(ch.subscriber_count(), 0);
        // teardown after bulk close must not try a second removal
        drop(sub);
        assert_eq!(ch.subscriber_count(), 0);
    }

    #[test]
    fn test_subscribe_after_close_is_already_closed() {
        let ch = ConflatedBroadcast::with_value(4u8);
        ch.close(Some(gone()));
        let mut sub = ch.subscribe();
        assert!(sub.is_closed());
        assert_eq!(ch.subscriber_count(), 0);
        assert!(matches!(sub.try_recv(), Err(BroadcastError::ClosedWithCause(_))));
    }

    #[test]
    fn test_handler_runs_on_close_once() {
        let ch: ConflatedBroadcast<u8> = ConflatedBroadcast::new();
        let (tx, rx) = mpsc::channel();
        ch.invoke_on_close(move |cause| {
            tx.send(cause.map(|c| c.to_string())).unwrap();
        })
        .unwrap();
        assert!(rx.try_recv().is_err());

        ch.close(Some(gone()));
        assert_eq!(rx.try_recv().unwrap(), Some("upstream gone".to_string()));
        ch.close(None);
        assert!(rx.try_recv().is_err());

        let err = ch.invoke_on_close(|_| {}).unwrap_err();
        assert!(matches!(err, BroadcastError::HandlerAlreadyRegistered { fired: true }));
    }

    #[test]
    fn test_second_handler_is_rejected() {
        let ch: ConflatedBroadcast<u8> = ConflatedBroadcast::new();
        ch.invoke_on_close(|_| {}).unwrap();
        let err = ch.invoke_on_close(|_| {}).unwrap_err();
        assert!(matches!(err, BroadcastError::HandlerAlreadyRegistered { fired: false }));
    }

    #[test]
    fn test_handler_after_close_runs_immediately() {
        let ch: ConflatedBroadcast<u8> = ConflatedBroadcast::new();
        ch.close(None);
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        ch.invoke_on_close(move |cause| {
            assert!(cause.is_none());
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(ch.invoke_on_close(|_| {}).is_err());
    }

    #[test]
    fn test_handler_may_call_back_into_channel() {
        let ch: ConflatedBroadcast<u8> = ConflatedBroadcast::new();
        let inner = ch.clone();
        let (tx, rx) = mpsc::channel();
        ch.invoke_on_close(move |_| {
            tx.send((inner.is_closed_for_send(), inner.subscriber_count()))
                .unwrap();
        })
        .unwrap();
        ch.close(None);
        assert_eq!(rx.try_recv().unwrap(), (true, 0));
    }

    #[test]
    fn test_concurrent_subscribers_see_final_value() {
        const SENDS: u64 = 2_000;
        const READERS: usize = 8;

        let ch: ConflatedBroadcast<u64> = ConflatedBroadcast::new();
        let producer = {
            let ch = ch.clone();
            thread::spawn(move || {
                for v in 0..SENDS {
                    ch.send(v).unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..READERS)
            .map(|_| {
                let ch = ch.clone();
                thread::spawn(move || {
                    let mut sub = ch.subscribe();
                    let mut last = None;
                    while let Ok(Some(v)) = sub.try_recv() {
                        // values only move forward
                        if let Some(prev) = last {
                            assert!(v > prev);
                        }
                        last = Some(v);
                    }
                    (sub, last)
                })
            })
            .collect();

        producer.join().unwrap();
        let mut subs = Vec::with_capacity(READERS);
        for reader in readers {
            let (mut sub, mut last) = reader.join().unwrap();
            while let Ok(Some(v)) = sub.try_recv() {
                last = Some(v);
            }
            // pushed while registered, or seeded at subscribe time
            assert_eq!(last, Some(SENDS - 1));
            subs.push(sub);
        }
        assert_eq!(ch.subscriber_count(), READERS);
        drop(subs);
        assert_eq!(ch.subscriber_count(), 0);
    }

    #[test]
    fn test_concurrent_close_and_teardown_remove_once() {
        for _ in 0..200 {
            let ch: ConflatedBroadcast<u8> = ConflatedBroadcast::new();
            let subs: Vec<_> = (0..4).map(|_| ch.subscribe()).collect();
            let closer = {
                let ch = ch.clone();
                thread::spawn(move || ch.close(None))
            };
            let dropper = thread::spawn(move || drop(subs));
            assert!(closer.join().unwrap());
            dropper.join().unwrap();
            assert_eq!(ch.subscriber_count(), 0);
        }
    }
}
