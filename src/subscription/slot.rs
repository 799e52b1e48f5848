//! # Single-slot conflated buffer.
//!
//! A [`Slot`] holds at most one undelivered value. Offering a new value always
//! succeeds and discards the previous one ("drop oldest").
//!
//! ## Rules
//! - One producer side (the channel core) and one consumer (a [`Subscription`](super::Subscription)).
//! - A slot is closed exactly once; [`Slot::close`] reports whether this call did it.
//! - A value buffered before a close is still delivered before the closed outcome.
//! - Consumer wake-ups go through a single [`AtomicWaker`].

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::task::AtomicWaker;
use parking_lot::Mutex;

use crate::error::{BroadcastError, Cause};

/// Open/closed state shared by the channel core and its slots.
#[derive(Clone, Debug)]
pub(crate) enum Lifecycle {
    Open,
    Closed(Option<Cause>),
}

impl Lifecycle {
    pub(crate) fn is_closed(&self) -> bool {
        matches!(self, Lifecycle::Closed(_))
    }
}

struct SlotState<T> {
    value: Option<T>,
    lifecycle: Lifecycle,
}

/// Capacity-one drop-oldest buffer.
pub(crate) struct Slot<T> {
    state: Mutex<SlotState<T>>,
    waker: AtomicWaker,
}

impl<T> Slot<T> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SlotState {
                value: None,
                lifecycle: Lifecycle::Open,
            }),
            waker: AtomicWaker::new(),
        })
    }

    /// Stores `value`, replacing any undelivered one.
    ///
    /// Returns true if an older value was dropped. Offers to a closed slot are ignored.
    pub(crate) fn offer(&self, value: T) -> bool {
        let dropped = {
            let mut st = self.state.lock();
            if st.lifecycle.is_closed() {
                return false;
            }
            st.value.replace(value).is_some()
        };
        self.waker.wake();
        dropped
    }

    /// Closes the slot with `cause`.
    ///
    /// Returns false if it was already closed.
    pub(crate) fn close(&self, cause: Option<Cause>) -> bool {
        {
            let mut st = self.state.lock();
            if st.lifecycle.is_closed() {
                return false;
            }
            st.lifecycle = Lifecycle::Closed(cause);
        }
        self.waker.wake();
        true
    }

    /// Closes the slot on behalf of its consumer, discarding any buffered value.
    ///
    /// Returns false if it was already closed.
    pub(crate) fn abandon(&self) -> bool {
        let mut st = self.state.lock();
        st.value = None;
        if st.lifecycle.is_closed() {
            return false;
        }
        st.lifecycle = Lifecycle::Closed(None);
        true
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().lifecycle.is_closed()
    }

    /// Takes the buffered value or the closed outcome, if either is available.
    pub(crate) fn try_take(&self) -> Option<Result<T, BroadcastError>> {
        let mut st = self.state.lock();
        if let Some(v) = st.value.take() {
            return Some(Ok(v));
        }
        match &st.lifecycle {
            Lifecycle::Open => None,
            Lifecycle::Closed(cause) => Some(Err(BroadcastError::closed(cause.as_ref()))),
        }
    }

    pub(crate) fn poll_take(&self, cx: &mut Context<'_>) -> Poll<Result<T, BroadcastError>> {
        if let Some(out) = self.try_take() {
            return Poll::Ready(out);
        }
        // Register before the second check so an offer in between is not lost.
        self.waker.register(cx.waker());
        match self.try_take() {
            Some(out) => Poll::Ready(out),
            None => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Cancelled;

    #[test]
    fn test_offer_drops_oldest() {
        let slot = Slot::new();
        assert!(!slot.offer(1));
        assert!(slot.offer(2));
        assert!(matches!(slot.try_take(), Some(Ok(2))));
        assert!(slot.try_take().is_none());
    }

    #[test]
    fn test_close_is_once_and_keeps_buffered_value() {
        let slot = Slot::new();
        slot.offer("a");
        let cause: Cause = Arc::new(Cancelled::new("done"));
        assert!(slot.close(Some(cause)));
        assert!(!slot.close(None));

        assert!(matches!(slot.try_take(), Some(Ok("a"))));
        match slot.try_take() {
            Some(Err(BroadcastError::ClosedWithCause(c))) => {
                assert_eq!(c.to_string(), "cancelled: done")
            }
            other => panic!("unexpected: {other:?}"),
        }
        // offers after close are ignored
        assert!(!slot.offer("b"));
        assert!(matches!(slot.try_take(), Some(Err(_))));
    }

    #[test]
    fn test_abandon_discards_value() {
        let slot = Slot::new();
        slot.offer(7);
        assert!(slot.abandon());
        assert!(!slot.abandon());
        assert!(matches!(slot.try_take(), Some(Err(BroadcastError::Closed))));
    }
}
