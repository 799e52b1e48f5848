//! Lock-protected state of a broadcast channel.

use std::sync::Arc;

use crate::error::Cause;
use crate::subscription::slot::{Lifecycle, Slot};

/// Boxed close handler.
pub(crate) type CloseHandler = Box<dyn FnOnce(Option<Cause>) + Send + 'static>;

/// Latest sent value, or none yet.
pub(crate) enum LastValue<T> {
    Empty,
    Value(T),
}

impl<T> LastValue<T> {
    pub(crate) fn as_option(&self) -> Option<&T> {
        match self {
            LastValue::Empty => None,
            LastValue::Value(v) => Some(v),
        }
    }
}

/// At most one close handler over the channel's lifetime.
pub(crate) enum HandlerSlot {
    Empty,
    Registered(CloseHandler),
    Fired,
}

impl HandlerSlot {
    /// Takes the registered handler for invocation, marking the slot as fired.
    ///
    /// An empty slot stays empty so a handler registered after close still runs.
    pub(crate) fn take_for_fire(&mut self) -> Option<CloseHandler> {
        match std::mem::replace(self, HandlerSlot::Empty) {
            HandlerSlot::Registered(h) => {
                *self = HandlerSlot::Fired;
                Some(h)
            }
            HandlerSlot::Empty => None,
            HandlerSlot::Fired => {
                *self = HandlerSlot::Fired;
                None
            }
        }
    }
}

/// Everything guarded by the channel's single lock.
///
/// ## Invariants
/// - `lifecycle` goes `Open` → `Closed` once and never back.
/// - `subscribers` is empty whenever `lifecycle` is `Closed`.
/// - A slot is in `subscribers` exactly while it is open.
pub(crate) struct State<T> {
    pub(crate) last: LastValue<T>,
    pub(crate) subscribers: Vec<Arc<Slot<T>>>,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) on_close: HandlerSlot,
}

impl<T> State<T> {
    pub(crate) fn new(last: LastValue<T>, capacity: usize) -> Self {
        Self {
            last,
            subscribers: Vec::with_capacity(capacity),
            lifecycle: Lifecycle::Open,
            on_close: HandlerSlot::Empty,
        }
    }

    /// Stored cause if closed, `None` (outer) if open.
    pub(crate) fn closed_cause(&self) -> Option<Option<&Cause>> {
        match &self.lifecycle {
            Lifecycle::Open => None,
            Lifecycle::Closed(cause) => Some(cause.as_ref()),
        }
    }
}
