//! Error types used by the broadcast channel and its subscriptions.
//!
//! This module defines:
//!
//! - [`BroadcastError`] — failures of channel and subscription operations.
//! - [`TrySendError`] — a [`BroadcastError`] that hands the rejected value back.
//! - [`Cancelled`] — the cancellation-kind cause accepted by
//!   [`ConflatedBroadcast::cancel`](crate::ConflatedBroadcast::cancel).
//!
//! All failures are synchronous and local to the call that produced them;
//! nothing here is retried internally.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Shared close cause.
///
/// Reference-counted so one cause can be surfaced to every subscriber, the
/// close handler and any later reader of the channel.
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// # Errors produced by channel and subscription operations.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum BroadcastError {
    /// The channel is open but no value has been sent yet.
    #[error("no value has been sent yet")]
    NoValueYet,

    /// The channel was closed without a cause.
    #[error("channel was closed")]
    Closed,

    /// The channel was closed with the carried cause.
    #[error("channel was closed: {0}")]
    ClosedWithCause(Cause),

    /// A close handler was already registered.
    ///
    /// `fired` tells whether the earlier handler has already been invoked.
    #[error("close handler already registered (fired: {fired})")]
    HandlerAlreadyRegistered {
        /// True if the previously registered handler already ran.
        fired: bool,
    },
}

impl BroadcastError {
    /// Builds the closed error for an optional stored cause.
    pub(crate) fn closed(cause: Option<&Cause>) -> Self {
        match cause {
            Some(c) => BroadcastError::ClosedWithCause(Arc::clone(c)),
            None => BroadcastError::Closed,
        }
    }

    /// Returns the close cause, if this error carries one.
    pub fn cause(&self) -> Option<&Cause> {
        match self {
            BroadcastError::ClosedWithCause(c) => Some(c),
            _ => None,
        }
    }

    /// True for both closed variants.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            BroadcastError::Closed | BroadcastError::ClosedWithCause(_)
        )
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use conflated_broadcast::BroadcastError;
    ///
    /// let err = BroadcastError::HandlerAlreadyRegistered { fired: true };
    /// assert_eq!(err.as_label(), "broadcast_handler_already_registered");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BroadcastError::NoValueYet => "broadcast_no_value_yet",
            BroadcastError::Closed => "broadcast_closed",
            BroadcastError::ClosedWithCause(_) => "broadcast_closed_with_cause",
            BroadcastError::HandlerAlreadyRegistered { .. } => {
                "broadcast_handler_already_registered"
            }
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BroadcastError::NoValueYet => "no value yet".to_string(),
            BroadcastError::Closed => "closed".to_string(),
            BroadcastError::ClosedWithCause(c) => format!("closed: {c}"),
            BroadcastError::HandlerAlreadyRegistered { fired: true } => {
                "another close handler was already registered and invoked".to_string()
            }
            BroadcastError::HandlerAlreadyRegistered { fired: false } => {
                "another close handler was already registered".to_string()
            }
        }
    }
}

/// Error returned by [`ConflatedBroadcast::try_send`](crate::ConflatedBroadcast::try_send).
///
/// Carries the same [`BroadcastError`] that `send` would report, together
/// with the value that was not recorded.
#[derive(Error)]
#[error("{error}")]
pub struct TrySendError<T> {
    value: T,
    error: BroadcastError,
}

impl<T> TrySendError<T> {
    pub(crate) fn new(value: T, error: BroadcastError) -> Self {
        Self { value, error }
    }

    /// Returns the rejected value.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// The reason the value was rejected.
    pub fn error(&self) -> &BroadcastError {
        &self.error
    }

    /// Splits into the rejected value and the error.
    pub fn into_parts(self) -> (T, BroadcastError) {
        (self.value, self.error)
    }
}

impl<T> fmt::Debug for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrySendError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// Cancellation-kind close cause.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
#[error("cancelled: {reason}")]
pub struct Cancelled {
    reason: String,
}

impl Cancelled {
    /// Creates a cancellation with a human-readable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// The reason given at cancellation.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}
