//! # Value observer trait.
//!
//! Provides [`Observe`], an extension point for reacting to a channel's values
//! from a background worker instead of polling a [`Subscription`](crate::Subscription).
//!
//! Each observer gets:
//! - **Own subscription** (conflated: a slow observer only skips values)
//! - **Dedicated worker task** (runs independently)
//! - **Panic isolation** (a panicking `on_value` is logged; the worker keeps going)
//!
//! ## Architecture
//! ```text
//! ObserverSet ──► [subscription] ──► worker task ──► observer.on_value()
//!                                 │                └─► panic caught → warn!
//!                                 └─► channel closed ──► observer.on_close()
//! ```
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use conflated_broadcast::{Cause, Observe};
//!
//! struct Gauge;
//!
//! #[async_trait]
//! impl Observe<f64> for Gauge {
//!     async fn on_value(&self, price: &f64) {
//!         let _ = price; // export a metric, etc.
//!     }
//!
//!     async fn on_close(&self, cause: Option<&Cause>) {
//!         let _ = cause;
//!     }
//!
//!     fn name(&self) -> &'static str { "gauge" }
//! }
//! ```

use async_trait::async_trait;

use crate::error::Cause;

/// Observer of a channel's latest values.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
/// - Expect gaps: values sent while `on_value` is running are conflated.
#[async_trait]
pub trait Observe<T>: Send + Sync + 'static {
    /// Processes the latest value.
    ///
    /// Called from a dedicated worker task, never in the sender's context.
    async fn on_value(&self, value: &T);

    /// Called once when the channel closes, with its cause.
    ///
    /// Not called when the set is shut down while the channel is still open.
    async fn on_close(&self, _cause: Option<&Cause>) {}

    /// Returns the observer name used in logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
