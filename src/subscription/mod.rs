//! Per-subscriber conflated buffers.
//!
//! - [`Subscription`]: public consumer handle (`recv`, `try_recv`, `Stream`).
//! - `slot`: the capacity-one, drop-oldest buffer behind it.

mod handle;
pub(crate) mod slot;

pub use handle::Subscription;
