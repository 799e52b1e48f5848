//! # Background observers for a broadcast channel.
//!
//! This module provides the [`Observe`] trait and [`ObserverSet`], which runs
//! each observer on its own tokio task over its own conflated subscription.
//!
//! ## Architecture
//! ```text
//! ConflatedBroadcast ──► Subscription (one per observer)
//!                              │
//!                              └──► worker task ──► Observe::on_value(&T)
//!                                        │
//!                                   ┌────┴────┬─────────┐
//!                                   ▼         ▼         ▼
//!                                LogWriter  Metrics   Custom
//! ```
//!
//! ## Observer types
//! - **Passive observers** - react to the latest value (logging, metrics, alerts)
//! - **Stateful observers** - keep derived state updated from each value

mod observer;
mod set;

#[cfg(feature = "logging")]
mod log;

pub use observer::Observe;
pub use set::ObserverSet;

#[cfg(feature = "logging")]
pub use log::LogWriter;
