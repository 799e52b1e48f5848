//! # conflated-broadcast
//!
//! **conflated-broadcast** is a latest-value broadcast channel for Rust.
//!
//! A producer publishes a continuously updated value; any number of independent
//! subscribers observe it. Slow or absent subscribers never block the producer
//! and never see stale history: each one holds at most the latest value it has
//! not read yet.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐
//!     │  producer A  │   │  producer B  │
//!     └──────┬───────┘   └──────┬───────┘
//!            │ send / try_send  │ close / cancel
//!            ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  ConflatedBroadcast (single lock)                                 │
//! │  - last value (or none yet)                                       │
//! │  - open / closed(cause)                                           │
//! │  - close handler (at most one)                                    │
//! │  - live subscriber slots                                          │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ Subscription │   │ Subscription │   │ ObserverSet  │
//!     │  (1 slot,    │   │  (1 slot,    │   │  worker ──►  │
//!     │ drop oldest) │   │ drop oldest) │   │  on_value()  │
//!     └──────────────┘   └──────────────┘   └──────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! subscribe() ──► slot seeded with last value ──► listed in channel
//!
//! send(v) ──► last = v ──► offer(v) to every listed slot (drops unread older value)
//!
//! close(cause) ──► closed(cause) ──► every slot closed, list emptied ──► close handler
//!
//! drop(Subscription) ──► slot still open? ──► yes: remove from list
//!                                          └► no: already removed by close
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types                                  |
//! |-------------------|--------------------------------------------------------------|--------------------------------------------|
//! | **Channel**       | Non-blocking latest-value fan-out, close/cancel, close hook. | [`ConflatedBroadcast`]                     |
//! | **Subscriptions** | Conflated consumer handles, `recv`/`try_recv`/`Stream`.      | [`Subscription`]                           |
//! | **Select**        | Send as an eagerly resolved select branch.                   | [`SendClause`], [`ClauseOutcome`]          |
//! | **Observers**     | Background workers reacting to the latest value.             | [`Observe`], [`ObserverSet`]               |
//! | **Errors**        | Typed errors with stable labels.                             | [`BroadcastError`], [`TrySendError`]       |
//! | **Configuration** | Channel name and sizing hint.                                | [`Config`]                                 |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] observer _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use conflated_broadcast::{BroadcastError, ConflatedBroadcast};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), BroadcastError> {
//!     let temperature = ConflatedBroadcast::new();
//!     let mut display = temperature.subscribe();
//!
//!     temperature.send(20.5)?;
//!     temperature.send(21.0)?;
//!
//!     // the display was busy: it only sees the latest reading
//!     assert_eq!(display.recv().await?, 21.0);
//!
//!     temperature.close(None);
//!     assert!(matches!(display.recv().await, Err(BroadcastError::Closed)));
//!     Ok(())
//! }
//! ```
mod channel;
mod config;
mod error;
mod observers;
mod subscription;

// ---- Public re-exports ----

pub use channel::{ClauseOutcome, ConflatedBroadcast, SendClause};
pub use config::{Config, MAX_SUBSCRIBERS_HINT};
pub use error::{BroadcastError, Cancelled, Cause, TrySendError};
pub use observers::{Observe, ObserverSet};
pub use subscription::Subscription;

// Optional: expose a simple built-in logging observer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use observers::LogWriter;
