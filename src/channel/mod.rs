//! Broadcast channel core.
//!
//! - [`ConflatedBroadcast`]: latest-value, lock-protected fan-out.
//! - [`SendClause`]: the send operation as an eagerly resolved select branch.

mod core;
mod select;
mod state;

pub use self::core::ConflatedBroadcast;
pub(crate) use self::core::Shared;
pub use select::{ClauseOutcome, SendClause};
