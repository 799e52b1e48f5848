//! # LogWriter — simple value logger
//!
//! A minimal observer that records each observed value and the close through
//! `tracing`. Use it for tests or demos.
//!
//! ## Example output (with a fmt subscriber installed)
//! ```text
//! INFO value observed observer="LogWriter" value=101.5
//! INFO channel closed observer="LogWriter" cause=None
//! ```

use std::fmt::Debug;

use async_trait::async_trait;
use tracing::info;

use crate::error::Cause;
use crate::observers::Observe;

/// Value logging observer.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl<T> Observe<T> for LogWriter
where
    T: Debug + Send + Sync + 'static,
{
    async fn on_value(&self, value: &T) {
        info!(observer = "LogWriter", value = ?value, "value observed");
    }

    async fn on_close(&self, cause: Option<&Cause>) {
        let cause = cause.map(|c| c.to_string());
        info!(observer = "LogWriter", cause = ?cause, "channel closed");
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
