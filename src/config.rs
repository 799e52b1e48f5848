//! # Channel configuration.
//!
//! Provides [`Config`], the construction-time settings of a
//! [`ConflatedBroadcast`](crate::ConflatedBroadcast).
//!
//! ## Sentinel values
//! - `subscribers_hint = 0` → treated as 1 (see [`Config::subscribers_hint_clamped`])
//! - `subscribers_hint > MAX_SUBSCRIBERS_HINT` → treated as [`MAX_SUBSCRIBERS_HINT`]

/// Upper bound applied to [`Config::subscribers_hint`] when pre-sizing.
pub const MAX_SUBSCRIBERS_HINT: usize = 1024;

/// Construction-time settings for a broadcast channel.
///
/// ## Field semantics
/// - `name`: label attached to every `tracing` record the channel emits
/// - `subscribers_hint`: expected number of concurrent subscribers, used to
///   pre-size the subscriber list
#[derive(Clone, Debug)]
pub struct Config {
    /// Channel name used in logs.
    pub name: &'static str,

    /// Expected number of live subscribers.
    ///
    /// Only a capacity hint; the list grows past it as needed.
    pub subscribers_hint: usize,
}

impl Config {
    /// Creates a default config with the given name.
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    /// Returns the subscriber hint clamped to `1..=MAX_SUBSCRIBERS_HINT`.
    #[inline]
    pub fn subscribers_hint_clamped(&self) -> usize {
        self.subscribers_hint.clamp(1, MAX_SUBSCRIBERS_HINT)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `name = "conflated"`
    /// - `subscribers_hint = 4`
    fn default() -> Self {
        Self {
            name: "conflated",
            subscribers_hint: 4,
        }
    }
}
