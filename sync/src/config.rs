//! Sync layer configuration.

use std::time::Duration;

/// Default quiet period before a scheduled add or update is sent.
pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(500);

/// Tuning knobs for the sync layer.
///
/// Injected at store construction; there is no ambient configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Quiet period per cart line before a debounced call fires.
    ///
    /// This is a coalescing window, not a network timeout. Transport
    /// timeouts belong to the remote service implementation.
    pub debounce_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_delay: DEFAULT_DEBOUNCE_DELAY,
        }
    }
}

impl SyncConfig {
    /// Create a config with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the debounce quiet period.
    pub fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_debounce_delay() {
        assert_eq!(SyncConfig::new().debounce_delay, Duration::from_millis(500));
        assert_eq!(SyncConfig::default(), SyncConfig::new());
    }

    #[test]
    fn test_builder_overrides_delay() {
        let config = SyncConfig::new().with_debounce_delay(Duration::from_millis(50));
        assert_eq!(config.debounce_delay, Duration::from_millis(50));
    }
}
