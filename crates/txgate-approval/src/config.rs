//! Session configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default capacity for the command and analysis-update channels.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Tunables for an approval session.
///
/// The workflow itself imposes no analysis timeout; callers that want one
/// opt in here, and expiry is treated as a failed analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long to wait for analysis before treating it as failed.
    /// `None` (the default) waits indefinitely.
    #[serde(default)]
    pub analysis_timeout: Option<Duration>,
    /// Capacity of the session's internal channels.
    #[serde(default = "default_capacity")]
    pub channel_capacity: usize,
}

fn default_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

impl SessionConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Impose an analysis timeout.
    #[must_use]
    pub fn with_analysis_timeout(mut self, timeout: Duration) -> Self {
        self.analysis_timeout = Some(timeout);
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            analysis_timeout: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::new();
        assert!(config.analysis_timeout.is_none());
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_builder() {
        let config = SessionConfig::new().with_analysis_timeout(Duration::from_secs(30));
        assert_eq!(config.analysis_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: SessionConfig = serde_json::from_str("{}").unwrap();
        assert!(config.analysis_timeout.is_none());
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }
}
