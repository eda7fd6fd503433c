//! Coordinator configuration.
//!
//! [`PreviewConfig`] is fixed when a coordinator is built. It deserializes
//! from any serde format, so hosts can embed it in their own config files:
//!
//! ```toml
//! [link_preview]
//! capacity = 250
//! timeout_ms = 5000
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::cache::DEFAULT_CAPACITY;
use crate::{HuginnError, Result};

/// Default fetch deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Configuration for a [`MetadataCoordinator`](crate::MetadataCoordinator).
///
/// ```rust
/// # use huginn::PreviewConfig;
/// # use std::time::Duration;
/// let config = PreviewConfig::new()
///     .capacity(250)
///     .timeout(Duration::from_secs(5));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Maximum number of cached URLs. Default: 100.
    pub capacity: usize,
    /// Deadline for a single fetch, starting when it is dispatched.
    /// Default: 10 seconds. Written as `timeout_ms` in config files.
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Duration,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl PreviewConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached URLs.
    pub fn capacity(mut self, n: usize) -> Self {
        self.capacity = n;
        self
    }

    /// Set the fetch deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check that both values are positive.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(HuginnError::Configuration(
                "capacity must be at least 1".into(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(HuginnError::Configuration(
                "timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
