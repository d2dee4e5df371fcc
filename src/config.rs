//! Configuration types for slotload

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// What to do when a composite reports more than one success
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatResultPolicy {
    /// Keep the first displayed result and drop the rest (default)
    #[default]
    KeepFirst,
    /// Notify the observer and replace the displayed content, without animation
    Replace,
}

/// Per-slot configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SlotConfig {
    /// Replay failed requests when connectivity comes back (default: true)
    #[serde(default = "default_true")]
    pub auto_retry: bool,

    /// Minimum time between two automatic retries (default: 8 seconds)
    ///
    /// Stored as whole seconds; [`validate`](Self::validate) rejects fractional values.
    #[serde(default = "default_retry_min_interval", with = "duration_serde")]
    pub retry_min_interval: Duration,

    /// Raise priority while attached and lower it when detached (default: false)
    #[serde(default)]
    pub manage_priorities: bool,

    /// Allow fade-in for asynchronously arrived content (default: true)
    #[serde(default = "default_true")]
    pub animations_enabled: bool,

    /// Handling of additional successes from one composite (default: keep first)
    #[serde(default)]
    pub repeat_results: RepeatResultPolicy,

    /// Capacity of the slot event broadcast channel (default: 64)
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            auto_retry: true,
            retry_min_interval: default_retry_min_interval(),
            manage_priorities: false,
            animations_enabled: true,
            repeat_results: RepeatResultPolicy::default(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl SlotConfig {
    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.event_capacity == 0 {
            return Err(Error::Config {
                message: "event_capacity must be greater than zero".to_string(),
                key: Some("event_capacity".to_string()),
            });
        }
        if self.retry_min_interval.subsec_nanos() != 0 {
            return Err(Error::Config {
                message: format!(
                    "retry_min_interval must be whole seconds, got {:?}",
                    self.retry_min_interval
                ),
                key: Some("retry_min_interval".to_string()),
            });
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }
}

fn default_true() -> bool {
    true
}

fn default_retry_min_interval() -> Duration {
    Duration::from_secs(8)
}

fn default_event_capacity() -> usize {
    64
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
