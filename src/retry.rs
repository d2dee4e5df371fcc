//! Connectivity-triggered auto-retry
//!
//! A slot whose last attempt failed for a connectivity reason replays its requests when
//! the network comes back. [`RetryPolicy`] makes that call. It checks, in order:
//!
//! 1. auto-retry is enabled for the slot
//! 2. the connectivity event reports the network as reachable
//! 3. the slot is visible
//! 4. the slot has a composite task and it has finished
//! 5. the last member task failed with a retryable (connectivity-class) error
//! 6. no retry happened yet, or the minimum interval passed since the last one
//!
//! The fixed minimum interval keeps a flapping connection from producing a retry storm.
//!
//! # Example
//!
//! ```
//! use slotload::error::FetchError;
//! use slotload::retry::{RetryContext, RetryDecision, RetryPolicy};
//! use std::time::Duration;
//! use tokio::time::Instant;
//!
//! let mut policy = RetryPolicy::new(true, Duration::from_secs(8));
//! let error = FetchError::TimedOut;
//! let context = RetryContext {
//!     is_reachable: true,
//!     is_visible: true,
//!     task_finished: Some(true),
//!     last_error: Some(&error),
//! };
//!
//! let now = Instant::now();
//! assert_eq!(policy.evaluate(&context, now), RetryDecision::Retry);
//! policy.record_attempt(now);
//! assert!(matches!(policy.evaluate(&context, now), RetryDecision::Skip(_)));
//! ```

use std::time::Duration;
use tokio::time::Instant;

use crate::config::SlotConfig;
use crate::error::FetchError;
use crate::types::Request;

/// Trait for errors that can be classified as retryable or not
///
/// Transient connectivity failures (no connection, timeouts, unreachable host, dropped
/// connection) should return `true`. Everything else should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        self.is_connectivity()
    }
}

/// Snapshot of the slot the policy decides on
#[derive(Clone, Copy, Debug)]
pub struct RetryContext<'a> {
    /// Reachability reported by the connectivity event
    pub is_reachable: bool,
    /// Whether the slot is attached to the visible surface
    pub is_visible: bool,
    /// `None` when the slot has no composite, otherwise whether it finished
    pub task_finished: Option<bool>,
    /// Error recorded by the composite's last member task
    pub last_error: Option<&'a FetchError>,
}

/// Why a retry was not attempted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Auto-retry is turned off for the slot
    Disabled,
    /// The network is still unreachable
    Unreachable,
    /// The slot is not on screen
    NotVisible,
    /// There is nothing to retry
    NoTask,
    /// The current attempt is still running
    TaskRunning,
    /// The last failure was not connectivity-related (or there was none)
    NotRetryable,
    /// The previous retry was too recent
    Debounced {
        /// Time left until the next retry is allowed
        remaining: Duration,
    },
}

/// Outcome of [`RetryPolicy::evaluate`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Replay the last requests now
    Retry,
    /// Leave the slot alone
    Skip(SkipReason),
}

#[derive(Clone, Debug, Default)]
struct RetryState {
    last_retry_at: Option<Instant>,
    last_requests: Vec<Request>,
}

/// Stateful retry decision function owned by a slot
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    enabled: bool,
    min_interval: Duration,
    state: RetryState,
}

impl RetryPolicy {
    /// Create a policy
    pub fn new(enabled: bool, min_interval: Duration) -> Self {
        Self {
            enabled,
            min_interval,
            state: RetryState::default(),
        }
    }

    /// Create a policy from slot configuration
    pub fn from_config(config: &SlotConfig) -> Self {
        Self::new(config.auto_retry, config.retry_min_interval)
    }

    /// Decide whether a connectivity event should replay the last requests
    pub fn evaluate(&self, context: &RetryContext<'_>, now: Instant) -> RetryDecision {
        if !self.enabled {
            return RetryDecision::Skip(SkipReason::Disabled);
        }
        if !context.is_reachable {
            return RetryDecision::Skip(SkipReason::Unreachable);
        }
        if !context.is_visible {
            return RetryDecision::Skip(SkipReason::NotVisible);
        }
        match context.task_finished {
            None => return RetryDecision::Skip(SkipReason::NoTask),
            Some(false) => return RetryDecision::Skip(SkipReason::TaskRunning),
            Some(true) => {}
        }
        if !context.last_error.is_some_and(IsRetryable::is_retryable) {
            return RetryDecision::Skip(SkipReason::NotRetryable);
        }
        if let Some(last) = self.state.last_retry_at {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.min_interval {
                return RetryDecision::Skip(SkipReason::Debounced {
                    remaining: self.min_interval - elapsed,
                });
            }
        }
        RetryDecision::Retry
    }

    /// Remember the requests a retry would replay
    ///
    /// A request list different from the previous one is new content, so the retry clock
    /// starts over.
    pub fn record_requests(&mut self, requests: &[Request]) {
        if self.state.last_requests != requests {
            self.state.last_requests = requests.to_vec();
            self.state.last_retry_at = None;
        }
    }

    /// Mark a retry as fired at `now`
    pub fn record_attempt(&mut self, now: Instant) {
        self.state.last_retry_at = Some(now);
    }

    /// Requests a retry would replay
    pub fn last_requests(&self) -> &[Request] {
        &self.state.last_requests
    }

    /// When the last retry fired
    pub fn last_retry_at(&self) -> Option<Instant> {
        self.state.last_retry_at
    }

    /// Forget everything about the previous content
    pub fn reset(&mut self) {
        self.state = RetryState::default();
    }
}
