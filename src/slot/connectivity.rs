//! Connectivity subscription and auto-retry.

use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::connectivity::{ConnectivityEvent, ConnectivityMonitor};
use crate::retry::{RetryContext, RetryDecision};
use crate::types::SlotEvent;

use super::ContentSlot;

impl ContentSlot {
    /// Listen to `monitor` and auto-retry on reachability recovery
    ///
    /// The listener is a local task on the caller's [`LocalSet`](tokio::task::LocalSet),
    /// so retries, observer hooks and engine calls it triggers run on the thread driving
    /// that set, which must be the slot's control context. It holds only a weak reference
    /// to the slot and stops when the slot is torn down or dropped, when the monitor goes
    /// away, or when this method is called again (the new subscription replaces the old
    /// one).
    ///
    /// Hosts whose control context is not a `LocalSet` subscribe to the monitor
    /// themselves and call [`handle_connectivity_change`](Self::handle_connectivity_change)
    /// from that context.
    ///
    /// # Panics
    ///
    /// Must be called from within a `LocalSet` on a Tokio runtime.
    pub fn observe_connectivity(&self, monitor: &ConnectivityMonitor) {
        let token = CancellationToken::new();
        let previous = self
            .connectivity
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }

        let mut rx = monitor.subscribe();
        let monitor = monitor.clone();
        let slot = self.weak_self.clone();

        tokio::task::spawn_local(async move {
            loop {
                let event = tokio::select! {
                    _ = token.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(event) => event,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Connectivity listener lagged, using current state");
                            ConnectivityEvent {
                                is_reachable: monitor.is_reachable(),
                            }
                        }
                        Err(RecvError::Closed) => break,
                    },
                };

                let Some(slot) = slot.upgrade() else {
                    break;
                };
                slot.handle_connectivity_change(event);
            }
            tracing::debug!("Connectivity listener stopped");
        });
    }

    /// Stop listening for connectivity changes. Idempotent.
    pub fn stop_observing_connectivity(&self) {
        let token = self
            .connectivity
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(token) = token {
            token.cancel();
        }
    }

    /// Whether a connectivity listener is installed
    pub fn is_observing_connectivity(&self) -> bool {
        self.connectivity
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .is_some()
    }

    /// Apply the retry policy to a connectivity event
    ///
    /// Called by the listener installed with [`observe_connectivity`](Self::observe_connectivity);
    /// a host with its own event loop can call it directly instead. Returns whether the
    /// last requests were replayed.
    pub fn handle_connectivity_change(&self, event: ConnectivityEvent) -> bool {
        let now = Instant::now();
        let (current, visible) = {
            let inner = self.lock();
            (inner.current.clone(), inner.visible)
        };

        // Engine getters run without the slot lock held
        let task_finished = current.as_ref().map(|composite| composite.is_finished());
        let last_error = current.as_ref().and_then(|composite| composite.last_error());

        let replay = {
            let mut inner = self.lock();
            let still_current = match (&current, &inner.current) {
                (Some(a), Some(b)) => a.id() == b.id(),
                (None, None) => true,
                _ => false,
            };
            if !still_current {
                return false;
            }

            let context = RetryContext {
                is_reachable: event.is_reachable,
                is_visible: visible,
                task_finished,
                last_error: last_error.as_ref(),
            };
            match inner.retry.evaluate(&context, now) {
                RetryDecision::Retry => {
                    inner.retry.record_attempt(now);
                    inner.retry.last_requests().to_vec()
                }
                RetryDecision::Skip(reason) => {
                    tracing::debug!(reason = ?reason, reachable = event.is_reachable, "Not retrying");
                    return false;
                }
            }
        };

        let Some(failed) = current else {
            return false;
        };

        tracing::info!(
            composite = %failed.id(),
            requests = replay.len(),
            error = ?last_error,
            "Connectivity restored, retrying failed fetch"
        );
        self.emit(SlotEvent::RetryTriggered {
            composite: failed.id(),
        });
        self.set_requests(replay);
        true
    }
}
