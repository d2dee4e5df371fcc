//! Process-wide connectivity signal
//!
//! Reachability detection itself is platform work that lives outside this crate. The
//! platform layer feeds transitions into a [`ConnectivityMonitor`] with
//! [`set_reachable`](ConnectivityMonitor::set_reachable); any number of slots subscribe to
//! it independently.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

/// Reachability transition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityEvent {
    /// Whether the network is reachable after the transition
    pub is_reachable: bool,
}

/// Observable reachability flag shared across the process
///
/// Cloning is cheap and every clone observes the same state.
#[derive(Clone, Debug)]
pub struct ConnectivityMonitor {
    reachable: Arc<AtomicBool>,
    event_tx: broadcast::Sender<ConnectivityEvent>,
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivityMonitor {
    /// Create a monitor with the given initial reachability
    pub fn new(initially_reachable: bool) -> Self {
        let (event_tx, _rx) = broadcast::channel(16);
        Self {
            reachable: Arc::new(AtomicBool::new(initially_reachable)),
            event_tx,
        }
    }

    /// Current reachability
    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    /// Record the platform's current reachability
    ///
    /// Emits an event only when the value changes. Returns whether it changed.
    pub fn set_reachable(&self, reachable: bool) -> bool {
        let previous = self.reachable.swap(reachable, Ordering::SeqCst);
        if previous == reachable {
            return false;
        }

        tracing::info!(reachable, "Connectivity changed");

        // No subscribers is fine
        let _ = self.event_tx.send(ConnectivityEvent {
            is_reachable: reachable,
        });
        true
    }

    /// Subscribe to reachability transitions
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.event_tx.subscribe()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.event_tx.receiver_count()
    }
}
