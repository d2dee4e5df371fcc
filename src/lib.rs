//! # slotload
//!
//! Orchestration layer between reusable content slots (cells in a scrolling list, image
//! views, thumbnails) and an image fetch engine.
//!
//! ## Design Philosophy
//!
//! slotload is designed to be:
//! - **Engine-agnostic** - Fetching, decoding and caching stay behind the [`FetchEngine`] trait
//! - **Cancel-safe** - Reusing a slot cancels its work, and stale results are never observed
//! - **Network-aware** - Failed fetches are replayed when connectivity returns, at most once
//!   per interval
//! - **Event-driven** - Consumers subscribe to slot events or install an observer
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use slotload::{ConnectivityMonitor, ContentSlot, FetchEngine, Request, SlotConfig};
//!
//! // Runs inside a `tokio::task::LocalSet` on the UI/control thread
//! # async fn example(engine: Arc<dyn FetchEngine>) -> Result<(), Box<dyn std::error::Error>> {
//! let monitor = ConnectivityMonitor::default();
//! let slot = ContentSlot::new(engine, SlotConfig::default())?;
//! slot.observe_connectivity(&monitor);
//!
//! // The slot scrolled on screen
//! slot.set_visible(true);
//!
//! // Try the thumbnail and the full image together
//! slot.set_requests(vec![
//!     Request::parse("https://img.example.com/photo_thumb.jpg")?,
//!     Request::parse("https://img.example.com/photo.jpg")?,
//! ]);
//!
//! let mut events = slot.subscribe();
//! while let Ok(event) = events.recv().await {
//!     println!("Event: {:?}", event);
//! }
//!
//! // The cell is about to show something else
//! slot.reuse();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Composite task over alternative fetch requests
pub mod composite;
/// Configuration types
pub mod config;
/// Process-wide connectivity signal
pub mod connectivity;
/// Fetch engine interface
pub mod engine;
/// Error types
pub mod error;
/// Presentation decision
pub mod presentation;
/// Visibility-driven priority policy
pub mod priority;
/// Connectivity-triggered retry policy
pub mod retry;
/// Content slot coordinator
pub mod slot;
/// Core types and events
pub mod types;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use composite::CompositeTask;
pub use config::{RepeatResultPolicy, SlotConfig};
pub use connectivity::{ConnectivityEvent, ConnectivityMonitor};
pub use engine::{CompletionHandler, FetchEngine, FetchOutcome, FetchTask};
pub use error::{Error, FetchError, Result};
pub use presentation::{Presentation, decide_presentation};
pub use priority::PriorityController;
pub use retry::{IsRetryable, RetryDecision, RetryPolicy};
pub use slot::{ContentSlot, SlotObserver};
pub use types::{
    CompositeId, ContentMode, FetchResponse, Image, Priority, Request, RequestOptions,
    SlotEvent, SlotState, TargetSize, TaskId, TaskState,
};
