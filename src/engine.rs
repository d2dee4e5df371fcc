//! Fetch engine interface
//!
//! The engine that performs network I/O, decoding and caching lives outside this crate.
//! These traits describe the boundary: an engine hands out [`FetchTask`]s, and each task
//! reports its outcome once through the completion handler given to [`FetchTask::resume`].
//!
//! # Threading contract
//!
//! All slot operations and all completion handlers are expected to run on one logical
//! control context (typically a UI or event thread). Engines run their work wherever they
//! like but must marshal the completion handler call back to that context. Engines may
//! also call the handler synchronously from inside `resume` when the result is already
//! available; that path is what [`FetchResponse::arrived_fast`] describes.

use std::sync::Arc;

use crate::error::FetchError;
use crate::types::{FetchResponse, Priority, Request, TaskId, TaskState};

/// Outcome delivered to a completion handler
pub type FetchOutcome = std::result::Result<FetchResponse, FetchError>;

/// Completion handler passed to [`FetchTask::resume`]; invoked at most once
pub type CompletionHandler = Box<dyn FnOnce(FetchOutcome) + Send>;

/// One cancelable, resumable content request owned by the engine
pub trait FetchTask: Send + Sync {
    /// Engine-assigned identifier
    fn id(&self) -> TaskId;

    /// The request this task was created from
    fn request(&self) -> &Request;

    /// Start the work. Calling it on a task that is not idle does nothing and drops the
    /// handler.
    fn resume(&self, on_complete: CompletionHandler);

    /// Request cancellation. A no-op for terminal tasks.
    fn cancel(&self);

    /// Current priority
    fn priority(&self) -> Priority;

    /// Change the priority. A no-op for terminal tasks.
    fn set_priority(&self, priority: Priority);

    /// Current lifecycle state
    fn state(&self) -> TaskState;

    /// Whether the task reached a terminal state
    fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Error recorded when the task failed
    fn error(&self) -> Option<FetchError>;
}

/// Shared fetch engine, injected into every slot
pub trait FetchEngine: Send + Sync {
    /// Create a task for the request without starting it
    fn create_task(&self, request: &Request) -> Arc<dyn FetchTask>;
}
