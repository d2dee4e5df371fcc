//! Content slot coordinator split into focused submodules.
//!
//! The `ContentSlot` struct and its methods are organized by concern:
//! - [`lifecycle`] - Issuing, cancelling and resetting requests
//! - [`completion`] - Handling composite results and presentation
//! - [`connectivity`] - Connectivity subscription and auto-retry
//! - [`visibility`] - Attach/detach tracking and priority management
//!
//! # Threading contract
//!
//! All public methods and all engine callbacks are expected on one logical control
//! context. State sits behind a mutex anyway, and no lock is held while observers,
//! engine methods or composite callbacks run, so engines may complete synchronously.
//! The connectivity listener is a local task on the caller's `LocalSet` and never moves
//! work onto another thread.

mod completion;
mod connectivity;
mod lifecycle;
mod visibility;


use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::composite::CompositeTask;
use crate::config::SlotConfig;
use crate::engine::{FetchEngine, FetchTask};
use crate::error::{FetchError, Result};
use crate::retry::RetryPolicy;
use crate::types::{CompositeId, FetchResponse, Image, Request, SlotEvent, SlotState};

/// Optional hooks notified by a slot
///
/// Every method has a no-op default, so implementors only override what they need.
/// Hooks are fire-and-forget and run on the slot's control context.
pub trait SlotObserver: Send + Sync {
    /// A new set of requests is about to be fetched
    fn will_start_fetching(&self, _requests: &[Request]) {}

    /// A member task produced a result for the active composite
    fn did_complete(&self, _task: &dyn FetchTask, _response: &FetchResponse) {}

    /// Every member task finished without a success; called once per failed member
    fn did_fail(&self, _task: &dyn FetchTask, _error: &FetchError) {}
}

/// Mutable slot state
pub(crate) struct SlotInner {
    pub(crate) phase: SlotState,
    /// The active composite; callbacks from any other composite are ignored
    pub(crate) current: Option<Arc<CompositeTask>>,
    pub(crate) content: Option<Image>,
    /// Composite whose result is on screen
    pub(crate) displayed_from: Option<CompositeId>,
    pub(crate) retry: RetryPolicy,
    pub(crate) visible: bool,
    /// Whether the active composite was raised to very-high priority
    pub(crate) escalated: bool,
}

impl SlotInner {
    pub(crate) fn owns(&self, composite: CompositeId) -> bool {
        self.current
            .as_ref()
            .is_some_and(|current| current.id() == composite)
    }
}

/// A reusable display surface bound to at most one composite fetch at a time
pub struct ContentSlot {
    pub(crate) config: SlotConfig,
    pub(crate) engine: Arc<dyn FetchEngine>,
    pub(crate) observer: Mutex<Option<Arc<dyn SlotObserver>>>,
    pub(crate) event_tx: broadcast::Sender<SlotEvent>,
    pub(crate) inner: Mutex<SlotInner>,
    /// Cancels the connectivity listener task
    pub(crate) connectivity: Mutex<Option<CancellationToken>>,
    /// Handed to callbacks so they never keep the slot alive
    pub(crate) weak_self: Weak<ContentSlot>,
}

impl std::fmt::Debug for ContentSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("ContentSlot")
            .field("phase", &inner.phase)
            .field("current", &inner.current.as_ref().map(|c| c.id()))
            .field("has_content", &inner.content.is_some())
            .field("visible", &inner.visible)
            .finish()
    }
}

impl ContentSlot {
    /// Create an empty, detached slot backed by `engine`
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `config` fails validation.
    pub fn new(engine: Arc<dyn FetchEngine>, config: SlotConfig) -> Result<Arc<Self>> {
        config.validate()?;

        let (event_tx, _rx) = broadcast::channel(config.event_capacity);
        let retry = RetryPolicy::from_config(&config);

        Ok(Arc::new_cyclic(|weak_self| Self {
            config,
            engine,
            observer: Mutex::new(None),
            event_tx,
            inner: Mutex::new(SlotInner {
                phase: SlotState::Empty,
                current: None,
                content: None,
                displayed_from: None,
                retry,
                visible: false,
                escalated: false,
            }),
            connectivity: Mutex::new(None),
            weak_self: weak_self.clone(),
        }))
    }

    /// Install or remove the observer
    pub fn set_observer(&self, observer: Option<Arc<dyn SlotObserver>>) {
        *self
            .observer
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = observer;
    }

    /// Subscribe to slot events
    pub fn subscribe(&self) -> broadcast::Receiver<SlotEvent> {
        self.event_tx.subscribe()
    }

    /// Slot configuration
    pub fn config(&self) -> &SlotConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> SlotState {
        self.lock().phase
    }

    /// Content currently on display
    pub fn content(&self) -> Option<Image> {
        self.lock().content.clone()
    }

    /// Whether the slot is attached to the visible surface
    pub fn is_visible(&self) -> bool {
        self.lock().visible
    }

    /// The active composite, if any
    pub fn current_task(&self) -> Option<Arc<CompositeTask>> {
        self.lock().current.clone()
    }

    /// When the last automatic retry fired for the current content
    pub fn last_retry_at(&self) -> Option<Instant> {
        self.lock().retry.last_retry_at()
    }

    pub(crate) fn observer(&self) -> Option<Arc<dyn SlotObserver>> {
        self.observer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn emit(&self, event: SlotEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SlotInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ContentSlot {
    fn drop(&mut self) {
        let token = self
            .connectivity
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(token) = token {
            token.cancel();
        }

        let current = self
            .inner
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .take();
        if let Some(composite) = current {
            composite.cancel();
        }
    }
}
