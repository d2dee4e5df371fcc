//! Composite task: N alternative fetch requests behind one cancelable handle
//!
//! A [`CompositeTask`] references the engine's tasks without owning their lifetime. It
//! starts them together, reports each member success through one result callback, and
//! reports once when every member has finished. Cancelling it silences both callbacks for
//! good, including completions the engine delivers after the cancel was requested.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::engine::{FetchOutcome, FetchTask};
use crate::error::{Error, FetchError, Result};
use crate::types::{CompositeId, FetchResponse, Priority, Request};

/// Invoked for every member that succeeds: (response, member task, composite)
pub type ResultHandler =
    Arc<dyn Fn(&FetchResponse, &Arc<dyn FetchTask>, &CompositeTask) + Send + Sync>;

/// Invoked once when every member has finished, unless the composite was cancelled
pub type FinalHandler = Arc<dyn Fn(&CompositeTask) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Completed,
    Cancelled,
}

struct Inner {
    phase: Phase,
    remaining: usize,
    successes: usize,
    on_result: Option<ResultHandler>,
    on_final: Option<FinalHandler>,
}

/// A group of alternative fetch tasks handled as one unit
pub struct CompositeTask {
    id: CompositeId,
    requests: Vec<Request>,
    tasks: Vec<Arc<dyn FetchTask>>,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for CompositeTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("CompositeTask")
            .field("id", &self.id)
            .field("tasks", &self.tasks.len())
            .field("phase", &inner.phase)
            .field("remaining", &inner.remaining)
            .field("successes", &inner.successes)
            .finish()
    }
}

impl CompositeTask {
    /// Group `tasks` into one composite
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyTaskSet`] when `tasks` is empty.
    pub fn new(
        tasks: Vec<Arc<dyn FetchTask>>,
        on_result: ResultHandler,
        on_final_complete: FinalHandler,
    ) -> Result<Arc<Self>> {
        if tasks.is_empty() {
            return Err(Error::EmptyTaskSet);
        }

        let requests = tasks.iter().map(|task| task.request().clone()).collect();
        let remaining = tasks.len();

        Ok(Arc::new(Self {
            id: CompositeId::next(),
            requests,
            tasks,
            inner: Mutex::new(Inner {
                phase: Phase::Idle,
                remaining,
                successes: 0,
                on_result: Some(on_result),
                on_final: Some(on_final_complete),
            }),
        }))
    }

    /// Generation token for this composite
    pub fn id(&self) -> CompositeId {
        self.id
    }

    /// Requests the member tasks were created from, in list order
    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    /// Member tasks, in list order
    pub fn tasks(&self) -> &[Arc<dyn FetchTask>] {
        &self.tasks
    }

    /// Start every member task in list order
    ///
    /// Only the first call has an effect. Member completions hold a weak reference, so a
    /// composite that has been dropped never reports anything.
    pub fn resume(self: &Arc<Self>) {
        {
            let mut inner = self.lock();
            if inner.phase != Phase::Idle {
                return;
            }
            inner.phase = Phase::Running;
        }

        tracing::debug!(composite = %self.id, tasks = self.tasks.len(), "Resuming composite task");

        for (index, task) in self.tasks.iter().enumerate() {
            // A synchronous completion may already have cancelled us
            if self.is_cancelled() {
                break;
            }
            let weak = Arc::downgrade(self);
            task.resume(Box::new(move |outcome| {
                if let Some(composite) = weak.upgrade() {
                    composite.member_completed(index, outcome);
                }
            }));
        }
    }

    /// Cancel every unfinished member and silence all callbacks
    pub fn cancel(&self) {
        {
            let mut inner = self.lock();
            if matches!(inner.phase, Phase::Cancelled | Phase::Completed) {
                return;
            }
            inner.phase = Phase::Cancelled;
            inner.on_result = None;
            inner.on_final = None;
        }

        tracing::debug!(composite = %self.id, "Cancelling composite task");

        for task in &self.tasks {
            if !task.is_finished() {
                task.cancel();
            }
        }
    }

    /// Forward a priority change to every unfinished member
    pub fn set_priority(&self, priority: Priority) {
        for task in &self.tasks {
            if !task.is_finished() {
                task.set_priority(priority);
            }
        }
    }

    /// True once every member task is terminal
    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(|task| task.is_finished())
    }

    /// True once [`cancel`](Self::cancel) took effect
    pub fn is_cancelled(&self) -> bool {
        self.lock().phase == Phase::Cancelled
    }

    /// Number of members that reported a success so far
    pub fn success_count(&self) -> usize {
        self.lock().successes
    }

    /// Error recorded by the last member task in list order
    pub fn last_error(&self) -> Option<FetchError> {
        self.tasks.last().and_then(|task| task.error())
    }

    fn member_completed(&self, index: usize, outcome: FetchOutcome) {
        let (on_result, is_last) = {
            let mut inner = self.lock();
            if inner.phase != Phase::Running {
                return;
            }
            inner.remaining = inner.remaining.saturating_sub(1);
            let on_result = if outcome.is_ok() {
                inner.successes += 1;
                inner.on_result.clone()
            } else {
                None
            };
            (on_result, inner.remaining == 0)
        };

        let task = &self.tasks[index];
        match (&outcome, on_result) {
            (Ok(response), Some(handler)) => handler(response, task, self),
            (Err(error), _) => {
                tracing::debug!(
                    composite = %self.id,
                    task = %task.id(),
                    error = %error,
                    "Composite member failed"
                );
            }
            (Ok(_), None) => {}
        }

        if is_last {
            let on_final = {
                let mut inner = self.lock();
                // The result handler may have cancelled us
                if inner.phase != Phase::Running {
                    return;
                }
                inner.phase = Phase::Completed;
                inner.on_result = None;
                inner.on_final.take()
            };
            if let Some(handler) = on_final {
                handler(self);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
