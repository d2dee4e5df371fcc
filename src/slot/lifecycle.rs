//! Slot lifecycle: issuing requests, cancelling, reuse and teardown.

use std::sync::Arc;

use crate::composite::{CompositeTask, FinalHandler, ResultHandler};
use crate::engine::FetchTask;
use crate::priority::PriorityController;
use crate::types::{FetchResponse, Request, SlotEvent, SlotState};

use super::ContentSlot;

impl ContentSlot {
    /// Fetch `requests` into this slot, replacing whatever is in flight
    ///
    /// The previous composite is cancelled first, so none of its callbacks are observed
    /// after this call. An empty list only cancels and returns the slot to
    /// [`SlotState::Empty`]; displayed content is left untouched.
    ///
    /// The requests are alternatives: one engine task is created per request, verbatim,
    /// and they all start together.
    pub fn set_requests(&self, requests: Vec<Request>) {
        let previous = {
            let mut inner = self.lock();
            let previous = inner.current.take();
            if requests.is_empty() {
                inner.phase = SlotState::Empty;
                inner.escalated = false;
                inner.retry.record_requests(&requests);
            }
            previous
        };

        if let Some(previous) = previous {
            self.cancel_composite(&previous);
        }

        if requests.is_empty() {
            tracing::debug!("Empty request list, slot cleared");
            return;
        }

        if let Some(observer) = self.observer() {
            observer.will_start_fetching(&requests);
        }

        let tasks: Vec<Arc<dyn FetchTask>> = requests
            .iter()
            .map(|request| self.engine.create_task(request))
            .collect();

        let composite = match CompositeTask::new(tasks, self.result_handler(), self.final_handler())
        {
            Ok(composite) => composite,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build composite task");
                return;
            }
        };

        let (displaced, escalate) = {
            let mut inner = self.lock();
            let escalate = self.config.manage_priorities && inner.visible;
            inner.escalated = escalate;
            inner.phase = SlotState::Fetching;
            inner.retry.record_requests(&requests);
            (inner.current.replace(composite.clone()), escalate)
        };

        // An observer hook may have issued requests of its own in the meantime
        if let Some(displaced) = displaced {
            self.cancel_composite(&displaced);
        }

        if escalate {
            composite.set_priority(PriorityController::decide(true));
        }

        tracing::debug!(
            composite = %composite.id(),
            requests = requests.len(),
            escalated = escalate,
            "Starting fetch"
        );
        self.emit(SlotEvent::FetchStarted {
            composite: composite.id(),
            requests: requests.len(),
        });

        composite.resume();
    }

    /// Stop the active fetch, keeping whatever is displayed
    ///
    /// A slot that was still fetching moves to [`SlotState::Cancelled`]; otherwise the
    /// state is kept.
    pub fn cancel(&self) {
        let previous = {
            let mut inner = self.lock();
            let previous = inner.current.take();
            if inner.phase == SlotState::Fetching {
                inner.phase = SlotState::Cancelled;
            }
            inner.escalated = false;
            previous
        };

        if let Some(previous) = previous {
            self.cancel_composite(&previous);
        }
    }

    /// Prepare the slot for unrelated content
    ///
    /// Cancels the active fetch, clears the displayed content, forgets retry history and
    /// priority escalation, and returns to [`SlotState::Empty`]. Safe in any state.
    pub fn reuse(&self) {
        let previous = {
            let mut inner = self.lock();
            inner.phase = SlotState::Empty;
            inner.content = None;
            inner.displayed_from = None;
            inner.escalated = false;
            inner.retry.reset();
            inner.current.take()
        };

        if let Some(previous) = previous {
            self.cancel_composite(&previous);
        }

        tracing::debug!("Slot reset for reuse");
    }

    /// Release everything the slot holds: reuse, then stop listening for connectivity
    ///
    /// Idempotent.
    pub fn teardown(&self) {
        self.reuse();
        self.stop_observing_connectivity();
    }

    fn cancel_composite(&self, composite: &CompositeTask) {
        let was_active = !composite.is_cancelled() && !composite.is_finished();
        composite.cancel();
        if was_active {
            self.emit(SlotEvent::Cancelled {
                composite: composite.id(),
            });
        }
    }

    fn result_handler(&self) -> ResultHandler {
        let slot = self.weak_self.clone();
        Arc::new(
            move |response: &FetchResponse, task: &Arc<dyn FetchTask>, composite: &CompositeTask| {
                if let Some(slot) = slot.upgrade() {
                    slot.handle_result(composite.id(), task, response);
                }
            },
        )
    }

    fn final_handler(&self) -> FinalHandler {
        let slot = self.weak_self.clone();
        Arc::new(move |composite: &CompositeTask| {
            if let Some(slot) = slot.upgrade() {
                slot.handle_final(composite);
            }
        })
    }
}
