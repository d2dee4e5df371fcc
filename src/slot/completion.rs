//! Result handling: generation checks, observer notification and presentation.

use std::sync::Arc;

use crate::composite::CompositeTask;
use crate::config::RepeatResultPolicy;
use crate::engine::FetchTask;
use crate::presentation::decide_presentation;
use crate::types::{CompositeId, FetchResponse, SlotEvent, SlotState};

use super::ContentSlot;

impl ContentSlot {
    pub(crate) fn handle_result(
        &self,
        composite: CompositeId,
        task: &Arc<dyn FetchTask>,
        response: &FetchResponse,
    ) {
        {
            let inner = self.lock();
            if !inner.owns(composite) {
                tracing::debug!(composite = %composite, "Ignoring result from superseded composite");
                return;
            }
            if inner.displayed_from == Some(composite)
                && self.config.repeat_results == RepeatResultPolicy::KeepFirst
            {
                tracing::debug!(
                    composite = %composite,
                    task = %task.id(),
                    "Dropping additional result, first one already displayed"
                );
                return;
            }
        }

        if let Some(observer) = self.observer() {
            observer.did_complete(task.as_ref(), response);
        }

        let presentation = {
            let mut inner = self.lock();
            // The observer may have replaced or reset the slot
            if !inner.owns(composite) {
                return;
            }
            let presentation = decide_presentation(
                inner.content.is_some(),
                response.arrived_fast,
                self.config.animations_enabled,
            );
            inner.content = Some(response.image.clone());
            inner.displayed_from = Some(composite);
            inner.phase = SlotState::Displayed;
            presentation
        };

        tracing::debug!(
            composite = %composite,
            task = %task.id(),
            fast = response.arrived_fast,
            presentation = ?presentation,
            "Displaying result"
        );
        self.emit(SlotEvent::Displayed {
            composite,
            task: task.id(),
            presentation,
        });
    }

    pub(crate) fn handle_final(&self, composite: &CompositeTask) {
        {
            let mut inner = self.lock();
            if !inner.owns(composite.id()) || composite.success_count() > 0 {
                return;
            }
            inner.phase = SlotState::Failed;
        }

        let error = composite.last_error();
        tracing::warn!(
            composite = %composite.id(),
            error = ?error,
            retryable = error.as_ref().is_some_and(|e| e.is_connectivity()),
            "All fetch tasks failed"
        );

        if let Some(observer) = self.observer() {
            for task in composite.tasks() {
                if let Some(task_error) = task.error() {
                    observer.did_fail(task.as_ref(), &task_error);
                }
            }
        }

        self.emit(SlotEvent::Failed {
            composite: composite.id(),
            error,
        });
    }
}
