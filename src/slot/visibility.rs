//! Attach/detach tracking and priority management.

use crate::priority::PriorityController;
use crate::types::SlotEvent;

use super::ContentSlot;

impl ContentSlot {
    /// Record that the slot was attached to (`true`) or detached from (`false`) the
    /// visible surface
    ///
    /// Visibility gates auto-retry. With `manage_priorities` enabled, an attach raises the
    /// active composite to very-high priority and a detach brings it back to normal.
    /// Repeating the current value is not a transition and does nothing, and a composite
    /// whose members have all finished is left alone.
    pub fn set_visible(&self, attached: bool) {
        let current = {
            let mut inner = self.lock();
            if inner.visible == attached {
                return;
            }
            inner.visible = attached;

            if !self.config.manage_priorities {
                return;
            }
            // Only undo an escalation this slot actually made
            if !attached && !inner.escalated {
                return;
            }
            let Some(current) = inner.current.clone() else {
                return;
            };
            current
        };

        // Engine getters run without the slot lock held
        let finished = current.is_finished();
        {
            let mut inner = self.lock();
            if !inner.owns(current.id()) {
                return;
            }
            inner.escalated = attached && !finished;
        }
        if finished {
            return;
        }

        let priority = PriorityController::decide(attached);
        current.set_priority(priority);

        tracing::debug!(
            composite = %current.id(),
            attached,
            priority = ?priority,
            "Adjusted fetch priority"
        );
        self.emit(SlotEvent::PriorityChanged { priority });
    }
}
