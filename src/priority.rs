//! Visibility-driven priority policy

use crate::types::Priority;

/// Maps attach/detach transitions to a task priority
///
/// Attached slots are on screen and get [`Priority::VeryHigh`]. Detached slots drop back to
/// [`Priority::Normal`] rather than the lowest level, so off-screen work keeps progressing.
#[derive(Clone, Copy, Debug, Default)]
pub struct PriorityController;

impl PriorityController {
    /// Target priority for a visibility transition
    pub fn decide(attached: bool) -> Priority {
        if attached {
            Priority::VeryHigh
        } else {
            Priority::Normal
        }
    }
}
