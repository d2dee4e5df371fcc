//! Presentation decision for newly arrived results

use serde::{Deserialize, Serialize};

/// How a result should be put on screen
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presentation {
    /// Swap the content in without animation
    Immediate,
    /// Fade the content in
    Fade,
}

/// Decide how to present a result
///
/// Fades only into an empty slot, only for results that took the asynchronous path, and
/// only when animations are enabled. Cached results and replacements of existing content
/// appear immediately.
pub fn decide_presentation(
    has_content: bool,
    arrived_fast: bool,
    animations_enabled: bool,
) -> Presentation {
    if animations_enabled && !arrived_fast && !has_content {
        Presentation::Fade
    } else {
        Presentation::Immediate
    }
}
