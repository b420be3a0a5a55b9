//! Small pure helper functions used by the GUI.
//! - no UI widgets or state mutation

use crate::core::types::{EngineState, SessionSummary};

/// Whole seconds as a countdown label.
/// Ex: 605 -> '10:05'
pub(crate) fn fmt_clock(seconds: u32) -> String {
    let m = seconds / 60;
    let s = seconds % 60;
    format!("{m}:{s:02}")
}

/// Same, for fractional slider positions (floored).
pub(crate) fn fmt_position(seconds: f64) -> String {
    fmt_clock(seconds.max(0.0).floor() as u32)
}

/// Hand-off record for the reflection flow.
/// Early exits report how long the user actually sat.
pub(crate) fn session_summary(
    title: &str,
    emotion: &str,
    engine: &EngineState,
    completed: bool,
) -> SessionSummary {
    let duration_seconds = if completed {
        engine.total_duration
    } else {
        engine.elapsed()
    };

    SessionSummary {
        title: title.to_string(),
        emotion: emotion.to_string(),
        duration_seconds,
        completed,
    }
}
