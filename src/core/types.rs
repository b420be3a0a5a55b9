//! Core data types shared between the playback engine and the UI.
//!
//! Rule of thumb:
//! - These structs should be "boring bags of data"
//! - No GUI code
//! - No audio device code
//!
//! `EngineState` is the only thing the UI is allowed to depend on. It is a
//! value: recomputed wholesale by the engine and replaced wholesale by the UI.

use std::fmt;

/// What the UI hands the engine once per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescriptor {
    /// Display title (also the Now-Playing title).
    pub title: String,
    /// Asset namespace, ex: `audio/calming`. The last path component is the
    /// "token" used to build candidate file names.
    pub folder: String,
}

impl SessionDescriptor {
    pub fn new(title: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            folder: folder.into(),
        }
    }
}

/// The four independently loaded assets of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioRole {
    Soundscape,
    OpeningNarration,
    ClosingNarration,
    IntroBell,
}

impl AudioRole {
    pub const ALL: [AudioRole; 4] = [
        AudioRole::Soundscape,
        AudioRole::OpeningNarration,
        AudioRole::ClosingNarration,
        AudioRole::IntroBell,
    ];
}

impl fmt::Display for AudioRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AudioRole::Soundscape => "soundscape",
            AudioRole::OpeningNarration => "opening narration",
            AudioRole::ClosingNarration => "closing narration",
            AudioRole::IntroBell => "intro bell",
        };
        f.write_str(name)
    }
}

/// Published snapshot of the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EngineState {
    pub is_playing: bool,
    /// Whole seconds left: `total_duration - floor(playhead)`, never negative.
    pub time_remaining: u32,
    /// Whole seconds of soundscape. 0 means "empty session".
    pub total_duration: u32,
    /// 0.0..=1.0 (0 when `total_duration == 0`).
    pub progress: f64,
}

impl EngineState {
    /// Elapsed whole seconds as seen by the UI.
    pub fn elapsed(&self) -> u32 {
        self.total_duration.saturating_sub(self.time_remaining)
    }

    /// True once the user has played at least a moment of this session.
    pub fn has_started(&self) -> bool {
        self.is_playing || self.progress > 0.0
    }
}

/// Hand-off record for the reflection flow once a session ends
/// (or the user leaves early).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub title: String,
    /// Emotional cue the session was picked for, ex: `calming`.
    pub emotion: String,
    pub duration_seconds: u32,
    pub completed: bool,
}
