//! core/playback/backend.rs
//! The seam between the engine's timing logic and whatever actually makes sound.
//!
//! A `TrackPlayer` behaves like a classic per-file audio player:
//! - `stop()` keeps the current time (it just releases the output)
//! - setting the time on a playing track keeps it playing from there

use std::path::Path;
use std::sync::Arc;

use crate::core::error::PlaybackError;

/// Fired (from any thread) when a non-looping track plays through to its end.
/// Receives the generation of the pass that finished.
pub type FinishCallback = Arc<dyn Fn(u64) + Send + Sync + 'static>;

pub trait TrackPlayer {
    /// Seconds, 0.0 if unknown.
    fn duration(&self) -> f64;
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);
    fn is_playing(&self) -> bool;
    /// Bumped whenever `play` starts a fresh pass (after a stop, a seek or a
    /// play-through). Resuming from pause keeps it.
    fn generation(&self) -> u64;
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn set_volume(&mut self, volume: f32);
}

#[derive(Default)]
pub struct LoadOptions {
    pub looping: bool,
    pub on_finish: Option<FinishCallback>,
}

pub trait AudioBackend {
    type Track: TrackPlayer;

    /// Open the shared output session. Failing here is not fatal: loads still
    /// succeed, they just play silently.
    fn activate(&mut self) -> Result<(), PlaybackError>;

    fn load(&mut self, path: &Path, options: LoadOptions) -> Result<Self::Track, PlaybackError>;
}
