//! GUI state + messages.
//! Pure data definitions used by update/ + view/.

use std::sync::mpsc::Receiver;

use iced::widget::image;

use crate::core::config::Settings;
use crate::core::now_playing::{NowPlayingInfo, RemoteCommand};
use crate::core::playback::{PlaybackController, PlayerEvent};
use crate::core::types::{AudioRole, EngineState};

/// App state
pub(crate) struct Inara {
    pub settings: Settings,
    pub status: String,

    // Mix, kept across sessions
    pub soundscape_volume: f32,
    pub narration_volume: f32,

    // Player screen (None = home list)
    pub session: Option<PlayerSession>,
}

impl Inara {
    pub(crate) fn new(settings: Settings) -> Self {
        Self {
            soundscape_volume: settings.soundscape_volume,
            narration_volume: settings.narration_volume,
            status: "Choose a session.".to_string(),
            session: None,
            settings,
        }
    }
}

/// One open session: its engine handle plus the last things it told us.
pub(crate) struct PlayerSession {
    pub title: String,
    pub subtitle: String,
    /// Category token of the session folder.
    pub emotion: String,

    pub controller: PlaybackController,
    pub events: Receiver<PlayerEvent>,

    pub engine: EngineState,
    pub loaded: Vec<AudioRole>,
    pub finished: bool,

    /// Seconds; Some while the seek slider is being dragged.
    pub scrub_preview: Option<f64>,

    // Now-Playing surface
    pub now_playing: Option<NowPlayingInfo>,
    pub artwork: Option<image::Handle>,
    pub remote_enabled: bool,
}

impl PlayerSession {
    pub(crate) fn new(
        title: String,
        subtitle: String,
        emotion: String,
        controller: PlaybackController,
        events: Receiver<PlayerEvent>,
    ) -> Self {
        Self {
            title,
            subtitle,
            emotion,
            controller,
            events,
            engine: EngineState::default(),
            loaded: Vec::new(),
            finished: false,
            scrub_preview: None,
            now_playing: None,
            artwork: None,
            remote_enabled: false,
        }
    }

    /// Where the slider sits: the drag preview, else the engine's elapsed time.
    pub(crate) fn position(&self) -> f64 {
        self.scrub_preview
            .unwrap_or_else(|| self.engine.elapsed() as f64)
    }
}

/// Message = “something happened”.
#[derive(Debug, Clone)]
pub(crate) enum Message {
    // Navigation
    OpenSession(usize),
    CloseSession,

    // Transport
    TogglePlayPause,

    // Seek: preview vs commit
    ScrubTo(f64),
    ScrubCommit,

    // Mix
    SoundscapeVolume(f32),
    NarrationVolume(f32),

    // Now-Playing panel buttons
    Remote(RemoteCommand),

    // Poll engine events
    TickPlayback,
}
