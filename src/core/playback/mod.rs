//! core/playback/mod.rs
//! Inara playback core module.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

pub mod backend;
mod decoder;
mod engine;
pub mod rodio_backend;
pub mod timeline;

pub use engine::MeditationEngine;

use super::assets::{AssetResolver, FsLocator};
use super::config::Settings;
use super::error::PlaybackError;
use super::now_playing::{ChannelCenter, CommandStatus, NowPlayingInfo, RemoteCommand};
use super::types::{AudioRole, EngineState, SessionDescriptor};
use rodio_backend::RodioBackend;

#[derive(Clone)]
pub struct PlaybackController {
    command_tx: Sender<PlayerCommand>,
}

impl PlaybackController {
    /// Best-effort send. If the engine died, the command is dropped.
    pub fn send(&self, cmd: PlayerCommand) {
        let _ = self.command_tx.send(cmd);
    }
}

/// System audio interruption (another app took the output, a call, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    Began,
    Ended { should_resume: bool },
}

#[derive(Debug)]
pub enum PlayerCommand {
    Configure(SessionDescriptor),
    Start,
    Play,
    Pause,
    Seek(f64),         // seconds
    ScrubPreview(f64), // seconds
    SetVolumes { soundscape: f32, narration: f32 },
    Stop,
    Remote(RemoteCommand),
    Interruption(Interruption),
    /// Completion of a non-looping track, redispatched onto the engine thread.
    /// `generation` identifies the pass that finished.
    TrackFinished { role: AudioRole, generation: u64 },
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum PlayerEvent {
    State(EngineState),
    NowPlaying(Option<NowPlayingInfo>),
    RemoteCommandsEnabled(bool),
    RemoteHandled {
        command: RemoteCommand,
        status: CommandStatus,
    },
    Loaded(Vec<AudioRole>),
    SessionFinished {
        duration: u32,
    },
    Error(String),
}

/// Spawns the engine thread and returns:
/// - PlaybackController (store in GUI state)
/// - Receiver<PlayerEvent> (drained by the GUI's polling subscription)
pub fn start_playback(
    settings: &Settings,
) -> Result<(PlaybackController, Receiver<PlayerEvent>), PlaybackError> {
    let (command_tx, command_rx) = mpsc::channel::<PlayerCommand>();
    let (event_tx, event_rx) = mpsc::channel::<PlayerEvent>();

    let notifier = command_tx.clone();
    let assets_root = settings.assets_root.clone();
    let extensions = settings.extensions.clone();
    let artist = settings.artist.clone();
    let artwork = settings.artwork_path();

    thread::Builder::new()
        .name("inara-engine".into())
        .spawn(move || {
            let resolver = AssetResolver::new(FsLocator::new(assets_root), extensions);
            let center = ChannelCenter::new(event_tx.clone());
            let mut engine =
                MeditationEngine::new(RodioBackend::new(), resolver, center, event_tx, notifier)
                    .with_now_playing(artist, artwork);

            engine.run(command_rx);
        })?;

    Ok((PlaybackController { command_tx }, event_rx))
}
