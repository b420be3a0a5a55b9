//! core/now_playing.rs
//! Mirror of the engine into an OS-style "Now Playing" surface, and the
//! remote commands (play/pause/toggle) that come back from it.
//!
//! The concrete surface is injected (`NowPlayingCenter`); the engine never
//! talks to a global.

use std::sync::mpsc::Sender;

use super::artwork::Artwork;
use super::playback::PlayerEvent;
use super::types::EngineState;

#[derive(Debug, Clone, PartialEq)]
pub struct NowPlayingInfo {
    pub title: String,
    pub artist: String,
    /// 1.0 while playing, 0.0 otherwise.
    pub playback_rate: f64,
    pub duration: f64,
    pub elapsed: f64,
    pub artwork: Option<Artwork>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    Play,
    Pause,
    TogglePlayPause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    /// Nothing to act on (ex: empty session).
    NoActionableItem,
    CommandFailed,
}

/// Sink/source pair standing in for the platform media surface.
pub trait NowPlayingCenter {
    /// `None` clears the surface.
    fn publish(&mut self, info: Option<&NowPlayingInfo>);
    fn set_commands_enabled(&mut self, enabled: bool);
}

/// Forwards the surface to the GUI over the engine's event channel.
pub struct ChannelCenter {
    events: Sender<PlayerEvent>,
}

impl ChannelCenter {
    pub fn new(events: Sender<PlayerEvent>) -> Self {
        Self { events }
    }
}

impl NowPlayingCenter for ChannelCenter {
    fn publish(&mut self, info: Option<&NowPlayingInfo>) {
        let _ = self.events.send(PlayerEvent::NowPlaying(info.cloned()));
    }

    fn set_commands_enabled(&mut self, enabled: bool) {
        let _ = self.events.send(PlayerEvent::RemoteCommandsEnabled(enabled));
    }
}

pub struct NowPlayingBridge<C> {
    center: C,
    info: Option<NowPlayingInfo>,
    registered: bool,
}

impl<C: NowPlayingCenter> NowPlayingBridge<C> {
    pub fn new(center: C) -> Self {
        Self {
            center,
            info: None,
            registered: false,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Full metadata publish (session start).
    pub fn configure(
        &mut self,
        title: &str,
        artist: &str,
        artwork: Option<Artwork>,
        state: &EngineState,
    ) {
        self.info = Some(NowPlayingInfo {
            title: title.to_string(),
            artist: artist.to_string(),
            playback_rate: rate(state),
            duration: state.total_duration as f64,
            elapsed: state.elapsed() as f64,
            artwork,
        });
        self.center.publish(self.info.as_ref());
    }

    /// Transport change: rate, elapsed and duration.
    pub fn update_playback(&mut self, state: &EngineState) {
        if let Some(info) = self.info.as_mut() {
            info.playback_rate = rate(state);
            info.elapsed = state.elapsed() as f64;
            info.duration = state.total_duration as f64;
            self.center.publish(self.info.as_ref());
        }
    }

    pub fn update_elapsed(&mut self, state: &EngineState) {
        if let Some(info) = self.info.as_mut() {
            info.elapsed = state.elapsed() as f64;
            self.center.publish(self.info.as_ref());
        }
    }

    pub fn clear(&mut self) {
        self.info = None;
        self.center.publish(None);
    }

    pub fn register_commands(&mut self) {
        if !self.registered {
            self.registered = true;
            self.center.set_commands_enabled(true);
        }
    }

    pub fn unregister_commands(&mut self) {
        if self.registered {
            self.registered = false;
            self.center.set_commands_enabled(false);
        }
    }
}

fn rate(state: &EngineState) -> f64 {
    if state.is_playing { 1.0 } else { 0.0 }
}
