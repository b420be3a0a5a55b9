//! gui/update/playback.rs
//! GUI-engine bridge
//!
//! Design goals:
//! - GUI never touches rodio/symphonia directly.
//! - All IO / timing is driven by the engine + TickPlayback polling.
//! - `EngineState` is replaced wholesale, never patched locally.

use iced::Task;
use iced::widget::image;
use tracing::{debug, warn};

use super::super::state::{Inara, Message};
use super::super::util::session_summary;
use super::sessions::hand_off;
use crate::core::now_playing::{CommandStatus, RemoteCommand};
use crate::core::playback::{PlayerCommand, PlayerEvent};

pub(crate) fn drain_events(state: &mut Inara) -> Task<Message> {
    let Some(session) = state.session.as_ref() else {
        return Task::none();
    };

    let drained: Vec<PlayerEvent> = session.events.try_iter().collect();
    for ev in drained {
        handle_event(state, ev);
    }

    Task::none()
}

fn handle_event(state: &mut Inara, event: PlayerEvent) {
    let Some(session) = state.session.as_mut() else {
        return;
    };

    match event {
        PlayerEvent::State(engine) => {
            session.engine = engine;
            if engine.is_playing {
                session.finished = false;
            }
        }
        PlayerEvent::NowPlaying(info) => {
            session.artwork = info
                .as_ref()
                .and_then(|i| i.artwork.as_ref())
                .map(|art| image::Handle::from_bytes(art.data.clone()));
            session.now_playing = info;
        }
        PlayerEvent::RemoteCommandsEnabled(enabled) => session.remote_enabled = enabled,
        PlayerEvent::RemoteHandled { command, status } => {
            debug!(?command, ?status, "remote command handled");
            match status {
                CommandStatus::Success => {}
                CommandStatus::NoActionableItem => {
                    state.status = "Nothing to play in this session.".into();
                }
                CommandStatus::CommandFailed => {
                    state.status = format!("{command:?} failed.");
                }
            }
        }
        PlayerEvent::Loaded(roles) => {
            state.status = if roles.is_empty() {
                format!("{}: no audio found.", session.title)
            } else {
                format!("{}: {} of 4 tracks loaded.", session.title, roles.len())
            };
            session.loaded = roles;
        }
        PlayerEvent::SessionFinished { duration } => {
            session.finished = true;
            session.scrub_preview = None;
            hand_off(session_summary(
                &session.title,
                &session.emotion,
                &session.engine,
                true,
            ));
            state.status = format!("Session complete ({} min).", duration / 60);
        }
        PlayerEvent::Error(err) => {
            warn!(error = %err, "engine reported an error");
            state.status = format!("Playback error: {err}");
        }
    }
}

pub(crate) fn toggle_play_pause(state: &mut Inara) -> Task<Message> {
    let Some(session) = state.session.as_ref() else {
        return Task::none();
    };

    let cmd = if session.engine.is_playing {
        PlayerCommand::Pause
    } else {
        PlayerCommand::Play
    };
    session.controller.send(cmd);

    Task::none()
}

/// Seek slider moved: engine preview only, never starts playback.
pub(crate) fn scrub_preview(state: &mut Inara, seconds: f64) -> Task<Message> {
    let Some(session) = state.session.as_mut() else {
        return Task::none();
    };
    // Scrubbing is only offered once the session has been started.
    if !session.engine.has_started() {
        return Task::none();
    }

    let seconds = seconds.clamp(0.0, session.engine.total_duration as f64);
    session.scrub_preview = Some(seconds);
    session.controller.send(PlayerCommand::ScrubPreview(seconds));

    Task::none()
}

/// Seek slider released: commit the last preview, and keep going.
pub(crate) fn scrub_commit(state: &mut Inara) -> Task<Message> {
    let Some(session) = state.session.as_mut() else {
        return Task::none();
    };
    let Some(target) = session.scrub_preview.take() else {
        return Task::none();
    };

    session.controller.send(PlayerCommand::Seek(target));
    if !session.engine.is_playing {
        session.controller.send(PlayerCommand::Play);
    }

    Task::none()
}

pub(crate) fn set_soundscape_volume(state: &mut Inara, volume: f32) -> Task<Message> {
    state.soundscape_volume = volume.clamp(0.0, 1.0);
    send_volumes(state);
    Task::none()
}

pub(crate) fn set_narration_volume(state: &mut Inara, volume: f32) -> Task<Message> {
    state.narration_volume = volume.clamp(0.0, 1.0);
    send_volumes(state);
    Task::none()
}

fn send_volumes(state: &Inara) {
    if let Some(session) = &state.session {
        session.controller.send(PlayerCommand::SetVolumes {
            soundscape: state.soundscape_volume,
            narration: state.narration_volume,
        });
    }
}

/// Now-Playing panel buttons: the remote-command source.
pub(crate) fn remote(state: &mut Inara, command: RemoteCommand) -> Task<Message> {
    if let Some(session) = state.session.as_ref().filter(|s| s.remote_enabled) {
        session.controller.send(PlayerCommand::Remote(command));
    }
    Task::none()
}
