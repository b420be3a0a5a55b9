//! gui/update/sessions.rs
//! Opening and leaving a session (one engine thread per open session).

use iced::Task;
use tracing::{error, info};

use super::super::state::{Inara, Message, PlayerSession};
use super::super::util::session_summary;
use crate::core::assets::category_token;
use crate::core::playback::{PlayerCommand, start_playback};
use crate::core::types::SessionSummary;

pub(crate) fn open_session(state: &mut Inara, index: usize) -> Task<Message> {
    if state.session.is_some() {
        let _ = close_session(state);
    }

    let Some(descriptor) = state.settings.session_descriptor(index) else {
        state.status = "That session no longer exists.".into();
        return Task::none();
    };
    let subtitle = state
        .settings
        .sessions
        .get(index)
        .map(|s| s.subtitle.clone())
        .unwrap_or_default();

    let (controller, events) = match start_playback(&state.settings) {
        Ok(pair) => pair,
        Err(e) => {
            error!(error = %e, "playback engine failed to start");
            state.status = format!("Playback engine failed to start: {e}");
            return Task::none();
        }
    };

    info!(title = %descriptor.title, folder = %descriptor.folder, "opening session");

    let title = descriptor.title.clone();
    let emotion = category_token(&descriptor.folder).to_string();
    controller.send(PlayerCommand::Configure(descriptor));
    controller.send(PlayerCommand::SetVolumes {
        soundscape: state.soundscape_volume,
        narration: state.narration_volume,
    });
    controller.send(PlayerCommand::Start);

    state.status = format!("Loading {title}…");
    state.session = Some(PlayerSession::new(title, subtitle, emotion, controller, events));

    Task::none()
}

pub(crate) fn close_session(state: &mut Inara) -> Task<Message> {
    let Some(session) = state.session.take() else {
        return Task::none();
    };

    if session.engine.has_started() && !session.finished {
        hand_off(session_summary(
            &session.title,
            &session.emotion,
            &session.engine,
            false,
        ));
    }

    session.controller.send(PlayerCommand::Stop);
    session.controller.send(PlayerCommand::Shutdown);

    state.status = "Choose a session.".into();
    Task::none()
}

/// Entry point of the reflection flow (out of scope here, so it is logged).
pub(super) fn hand_off(summary: SessionSummary) {
    info!(
        title = %summary.title,
        emotion = %summary.emotion,
        duration = summary.duration_seconds,
        completed = summary.completed,
        "session summary"
    );
}
