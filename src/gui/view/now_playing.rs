//! "Now Playing" panel: the desktop stand-in for the OS media surface.
//! Its buttons are the remote-command source.

use iced::widget::{button, column, container, row, text};
use iced::{Alignment, Length};

use super::super::state::{Message, PlayerSession};
use super::super::util::fmt_position;
use super::constants::{COVER_SMALL, SMALL_TEXT};
use super::widgets::cover_thumb;
use crate::core::now_playing::RemoteCommand;

pub(crate) fn build_now_playing(session: &PlayerSession) -> iced::widget::Container<'_, Message> {
    let Some(info) = &session.now_playing else {
        return container(text("Not playing").size(SMALL_TEXT)).padding(8);
    };

    let rate = if info.playback_rate > 0.0 { "▶" } else { "❚❚" };
    let details = column![
        text(info.title.as_str()),
        text(info.artist.as_str()).size(SMALL_TEXT),
        text(format!(
            "{rate}  {} / {}",
            fmt_position(info.elapsed),
            fmt_position(info.duration)
        ))
        .size(SMALL_TEXT),
    ]
    .spacing(4)
    .width(Length::Fill);

    let enabled = session.remote_enabled;
    let buttons = row![
        remote_button("Play", RemoteCommand::Play, enabled),
        remote_button("Pause", RemoteCommand::Pause, enabled),
        remote_button("Toggle", RemoteCommand::TogglePlayPause, enabled),
    ]
    .spacing(6);

    let panel = row![
        cover_thumb(session.artwork.as_ref(), COVER_SMALL),
        details,
        buttons,
    ]
    .spacing(12)
    .align_y(Alignment::Center);

    container(panel).padding(8)
}

/// Disabled until the engine registers its command handlers.
fn remote_button(
    label: &'static str,
    command: RemoteCommand,
    enabled: bool,
) -> iced::widget::Button<'static, Message> {
    button(text(label).size(SMALL_TEXT)).on_press_maybe(enabled.then_some(Message::Remote(command)))
}
