//! Player screen: countdown, progress, seek, transport and mix.
//!
//! Emits only Messages (no rodio, no decoding).

use iced::widget::{button, column, container, progress_bar, row, slider, text};
use iced::{Alignment, Length};

use super::super::state::{Inara, Message, PlayerSession};
use super::super::util::{fmt_clock, fmt_position};
use super::constants::{CONTENT_W, COUNTDOWN_TEXT, PAGE_PAD, SMALL_TEXT, TITLE_TEXT};
use super::now_playing::build_now_playing;
use super::widgets::volume_row;

pub(crate) fn build_player<'a>(
    state: &'a Inara,
    session: &'a PlayerSession,
) -> iced::widget::Container<'a, Message> {
    let engine = &session.engine;

    let header = row![
        button("← Sessions").on_press(Message::CloseSession),
        column![
            text(session.title.as_str()).size(TITLE_TEXT),
            text(session.subtitle.as_str()).size(SMALL_TEXT),
        ]
        .spacing(2),
    ]
    .spacing(16)
    .align_y(Alignment::Center);

    // While dragging, the countdown follows the finger.
    let remaining = match session.scrub_preview {
        Some(p) => engine.total_duration.saturating_sub(p.floor() as u32),
        None => engine.time_remaining,
    };
    let countdown = text(fmt_clock(remaining)).size(COUNTDOWN_TEXT);

    let progress = progress_bar(0.0..=1.0, engine.progress as f32);

    // --- seek slider ---
    // slider needs a sane range; an empty session freezes it at 0..=1
    let total = engine.total_duration as f64;
    let seek_enabled = total > 0.0 && engine.has_started();
    let (seek_max, seek_val) = if total > 0.0 {
        (total, session.position().clamp(0.0, total))
    } else {
        (1.0, 0.0)
    };
    let seek = slider(0.0..=seek_max, seek_val, Message::ScrubTo)
        .on_release(Message::ScrubCommit)
        .width(Length::Fill);

    let seek_row = row![
        text(fmt_position(seek_val)).size(SMALL_TEXT),
        seek,
        text(fmt_clock(engine.total_duration)).size(SMALL_TEXT),
    ]
    .spacing(10)
    .align_y(Alignment::Center);

    let play_label = if engine.is_playing { "Pause" } else { "Play" };
    let play_btn = button(play_label)
        .padding(12)
        .on_press_maybe((engine.total_duration > 0).then_some(Message::TogglePlayPause));

    let hint = if seek_enabled {
        ""
    } else {
        "Press play to begin. Seeking unlocks once the session has started."
    };

    let mix = column![
        volume_row("Soundscape", state.soundscape_volume, Message::SoundscapeVolume),
        volume_row("Narration", state.narration_volume, Message::NarrationVolume),
    ]
    .spacing(6);

    let page = column![
        header,
        countdown,
        progress,
        seek_row,
        row![play_btn, text(hint).size(SMALL_TEXT)]
            .spacing(12)
            .align_y(Alignment::Center),
        mix,
        build_now_playing(session),
        text(state.status.as_str()).size(SMALL_TEXT),
    ]
    .spacing(18)
    .width(Length::Fixed(CONTENT_W))
    .align_x(Alignment::Start);

    container(page).padding(PAGE_PAD).center_x(Length::Fill)
}
