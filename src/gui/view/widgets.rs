//! Reusable small widgets/helpers used across view modules.

use iced::widget::{column, container, image, row, slider, text};
use iced::{Alignment, Element, Length};

use super::super::state::Message;
use super::constants::{LABEL_W, SMALL_TEXT};

pub(crate) fn cover_placeholder(size: f32) -> iced::widget::Container<'static, Message> {
    container(
        column![text("☾").size(28), text("inara").size(SMALL_TEXT)]
            .spacing(4)
            .align_x(Alignment::Center),
    )
    .width(Length::Fixed(size))
    .height(Length::Fixed(size))
    .center_x(Length::Fill)
    .center_y(Length::Fill)
}

/// If `handle` exists, show it; otherwise show the placeholder.
/// Returns an Element so callers can embed it in `row![]` easily.
pub(crate) fn cover_thumb(handle: Option<&image::Handle>, size: f32) -> Element<'static, Message> {
    match handle {
        Some(h) => container(image(h.clone()))
            .width(Length::Fixed(size))
            .height(Length::Fixed(size))
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into(),
        None => cover_placeholder(size).into(),
    }
}

/// Labeled 0..=1 slider (mix controls).
pub(crate) fn volume_row<'a>(
    label: &'a str,
    value: f32,
    on_change: impl Fn(f32) -> Message + 'a,
) -> iced::widget::Row<'a, Message> {
    let value = value.clamp(0.0, 1.0);
    row![
        text(label).width(Length::Fixed(LABEL_W)),
        slider(0.0..=1.0, value, on_change)
            .step(0.01_f32)
            .width(Length::Fill),
        text(format!("{:>3}%", (value * 100.0).round() as u32)).size(SMALL_TEXT),
    ]
    .spacing(8)
    .align_y(Alignment::Center)
}
