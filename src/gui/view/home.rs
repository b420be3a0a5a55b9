//! Home screen: the session catalogue.

use iced::widget::{Column, button, column, container, scrollable, text};
use iced::{Alignment, Length};

use super::super::state::{Inara, Message};
use super::constants::{
    CONTENT_W, PAGE_PAD, ROW_TEXT, SESSION_LIST_SPACING, SESSION_ROW_H, SMALL_TEXT, TITLE_TEXT,
};

pub(crate) fn build_home(state: &Inara) -> iced::widget::Container<'_, Message> {
    let mut list = Column::new().spacing(SESSION_LIST_SPACING);

    for (i, entry) in state.settings.sessions.iter().enumerate() {
        let label = column![
            text(entry.title.as_str()).size(ROW_TEXT),
            text(entry.subtitle.as_str()).size(SMALL_TEXT),
        ]
        .spacing(2);

        list = list.push(
            button(label)
                .width(Length::Fill)
                .height(Length::Fixed(SESSION_ROW_H))
                .padding(10)
                .on_press(Message::OpenSession(i)),
        );
    }

    if state.settings.sessions.is_empty() {
        list = list.push(text("No sessions configured."));
    }

    let page = column![
        text("Inara").size(TITLE_TEXT),
        text(state.status.as_str()).size(SMALL_TEXT),
        scrollable(list).height(Length::Fill),
    ]
    .spacing(16)
    .width(Length::Fixed(CONTENT_W))
    .align_x(Alignment::Start);

    container(page).padding(PAGE_PAD).center_x(Length::Fill)
}
