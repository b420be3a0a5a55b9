//! GUI renderer (reads state, produces widgets; no mutation).

mod constants;
mod home;
mod now_playing;
mod player;
mod widgets;

use iced::Element;

use super::state::{Inara, Message};

pub(crate) fn view(state: &Inara) -> Element<'_, Message> {
    match &state.session {
        Some(session) => player::build_player(state, session).into(),
        None => home::build_home(state).into(),
    }
}
