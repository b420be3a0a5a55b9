//! gui/subscription.rs
//! Poll engine events by emitting a periodic TickPlayback message.

use iced::{Subscription, time};
use std::time::Duration;

use super::state::{Inara, Message};

pub(crate) fn subscription(state: &Inara) -> Subscription<Message> {
    if state.session.is_none() {
        return Subscription::none();
    }

    time::every(Duration::from_millis(200)).map(|_| Message::TickPlayback)
}
