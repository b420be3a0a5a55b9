//! gui/update/mod.rs
//! Update logic (router).
//! Mutates state in response to `Message` events.

use iced::Task;

use super::state::{Inara, Message};

mod playback;
mod sessions;

pub(crate) fn update(state: &mut Inara, message: Message) -> Task<Message> {
    match message {
        Message::TickPlayback => playback::drain_events(state),

        // Navigation
        Message::OpenSession(i) => sessions::open_session(state, i),
        Message::CloseSession => sessions::close_session(state),

        // Transport
        Message::TogglePlayPause => playback::toggle_play_pause(state),

        // Seek: preview vs commit
        Message::ScrubTo(seconds) => playback::scrub_preview(state, seconds),
        Message::ScrubCommit => playback::scrub_commit(state),

        // Mix
        Message::SoundscapeVolume(v) => playback::set_soundscape_volume(state, v),
        Message::NarrationVolume(v) => playback::set_narration_volume(state, v),

        Message::Remote(command) => playback::remote(state, command),
    }
}
