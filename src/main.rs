//! Inara GUI
//!
//! # What this program is
//! A small desktop meditation player (built with the `iced` GUI library). A
//! session is up to four audio files found by naming convention under a
//! session folder:
//! - a looping soundscape, whose length is the session length
//! - an opening narration at the start
//! - a closing narration timed to end with the soundscape
//! - an intro bell that rings before the timeline starts
//!
//! # How Iced works (super simple mental model)
//! - `Inara` = the *entire memory* of the app (all the state)
//! - `Message` = “something happened” (button clicked, slider dragged, tick)
//! - `update(state, message)` = handles that thing and updates state
//! - `view(state)` = draws UI based on the current state
//!
//! # Architecture constraints (on purpose)
//! - `core` owns audio, timing and asset lookup; it never imports iced.
//! - The engine runs on its own thread. The GUI sends `PlayerCommand`s and
//!   polls `PlayerEvent`s every 200 ms.
//!
//! # Configuration
//! `inara.json` in the working directory (or `$INARA_CONFIG`). Logging follows
//! `RUST_LOG`, default `info`.

mod core;
mod gui;

use tracing::{error, info};

use core::config::Settings;
use core::telemetry::init_tracing;
use gui::{Inara, subscription, update, view};

fn main() -> iced::Result {
    init_tracing();

    let path = Settings::resolve_path();
    let settings = match Settings::load(&path) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "settings ignored; using defaults");
            Settings::default()
        }
    };
    info!(
        assets = %settings.assets_root.display(),
        sessions = settings.sessions.len(),
        "starting"
    );

    // `iced::application` glues together:
    // - boot (initial state)
    // - update (mutate state)
    // - view (draw UI)
    iced::application(move || Inara::new(settings.clone()), update, view)
        .title("Inara")
        .subscription(subscription)
        .run()
}
