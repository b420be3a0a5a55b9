//! core/mod.rs
//!
//! The brain of the app:
//! - Resolve a session's audio assets (soundscape, narrations, bell)
//! - Own the playback timeline on its own thread
//! - Return plain data structs for the GUI to render
//!
//! No GUI code lives here. The GUI talks to the engine through
//! `playback::PlaybackController` and reads `playback::PlayerEvent`s back.

pub mod artwork;
pub mod assets;
pub mod config;
pub mod error;
pub mod now_playing;
pub mod playback;
pub mod telemetry;
pub mod types;
