//! core/error.rs
//! Error types for the playback core and the settings loader.
//!
//! None of these are fatal. The engine logs them and degrades to a
//! shorter/simpler session instead of aborting.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::types::AudioRole;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no {role} asset found for session `{token}`")]
    ResourceMissing { role: AudioRole, token: String },

    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("audio output session unavailable: {0}")]
    SessionActivation(String),

    #[error("engine has no session configured")]
    NotConfigured,

    #[error("engine not started")]
    NotStarted,

    #[error("session has no soundscape")]
    EmptySession,

    #[error("failed to spawn playback thread: {0}")]
    Thread(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read settings {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed settings {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
