//! core/config.rs
//! `inara.json` settings: asset root, accepted extensions, initial mix and the
//! session catalogue.
//!
//! Every field has a default so a partial file still loads.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::ConfigError;
use super::types::SessionDescriptor;

/// Env var that overrides the settings path.
pub const CONFIG_ENV: &str = "INARA_CONFIG";
const CONFIG_FILE: &str = "inara.json";

/// One card on the home list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    pub folder: String,
}

impl SessionEntry {
    fn new(title: &str, subtitle: &str, folder: &str) -> Self {
        Self {
            title: title.to_string(),
            subtitle: subtitle.to_string(),
            folder: folder.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub assets_root: PathBuf,
    /// Probe order matters: earlier extensions win.
    pub extensions: Vec<String>,
    pub artist: String,
    pub artwork: Option<PathBuf>,
    pub soundscape_volume: f32,
    pub narration_volume: f32,
    pub sessions: Vec<SessionEntry>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            assets_root: PathBuf::from("assets"),
            extensions: vec!["mp3".to_string(), "m4a".to_string()],
            artist: "Inara".to_string(),
            artwork: None,
            soundscape_volume: 0.5,
            narration_volume: 0.5,
            sessions: vec![
                SessionEntry::new("Calm", "Inara", "audio/calming"),
                SessionEntry::new("Confidence", "Ikaro", "audio/focus"),
                SessionEntry::new("Open Heart", "528 Hertz", "audio/compassion"),
                SessionEntry::new("Balance", "Arbol del Tule", "audio/selfawareness"),
            ],
        }
    }
}

impl Settings {
    /// `$INARA_CONFIG`, else `./inara.json`.
    pub fn resolve_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
    }

    /// Missing file = defaults. Unreadable or malformed = error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no settings file; using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let mut settings: Settings =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        settings.soundscape_volume = settings.soundscape_volume.clamp(0.0, 1.0);
        settings.narration_volume = settings.narration_volume.clamp(0.0, 1.0);
        Ok(settings)
    }

    /// Configured artwork path, relative paths resolved under `assets_root`.
    pub fn artwork_path(&self) -> Option<PathBuf> {
        let p = self.artwork.as_ref()?;
        if p.is_absolute() {
            Some(p.clone())
        } else {
            Some(self.assets_root.join(p))
        }
    }

    pub fn session_descriptor(&self, index: usize) -> Option<SessionDescriptor> {
        self.sessions
            .get(index)
            .map(|s| SessionDescriptor::new(s.title.clone(), s.folder.clone()))
    }
}
