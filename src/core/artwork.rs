//! core/artwork.rs
//! Now-Playing artwork: a configured image file, else the picture embedded in
//! the soundscape's ID3 tag.

use std::path::Path;

use id3::Tag;
use id3::frame::Content;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artwork {
    pub data: Vec<u8>,
    pub mime: String,
}

pub fn load_artwork(configured: Option<&Path>, soundscape: Option<&Path>) -> Option<Artwork> {
    if let Some(path) = configured {
        match std::fs::read(path) {
            Ok(data) => {
                return Some(Artwork {
                    data,
                    mime: mime_from_extension(path).to_string(),
                });
            }
            Err(e) => warn!(path = %path.display(), error = %e, "artwork unreadable"),
        }
    }

    soundscape.and_then(read_embedded_art)
}

/// First embedded picture (APIC/PIC). Unreadable tags are just "no art".
pub fn read_embedded_art(path: &Path) -> Option<Artwork> {
    let tag = match Tag::read_from_path(path) {
        Ok(t) => t,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no readable tag");
            return None;
        }
    };

    tag.frames()
        .filter(|f| f.id() == "APIC" || f.id() == "PIC")
        .find_map(|f| match f.content() {
            Content::Picture(p) => Some(Artwork {
                data: p.data.clone(),
                mime: p.mime_type.clone(),
            }),
            _ => None,
        })
}

fn mime_from_extension(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
