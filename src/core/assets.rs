//! core/assets.rs
//! Asset resolution: session folder + role -> zero or one audio file.
//!
//! Probe order is scope, then name, then extension. The first existing file
//! wins. Nothing found is not an error; the engine just plays without that
//! role.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::AudioRole;

/// Existence check against some asset store (a directory on disk in the app,
/// an in-memory set in tests).
pub trait AssetLocator {
    /// Full path of `relative` if it names an existing file.
    fn locate(&self, relative: &Path) -> Option<PathBuf>;
}

/// Looks for assets under a root directory.
#[derive(Debug, Clone)]
pub struct FsLocator {
    root: PathBuf,
}

impl FsLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetLocator for FsLocator {
    fn locate(&self, relative: &Path) -> Option<PathBuf> {
        let path = self.root.join(relative);
        path.is_file().then_some(path)
    }
}

/// Last path component of a folder: `audio/calming` -> `calming`.
pub fn category_token(folder: &str) -> &str {
    folder.trim_matches('/').rsplit('/').next().unwrap_or("")
}

/// Candidate file stems for `role`, most specific first.
pub fn candidate_names(role: AudioRole, token: &str) -> Vec<String> {
    let (stem, alias, generic): (&str, Option<&str>, &[&str]) = match role {
        AudioRole::Soundscape => ("soundscape", None, &["soundscape", "Soundscape"]),
        AudioRole::OpeningNarration => ("opening", Some("intro"), &["opening", "Opening"]),
        AudioRole::ClosingNarration => ("closing", Some("outro"), &["closing", "Closing"]),
        AudioRole::IntroBell => return vec!["start".into(), "bell".into(), "Bell".into()],
    };

    let mut names = Vec::new();
    if !token.is_empty() {
        names.push(format!("{token}_{stem}"));
        names.push(format!("{stem}_{token}"));
    }
    names.extend(generic.iter().map(|s| s.to_string()));

    if let Some(alias) = alias {
        if !token.is_empty() {
            names.push(format!("{token}_{alias}"));
            names.push(format!("{alias}_{token}"));
        }
        names.push(alias.to_string());
    }

    names
}

/// Container scopes to probe, in priority order. `""` is the asset root.
pub fn candidate_scopes(role: AudioRole, folder: &str) -> Vec<String> {
    let folder = folder.trim_matches('/');
    let token = category_token(folder);

    let mut scopes: Vec<String> = Vec::new();
    if role == AudioRole::IntroBell {
        scopes.push("audio/player".into());
    }
    if !folder.is_empty() {
        scopes.push(folder.to_string());
    }
    if !token.is_empty() {
        scopes.push(format!("audio/{token}"));
    }
    scopes.push("audio".into());
    if !token.is_empty() {
        scopes.push(token.to_string());
    }
    scopes.push(String::new());

    let mut seen = std::collections::HashSet::new();
    scopes.retain(|s| seen.insert(s.clone()));
    scopes
}

pub struct AssetResolver<L> {
    locator: L,
    extensions: Vec<String>,
}

impl<L: AssetLocator> AssetResolver<L> {
    pub fn new(locator: L, extensions: Vec<String>) -> Self {
        Self {
            locator,
            extensions,
        }
    }

    pub fn resolve(&self, role: AudioRole, folder: &str) -> Option<PathBuf> {
        let token = category_token(folder);
        let names = candidate_names(role, token);

        for scope in candidate_scopes(role, folder) {
            let dir = Path::new(&scope);
            for name in &names {
                for ext in &self.extensions {
                    let relative = dir.join(format!("{name}.{ext}"));
                    if let Some(found) = self.locator.locate(&relative) {
                        debug!(%role, path = %found.display(), "asset found");
                        return Some(found);
                    }
                }
            }
        }

        debug!(%role, folder, "no asset candidate matched");
        None
    }
}
