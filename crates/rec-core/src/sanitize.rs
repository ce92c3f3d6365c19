//! Window title sanitizing.
//!
//! Turns a raw window title such as `"main.rs - demo - Visual Studio Code"` into
//! a folder name that is safe to create on any filesystem. The last dash
//! separated segment is usually the application or game name, so that is the
//! part that survives.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::paths::TableError;

/// Trailing segments naming a graphics API (e.g. `"Game - Vulkan"`).
const GRAPHICS_API_TOKENS: [&str; 7] = [
    "vulkan", "direct3d", "opengl", "metal", "dx12", "dx11", "dx9",
];

/// A trailing segment at least this many characters longer than the token is
/// kept, since it is more likely a real title that happens to contain it.
const TOKEN_SLACK: usize = 6;

/// Exact-match overrides applied to sanitized titles.
///
/// Maps a sanitized title to the folder name that should be used instead,
/// e.g. `"Visual-Studio-Code"` to `"vscode"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShorthandTable(BTreeMap<String, String>);

impl ShorthandTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a table from a JSON object of string values.
    pub fn from_json(json: &str) -> Result<Self, TableError> {
        let map: BTreeMap<String, String> = serde_json::from_str(json)?;
        Ok(Self(map))
    }

    /// Adds or replaces an override.
    pub fn insert(&mut self, title: impl Into<String>, replacement: impl Into<String>) {
        self.0.insert(title.into(), replacement.into());
    }

    /// Returns the replacement for a sanitized title.
    ///
    /// Empty replacements are treated as absent.
    pub fn get(&self, title: &str) -> Option<&str> {
        self.0
            .get(title)
            .map(String::as_str)
            .filter(|replacement| !replacement.is_empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for ShorthandTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Reduces a raw window title to a filesystem-safe folder name.
///
/// Never fails: empty or garbage input yields an empty or pass-through string.
pub fn sanitize(raw_title: &str, shorthand: &ShorthandTable) -> String {
    let cleaned = extract_relevant_title(raw_title);
    match shorthand.get(&cleaned) {
        Some(replacement) => {
            tracing::debug!(title = %cleaned, %replacement, "applied shorthand");
            replacement.to_string()
        }
        None => cleaned,
    }
}

fn extract_relevant_title(raw_title: &str) -> String {
    let normalized = raw_title.replace('\u{2014}', "-");
    let title = normalized.trim();

    let mut segments: Vec<&str> = title
        .split('-')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.last().is_some_and(|last| is_graphics_api_suffix(last)) {
        segments.pop();
    }

    let chosen = match segments.last() {
        Some(last) => last_path_component(last),
        None => title,
    };

    let filtered: String = chosen
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect();

    filtered.split_whitespace().collect::<Vec<_>>().join("-")
}

fn is_graphics_api_suffix(segment: &str) -> bool {
    let compact = segment.to_lowercase().replace(' ', "");
    let length = compact.chars().count();
    GRAPHICS_API_TOKENS
        .iter()
        .any(|token| compact.contains(token) && length < token.len() + TOKEN_SLACK)
}

/// Returns the last component if the segment looks like a path.
fn last_path_component(segment: &str) -> &str {
    const SEPARATORS: [char; 2] = ['/', '\\'];

    if !segment.contains(SEPARATORS) {
        return segment;
    }
    segment
        .trim_end_matches(SEPARATORS)
        .rsplit(SEPARATORS)
        .next()
        .filter(|component| !component.is_empty())
        .unwrap_or(segment)
}
