//! Recording path translation and destination computation.
//!
//! The recorder may run on another machine (or in a container) and report
//! paths that only make sense there. A [`PathTranslationTable`] rewrites those
//! paths into ones this process can open, e.g. `/mnt/recordings` on the
//! recorder host to `/home/smb/recordings` locally.

use std::io;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors parsing translation or shorthand tables.
#[derive(Debug, Error)]
pub enum TableError {
    /// The input was not a JSON object of the expected shape.
    #[error("invalid table JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A table value was not a string.
    #[error("value for {key:?} must be a string")]
    NonStringValue { key: String },
}

/// One prefix rewrite: paths under `from` are moved under `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRule {
    pub from: String,
    pub to: String,
}

impl TranslationRule {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Ordered list of prefix rewrites.
///
/// Rules are tried in order and the first matching prefix wins, even if a
/// later rule has a longer (more specific) prefix. Prefixes may use either
/// separator style regardless of the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathTranslationTable(Vec<TranslationRule>);

impl PathTranslationTable {
    pub fn new(rules: Vec<TranslationRule>) -> Self {
        Self(rules)
    }

    /// Parses a JSON object such as `{"/mnt/rec": "/home/me/rec"}`.
    ///
    /// Key order in the document is the rule order.
    pub fn from_json(json: &str) -> Result<Self, TableError> {
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
        let rules = object
            .into_iter()
            .map(|(from, to)| match to {
                serde_json::Value::String(to) => Ok(TranslationRule { from, to }),
                _ => Err(TableError::NonStringValue { key: from }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(rules))
    }

    pub fn rules(&self) -> &[TranslationRule] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rewrites `path` through the first rule whose source prefix matches.
    ///
    /// Paths and prefixes are compared as lexically normalized segment lists
    /// in which both `/` and `\` separate segments, so a rule written for a
    /// recorder on Windows (`C:\`) matches its paths on any host. A prefix
    /// matches whole segments only. The unmatched remainder is joined onto the
    /// rule's target with the local separator. Returns `path` unchanged when
    /// no rule matches.
    pub fn translate(&self, path: &Path) -> PathBuf {
        let raw = path.to_string_lossy();
        let target = segments(&raw);

        for rule in &self.0 {
            let prefix = segments(&rule.from);
            if prefix.is_empty() || !target.starts_with(&prefix) {
                continue;
            }

            let mut translated = PathBuf::from(&rule.to);
            translated.extend(&target[prefix.len()..]);
            tracing::info!(
                from = %path.display(),
                to = %translated.display(),
                "translated recording path"
            );
            return translated;
        }

        path.to_path_buf()
    }
}

/// Splits a path string into comparable segments, accepting `/` and `\`.
///
/// A leading empty segment marks an absolute path. Empty and `.` segments are
/// dropped; `..` folds into the preceding segment but never past the root or
/// a drive (`C:`).
fn segments(path: &str) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();

    for (index, segment) in path.split(['/', '\\']).enumerate() {
        match segment {
            "" if index == 0 => out.push(""),
            "" | "." => {}
            ".." => match out.last() {
                None | Some(&"..") => out.push(".."),
                Some(&"") => {}
                Some(drive) if out.len() == 1 && drive.ends_with(':') => {}
                Some(_) => {
                    out.pop();
                }
            },
            other => out.push(other),
        }
    }
    out
}

/// Computes the absolute folder a recording at `path` should be moved into:
/// `dirname(path)/dest_base/sanitized_title`.
///
/// The directory is not created here.
pub fn destination_dir(path: &Path, dest_base: &Path, sanitized_title: &str) -> io::Result<PathBuf> {
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let joined = parent.join(dest_base).join(sanitized_title);
    Ok(normalize(&std::path::absolute(joined)?))
}

/// Lexically normalizes a path: drops `.` components, folds `..` into the
/// preceding component and collapses repeated separators.
///
/// Symlinks are not resolved.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }

    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
