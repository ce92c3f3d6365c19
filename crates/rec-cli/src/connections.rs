//! Successful connection bookkeeping.
//!
//! Every endpoint we have connected to at least once is remembered in
//! `connections.json` with the time of the last success. An endpoint with
//! history is assumed to come back eventually, so a failed connect waits for
//! it instead of giving up.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rec_obs::Endpoint;
use serde::{Deserialize, Serialize};

/// Last successful connection time per `host:port`, in unix seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionHistory(BTreeMap<String, i64>);

/// Returns the path to connections.json in the data directory.
pub fn connections_json_path() -> Result<PathBuf> {
    let data_dir = crate::config::dirs_data_path().context("could not determine data directory")?;
    Ok(data_dir.join("connections.json"))
}

impl ConnectionHistory {
    /// Loads the history from a specific path.
    ///
    /// A missing file is an empty history. Returns an error if the file exists
    /// but is unreadable/unparseable.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                serde_json::from_str(&content).context("failed to parse connections.json")
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).context("failed to read connections.json"),
        }
    }

    /// Writes the history to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("failed to create data directory")?;
        }
        let json = serde_json::to_string_pretty(self).context("failed to serialize history")?;
        std::fs::write(path, json).context("failed to write connections.json")?;
        Ok(())
    }

    /// When `endpoint` was last connected to successfully.
    pub fn last_success(&self, endpoint: &Endpoint) -> Option<DateTime<Utc>> {
        self.0
            .get(&endpoint.to_string())
            .and_then(|secs| DateTime::from_timestamp(*secs, 0))
    }

    /// Whether a failed connect to `endpoint` should be retried.
    pub fn should_wait_for(&self, endpoint: &Endpoint) -> bool {
        self.last_success(endpoint).is_some()
    }

    pub fn record_success(&mut self, endpoint: &Endpoint, at: DateTime<Utc>) {
        self.0.insert(endpoint.to_string(), at.timestamp());
    }
}
