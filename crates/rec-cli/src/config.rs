//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use rec_core::{MoverSettings, PathTranslationTable, ShorthandTable};
use rec_obs::Endpoint;
use serde::{Deserialize, Serialize};

const REDACTED: &str = "[REDACTED]";

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// OBS WebSocket host.
    pub host: String,
    /// OBS WebSocket port.
    pub port: u16,
    /// OBS WebSocket password. Empty when authentication is disabled.
    pub password: String,
    /// Destination base, relative to each recording's folder.
    pub dest_base: PathBuf,
    /// Seconds between active window samples.
    pub track_interval: u64,
    /// Shell command printing the active window title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_command: Option<String>,
    /// Recorder path prefixes to rewrite, tried in order.
    #[serde(default)]
    pub translate: PathTranslationTable,
    /// Sanitized title overrides.
    #[serde(default)]
    pub shorthand: ShorthandTable,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &REDACTED)
            .field("dest_base", &self.dest_base)
            .field("track_interval", &self.track_interval)
            .field("track_command", &self.track_command)
            .field("translate", &self.translate)
            .field("shorthand", &self.shorthand)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 4455,
            password: String::new(),
            dest_base: PathBuf::from(".."),
            track_interval: 1,
            track_command: None,
            translate: PathTranslationTable::default(),
            shorthand: ShorthandTable::default(),
        }
    }
}

/// Values given on the command line. Unset fields leave the loaded
/// configuration alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_base: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translate: Option<PathTranslationTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shorthand: Option<ShorthandTable>,
}

impl Config {
    /// Loads configuration, optionally from a specific file, with command-line
    /// overrides applied last.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(
        config_path: Option<&Path>,
        overrides: &Overrides,
    ) -> std::result::Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (RECMOVE_*)
        figment = figment.merge(Env::prefixed("RECMOVE_"));

        figment = figment.merge(Serialized::defaults(overrides));

        figment.extract()
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("failed to create config directory")?;
        }
        let contents = toml::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// A copy safe to print or log.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.password.is_empty() {
            config.password = REDACTED.to_string();
        }
        config
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    /// Settings for the session controller. Intervals below a second are
    /// raised to one second.
    pub fn mover_settings(&self) -> MoverSettings {
        MoverSettings {
            dest_base: self.dest_base.clone(),
            track_interval: self.track_interval_duration(),
            translate: self.translate.clone(),
            shorthand: self.shorthand.clone(),
        }
    }

    pub fn track_interval_duration(&self) -> Duration {
        Duration::from_secs(self.track_interval.max(1))
    }
}

/// Returns the default config file path.
///
/// On Linux: `~/.config/recmove/config.toml`
pub fn default_config_file() -> Option<PathBuf> {
    dirs_config_path().map(|p| p.join("config.toml"))
}

/// Returns the platform-specific config directory for recmove.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("recmove"))
}

/// Returns the platform-specific data directory for recmove.
///
/// On Linux: `~/.local/share/recmove`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("recmove"))
}
