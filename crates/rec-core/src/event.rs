//! Recorder events consumed by the session controller.

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Recorder output state as reported with every state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputState {
    Unknown,
    Starting,
    Started,
    Stopping,
    Stopped,
    Reconnecting,
    Reconnected,
    Paused,
    Resumed,
}

impl OutputState {
    /// Pause and resume reports never start or end a session.
    pub const fn is_pause_marker(self) -> bool {
        matches!(self, Self::Paused | Self::Resumed)
    }

    /// Parses a wire string, mapping unrecognized states to `Unknown`.
    pub fn parse_lossy(s: &str) -> Self {
        s.parse().unwrap_or(Self::Unknown)
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "OBS_WEBSOCKET_OUTPUT_UNKNOWN",
            Self::Starting => "OBS_WEBSOCKET_OUTPUT_STARTING",
            Self::Started => "OBS_WEBSOCKET_OUTPUT_STARTED",
            Self::Stopping => "OBS_WEBSOCKET_OUTPUT_STOPPING",
            Self::Stopped => "OBS_WEBSOCKET_OUTPUT_STOPPED",
            Self::Reconnecting => "OBS_WEBSOCKET_OUTPUT_RECONNECTING",
            Self::Reconnected => "OBS_WEBSOCKET_OUTPUT_RECONNECTED",
            Self::Paused => "OBS_WEBSOCKET_OUTPUT_PAUSED",
            Self::Resumed => "OBS_WEBSOCKET_OUTPUT_RESUMED",
        }
    }
}

impl fmt::Display for OutputState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutputState {
    type Err = UnknownOutputState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OBS_WEBSOCKET_OUTPUT_UNKNOWN" => Ok(Self::Unknown),
            "OBS_WEBSOCKET_OUTPUT_STARTING" => Ok(Self::Starting),
            "OBS_WEBSOCKET_OUTPUT_STARTED" => Ok(Self::Started),
            "OBS_WEBSOCKET_OUTPUT_STOPPING" => Ok(Self::Stopping),
            "OBS_WEBSOCKET_OUTPUT_STOPPED" => Ok(Self::Stopped),
            "OBS_WEBSOCKET_OUTPUT_RECONNECTING" => Ok(Self::Reconnecting),
            "OBS_WEBSOCKET_OUTPUT_RECONNECTED" => Ok(Self::Reconnected),
            "OBS_WEBSOCKET_OUTPUT_PAUSED" => Ok(Self::Paused),
            "OBS_WEBSOCKET_OUTPUT_RESUMED" => Ok(Self::Resumed),
            _ => Err(UnknownOutputState(s.to_string())),
        }
    }
}

impl Serialize for OutputState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OutputState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse_lossy(&s))
    }
}

/// Error type for unknown output state strings.
#[derive(Debug, Clone)]
pub struct UnknownOutputState(String);

impl fmt::Display for UnknownOutputState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown output state: {}", self.0)
    }
}

impl std::error::Error for UnknownOutputState {}

/// A recording output state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChange {
    pub output_active: bool,
    pub output_state: OutputState,
    #[serde(default)]
    pub output_path: Option<String>,
}

impl StateChange {
    pub fn new(output_active: bool, output_state: OutputState) -> Self {
        Self {
            output_active,
            output_state,
            output_path: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.output_path = Some(path.into());
        self
    }
}

/// Handlers for the two recorder event kinds.
///
/// The event source calls these one at a time and waits for each to finish
/// before delivering the next event.
pub trait RecorderEvents {
    /// The recorder reported a new or current output file.
    fn output_path_changed(&mut self, path: Option<String>);

    /// The recording output changed state.
    fn output_state_changed(&mut self, change: StateChange) -> impl Future<Output = ()>;
}
