//! OBS WebSocket integration for the recording mover.
//!
//! Speaks just enough of obs-websocket protocol v5 to follow recordings:
//! - Handshake: `Hello` → `Identify` (with authentication) → `Identified`
//! - Event subscription: the `Outputs` category only
//! - Events: `RecordStateChanged` and `RecordFileChanged`
//!
//! Events are handed to a [`RecorderEvents`] handler one at a time; the next
//! frame is not read until the handler has returned.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::{SinkExt, Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use rec_core::{RecorderEvents, StateChange};

const OP_HELLO: u8 = 0;
const OP_IDENTIFY: u8 = 1;
const OP_IDENTIFIED: u8 = 2;
const OP_EVENT: u8 = 5;

const RPC_VERSION: u32 = 1;
/// `EventSubscription::Outputs`, which carries both recording events.
const EVENT_SUBSCRIPTIONS: u32 = 1 << 6;
/// Close code OBS sends when the `Identify` authentication string is wrong.
const CLOSE_AUTHENTICATION_FAILED: u16 = 4009;

/// OBS client errors.
#[derive(Debug, Error)]
pub enum ObsError {
    /// Transport-level failure (connect, read, write).
    #[error("websocket error: {0}")]
    WebSocket(#[source] Box<tungstenite::Error>),
    /// A message could not be parsed.
    #[error("invalid message from OBS: {0}")]
    Json(#[from] serde_json::Error),
    /// OBS sent something unexpected during the handshake.
    #[error("handshake failed: {0}")]
    Handshake(String),
    /// OBS rejected the password.
    #[error("authentication failed: {reason}")]
    AuthenticationFailed { reason: String },
}

impl From<tungstenite::Error> for ObsError {
    fn from(err: tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

/// Where OBS is listening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A recording event decoded from an OBS `Event` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObsEvent {
    /// `RecordFileChanged`: the recording continues in a new file.
    OutputPathChanged(Option<String>),
    /// `RecordStateChanged`.
    OutputStateChanged(StateChange),
}

/// An identified connection to OBS.
pub struct EventClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl fmt::Debug for EventClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventClient").finish_non_exhaustive()
    }
}

impl EventClient {
    /// Connects and completes the identification handshake.
    pub async fn connect(endpoint: &Endpoint, password: &str) -> Result<Self, ObsError> {
        let (mut stream, _response) = connect_async(endpoint.url()).await?;

        let hello: Hello = expect_op(&mut stream, OP_HELLO).await?;
        tracing::debug!(
            obs_version = hello.obs_web_socket_version.as_deref().unwrap_or("unknown"),
            rpc_version = hello.rpc_version,
            "received hello"
        );

        let authentication = hello.authentication.map(|challenge| {
            if password.is_empty() {
                tracing::warn!("OBS requires a password but none is configured");
            }
            auth_response(password, &challenge.salt, &challenge.challenge)
        });

        let identify = Outgoing {
            op: OP_IDENTIFY,
            d: Identify {
                rpc_version: RPC_VERSION,
                authentication,
                event_subscriptions: EVENT_SUBSCRIPTIONS,
            },
        };
        stream
            .send(Message::Text(serde_json::to_string(&identify)?.into()))
            .await?;

        let identified: Identified = expect_op(&mut stream, OP_IDENTIFIED).await?;
        tracing::debug!(
            rpc_version = identified.negotiated_rpc_version,
            "identified with OBS"
        );

        Ok(Self { stream })
    }

    /// Delivers recording events to `handler` until OBS closes the connection.
    pub async fn run<H: RecorderEvents>(mut self, handler: &mut H) -> Result<(), ObsError> {
        while let Some(message) = self.stream.next().await {
            let text = match message? {
                Message::Text(text) => text,
                Message::Close(frame) => {
                    tracing::info!(
                        reason = %close_reason(frame.as_ref()),
                        "OBS closed the connection"
                    );
                    return Ok(());
                }
                _ => continue,
            };

            match decode_event(text.as_str()) {
                Ok(Some(ObsEvent::OutputPathChanged(path))) => handler.output_path_changed(path),
                Ok(Some(ObsEvent::OutputStateChanged(change))) => {
                    tracing::debug!(
                        state = %change.output_state,
                        active = change.output_active,
                        "record state changed"
                    );
                    handler.output_state_changed(change).await;
                }
                Ok(None) => {}
                Err(err) => tracing::warn!(error = %err, "skipping malformed message"),
            }
        }
        Ok(())
    }
}

/// Computes the `Identify` authentication string:
/// `base64(sha256(base64(sha256(password + salt)) + challenge))`.
pub fn auth_response(password: &str, salt: &str, challenge: &str) -> String {
    let secret = BASE64.encode(Sha256::digest(format!("{password}{salt}")));
    BASE64.encode(Sha256::digest(format!("{secret}{challenge}")))
}

/// Decodes a text frame into a recording event.
///
/// Returns `Ok(None)` for valid messages that are not recording events.
pub fn decode_event(text: &str) -> Result<Option<ObsEvent>, ObsError> {
    let incoming: Incoming = serde_json::from_str(text)?;
    if incoming.op != OP_EVENT {
        tracing::debug!(op = incoming.op, "ignoring non-event message");
        return Ok(None);
    }

    let event: EventPayload = serde_json::from_value(incoming.d)?;
    match event.event_type.as_str() {
        "RecordStateChanged" => Ok(Some(ObsEvent::OutputStateChanged(
            serde_json::from_value(event.event_data)?,
        ))),
        "RecordFileChanged" => {
            let data: RecordFileChanged = serde_json::from_value(event.event_data)?;
            Ok(Some(ObsEvent::OutputPathChanged(
                data.new_output_path.or(data.output_path),
            )))
        }
        other => {
            tracing::debug!(event_type = other, "ignoring event");
            Ok(None)
        }
    }
}

/// Reads frames until one with opcode `op` arrives and decodes its payload.
async fn expect_op<S, T>(stream: &mut S, op: u8) -> Result<T, ObsError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    T: DeserializeOwned,
{
    while let Some(message) = stream.next().await {
        match message? {
            Message::Text(text) => {
                let incoming: Incoming = serde_json::from_str(text.as_str())?;
                if incoming.op != op {
                    return Err(ObsError::Handshake(format!(
                        "expected op {op}, got op {}",
                        incoming.op
                    )));
                }
                return Ok(serde_json::from_value(incoming.d)?);
            }
            Message::Close(frame) => return Err(handshake_close_error(frame.as_ref())),
            _ => {}
        }
    }
    Err(ObsError::Handshake(
        "connection closed before identification".to_string(),
    ))
}

fn handshake_close_error(frame: Option<&CloseFrame>) -> ObsError {
    let reason = close_reason(frame);
    match frame {
        Some(frame) if u16::from(frame.code) == CLOSE_AUTHENTICATION_FAILED => {
            ObsError::AuthenticationFailed { reason }
        }
        _ => ObsError::Handshake(format!("connection closed: {reason}")),
    }
}

fn close_reason(frame: Option<&CloseFrame>) -> String {
    match frame {
        Some(frame) if !frame.reason.is_empty() => {
            format!("{} ({})", frame.reason.as_str(), u16::from(frame.code))
        }
        Some(frame) => format!("code {}", u16::from(frame.code)),
        None => "no close frame".to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct Incoming {
    op: u8,
    #[serde(default)]
    d: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct Outgoing<T> {
    op: u8,
    d: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Hello {
    #[serde(default)]
    obs_web_socket_version: Option<String>,
    rpc_version: u32,
    #[serde(default)]
    authentication: Option<AuthChallenge>,
}

#[derive(Debug, Deserialize)]
struct AuthChallenge {
    challenge: String,
    salt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Identify {
    rpc_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    authentication: Option<String>,
    event_subscriptions: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Identified {
    negotiated_rpc_version: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventPayload {
    event_type: String,
    #[serde(default)]
    event_data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordFileChanged {
    #[serde(default)]
    new_output_path: Option<String>,
    #[serde(default)]
    output_path: Option<String>,
}
