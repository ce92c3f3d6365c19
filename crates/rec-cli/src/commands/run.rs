//! Run command: move recordings as OBS finishes them.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use rec_core::{ActiveTitleSource, LocalFs, RecorderEvents, SessionController};
use rec_obs::{Endpoint, EventClient, ObsError};

use crate::Config;
use crate::connections::ConnectionHistory;

/// Delay between attempts while waiting for a known endpoint.
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Connects to OBS and handles recording events until Ctrl-C.
///
/// A running focus tracker is stopped on exit; nothing is moved for a
/// recording that is still in progress.
pub async fn run(config: &Config, history_path: &Path) -> Result<()> {
    let endpoint = config.endpoint();
    let mut history = ConnectionHistory::load_from(history_path)?;
    let mut controller = SessionController::new(
        config.mover_settings(),
        ActiveTitleSource::from_command(config.track_command.as_deref()),
        LocalFs,
    );

    tracing::info!(%endpoint, "connecting to OBS");
    let serving = serve(
        &endpoint,
        &config.password,
        &mut history,
        history_path,
        &mut controller,
    );
    let result = tokio::select! {
        result = serving => result,
        signal = tokio::signal::ctrl_c() => {
            tracing::info!("exiting");
            signal.context("failed to listen for Ctrl-C")
        }
    };

    controller.shutdown().await;
    result
}

/// Keeps a connection open, reconnecting whenever OBS goes away.
async fn serve<H: RecorderEvents>(
    endpoint: &Endpoint,
    password: &str,
    history: &mut ConnectionHistory,
    history_path: &Path,
    handler: &mut H,
) -> Result<()> {
    loop {
        let client = connect(endpoint, password, history, history_path).await?;
        tracing::info!("listening for recording events");
        match client.run(handler).await {
            Ok(()) => tracing::info!("OBS connection closed, reconnecting"),
            Err(err) => tracing::warn!(error = %err, "OBS connection lost, reconnecting"),
        }
    }
}

/// Connects to `endpoint`, waiting for it if it has connected before.
///
/// Endpoints without history fail immediately, as does a rejected password.
async fn connect(
    endpoint: &Endpoint,
    password: &str,
    history: &mut ConnectionHistory,
    history_path: &Path,
) -> Result<EventClient> {
    let mut waiting = false;
    loop {
        match EventClient::connect(endpoint, password).await {
            Ok(client) => {
                tracing::info!(%endpoint, "connected to OBS");
                history.record_success(endpoint, Utc::now());
                if let Err(err) = history.save_to(history_path) {
                    tracing::warn!(error = %err, "failed to record successful connection");
                }
                return Ok(client);
            }
            Err(err @ ObsError::AuthenticationFailed { .. }) => {
                return Err(err).context("OBS rejected the configured password");
            }
            Err(err) if history.should_wait_for(endpoint) => {
                if waiting {
                    tracing::debug!(error = %err, "OBS still unavailable");
                } else {
                    tracing::info!(%endpoint, "OBS not running, waiting for it to become available");
                    waiting = true;
                }
                tokio::time::sleep(RETRY_DELAY).await;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to connect to OBS at {endpoint}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    /// An endpoint nothing is listening on.
    async fn closed_endpoint() -> Endpoint {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        Endpoint::new("127.0.0.1", port)
    }

    #[tokio::test]
    async fn unknown_endpoint_fails_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("connections.json");
        let endpoint = closed_endpoint().await;
        let mut history = ConnectionHistory::default();

        let err = connect(&endpoint, "", &mut history, &path).await.unwrap_err();
        assert!(err.to_string().contains("failed to connect to OBS"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn known_endpoint_is_waited_for() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("connections.json");
        let endpoint = closed_endpoint().await;
        let mut history = ConnectionHistory::default();
        history.record_success(&endpoint, DateTime::from_timestamp(1_700_000_000, 0).unwrap());

        let attempt = tokio::time::timeout(
            Duration::from_millis(300),
            connect(&endpoint, "", &mut history, &path),
        )
        .await;
        assert!(attempt.is_err(), "connect should still be retrying");
    }
}
