//! The background focus tracking task.
//!
//! One [`FocusTracker`] runs per recording session. It owns its
//! [`FocusAccumulator`] for its whole lifetime and hands it back only once the
//! task has observed cancellation and flushed the tail interval, so the
//! accumulator can never be read half-updated.

use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::focus::{FocusAccumulator, FocusSampler};
use crate::title::{DESKTOP_TITLE, TitleError, TitleSource};

/// Called after every sample with the sampled title and the running totals.
pub type SampleObserver = Box<dyn FnMut(&str, &FocusAccumulator) + Send>;

/// Errors stopping the tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The tracking task panicked or was aborted.
    #[error("focus tracker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Handle to a running focus tracking task.
///
/// Dropping the handle cancels the task without waiting for it.
#[derive(Debug)]
pub struct FocusTracker {
    cancel: CancellationToken,
    handle: JoinHandle<FocusAccumulator>,
}

impl FocusTracker {
    /// Starts polling `source` every `interval`.
    pub fn spawn<S: TitleSource>(source: S, interval: Duration) -> Self {
        Self::spawn_observed(source, interval, None)
    }

    /// Like [`FocusTracker::spawn`], reporting every sample to `observer`.
    pub fn spawn_observed<S: TitleSource>(
        source: S,
        interval: Duration,
        observer: Option<SampleObserver>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(track(source, interval, cancel.clone(), observer));
        tracing::info!(interval_secs = interval.as_secs_f64(), "window tracking started");
        Self { cancel, handle }
    }

    /// Cancels the task and waits for its final flush.
    ///
    /// Returns everything accumulated during the task's lifetime.
    pub async fn stop(mut self) -> Result<FocusAccumulator, TrackerError> {
        self.cancel.cancel();
        let focus = (&mut self.handle).await?;
        Ok(focus)
    }
}

impl Drop for FocusTracker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn track<S: TitleSource>(
    mut source: S,
    interval: Duration,
    cancel: CancellationToken,
    mut observer: Option<SampleObserver>,
) -> FocusAccumulator {
    let mut focus = FocusAccumulator::new();
    let mut sampler = FocusSampler::new();
    let mut failures = FailureLog::default();

    loop {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = source.active_title() => result,
        };

        let title = resolve_title(result, &mut failures);
        sampler.record(&title, Instant::now(), &mut focus);
        if let Some(observer) = observer.as_mut() {
            observer(&title, &focus);
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }

    sampler.flush(Instant::now(), &mut focus);
    tracing::info!(titles = focus.len(), "window tracking stopped");
    focus
}

/// Remembers the last title query failure so a repeated failure is logged
/// only once.
#[derive(Debug, Default)]
struct FailureLog {
    last: Option<String>,
}

impl FailureLog {
    /// Records a failure message and returns whether it should be logged,
    /// i.e. whether it differs from the previous failure.
    fn record(&mut self, message: &str) -> bool {
        if self.last.as_deref() == Some(message) {
            return false;
        }
        self.last = Some(message.to_string());
        true
    }
}

/// Maps a query result to the title to record.
///
/// Failures and blank titles fall back to [`DESKTOP_TITLE`].
fn resolve_title(result: Result<String, TitleError>, failures: &mut FailureLog) -> String {
    match result {
        Ok(title) if !title.trim().is_empty() => title,
        Ok(_) => DESKTOP_TITLE.to_string(),
        Err(err) => {
            let message = err.to_string();
            if failures.record(&message) {
                tracing::warn!(error = %message, "unable to get window title");
            }
            DESKTOP_TITLE.to_string()
        }
    }
}
