//! Check command: track the active window without OBS.
//!
//! Useful for tuning `--track-command`, `--shorthand` and the title
//! sanitizer before recording anything.

use std::collections::HashMap;
use std::io::{self, Write};

use anyhow::{Context, Result};
use rec_core::{
    ActiveTitleSource, FocusAccumulator, FocusTracker, SampleObserver, ShorthandTable, sanitize,
};

use crate::Config;

/// Seconds a title must be active before it is first reported.
const FIRST_REPORT_SECS: f64 = 1.0;

/// Seconds between repeated reports of the same title.
const REPORT_STEP_SECS: f64 = 5.0;

/// Decides when a sampled title is worth printing.
#[derive(Debug)]
pub struct CheckReporter {
    shorthand: ShorthandTable,
    next_report: HashMap<String, f64>,
}

impl CheckReporter {
    pub fn new(shorthand: ShorthandTable) -> Self {
        Self {
            shorthand,
            next_report: HashMap::new(),
        }
    }

    /// Prints `title` once its accumulated time passes its next threshold.
    ///
    /// Returns whether anything was written.
    pub fn observe<W: Write>(
        &mut self,
        writer: &mut W,
        title: &str,
        focus: &FocusAccumulator,
    ) -> io::Result<bool> {
        if title.trim().is_empty() {
            return Ok(false);
        }
        let Some(active) = focus.get(title) else {
            return Ok(false);
        };

        let secs = active.as_secs_f64();
        let threshold = self
            .next_report
            .entry(title.to_string())
            .or_insert(FIRST_REPORT_SECS);
        if secs <= *threshold {
            return Ok(false);
        }
        *threshold += REPORT_STEP_SECS;

        writeln!(writer, "Raw title: {}", title.trim())?;
        writeln!(writer, "Sanitized title: {}", sanitize(title, &self.shorthand))?;
        writeln!(writer, "Active for secs: {secs:.2}")?;
        writeln!(writer)?;
        Ok(true)
    }
}

/// Runs the tracker until Ctrl-C, printing titles as they accumulate time.
pub async fn run(config: &Config) -> Result<()> {
    tracing::info!(
        step_secs = REPORT_STEP_SECS,
        "running in track-only mode, press Ctrl-C to stop"
    );

    let source = ActiveTitleSource::from_command(config.track_command.as_deref());
    let mut reporter = CheckReporter::new(config.shorthand.clone());
    let observer: SampleObserver = Box::new(move |title, focus| {
        let mut stdout = io::stdout().lock();
        if let Err(err) = reporter.observe(&mut stdout, title, focus) {
            tracing::warn!(error = %err, "failed to print title report");
        }
    });
    let tracker =
        FocusTracker::spawn_observed(source, config.track_interval_duration(), Some(observer));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    let focus = tracker.stop().await?;
    if let Some(title) = focus.dominant() {
        tracing::info!(title, folder = %sanitize(title, &config.shorthand), "dominant window");
    }
    Ok(())
}
