//! Output paths reported by the recorder.

/// Two-generation registry of recording paths.
///
/// `current` collects the paths reported during the running session. The
/// previous session's paths are kept for one more session so that a recorder
/// re-reporting an already moved file does not queue it again.
#[derive(Debug, Clone, Default)]
pub struct OutputPathQueue {
    current: Vec<String>,
    previous: Vec<String>,
}

impl OutputPathQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `path` unless it is empty or already known.
    ///
    /// Returns `true` if the path was added.
    pub fn add(&mut self, path: &str) -> bool {
        if path.is_empty()
            || self.current.iter().any(|p| p == path)
            || self.previous.iter().any(|p| p == path)
        {
            return false;
        }
        self.current.push(path.to_string());
        tracing::info!(path, "recording file path added");
        true
    }

    /// Paths queued for the running session, in report order.
    pub fn current(&self) -> &[String] {
        &self.current
    }

    pub fn previous(&self) -> &[String] {
        &self.previous
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Ends a generation: `current` replaces `previous` and starts empty.
    pub fn rotate(&mut self) {
        self.previous = std::mem::take(&mut self.current);
    }
}
