//! Recording session lifecycle.
//!
//! [`SessionController`] is an edge-triggered state machine driven by recorder
//! events:
//!
//! - `Idle -> Recording` when the recorder reports an active output: the focus
//!   totals are cleared and a fresh [`FocusTracker`] is started.
//! - `Recording -> Idle` when the output becomes inactive: the tracker is
//!   stopped and joined, the dominant window is picked, and every queued
//!   recording is moved into a folder named after it.
//! - An inactive report while already `Idle` (connected mid-recording) moves
//!   whatever is queued into the `Unknown` folder.
//!
//! Repeated reports of the same level and pause/resume reports are ignored.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::event::{RecorderEvents, StateChange};
use crate::focus::FocusAccumulator;
use crate::fs::{FileSystem, MoveError};
use crate::paths::{PathTranslationTable, destination_dir};
use crate::queue::OutputPathQueue;
use crate::sanitize::{ShorthandTable, sanitize};
use crate::title::TitleSource;
use crate::tracker::FocusTracker;

/// Title used when no window activity was tracked during a session.
pub const UNKNOWN_TITLE: &str = "Unknown";

/// How finished recordings are relocated.
#[derive(Debug, Clone)]
pub struct MoverSettings {
    /// Destination base, relative to each recording's folder.
    pub dest_base: PathBuf,
    /// How often the focused window is sampled.
    pub track_interval: Duration,
    pub translate: PathTranslationTable,
    pub shorthand: ShorthandTable,
}

impl Default for MoverSettings {
    fn default() -> Self {
        Self {
            dest_base: PathBuf::from(".."),
            track_interval: Duration::from_secs(1),
            translate: PathTranslationTable::default(),
            shorthand: ShorthandTable::default(),
        }
    }
}

/// Result of relocating one recording.
#[derive(Debug)]
pub struct MoveOutcome {
    /// The path as reported by the recorder.
    pub source: String,
    /// Where the file ended up.
    pub result: Result<PathBuf, MoveError>,
}

/// What happened when a session with queued recordings ended.
#[derive(Debug)]
pub struct SessionSummary {
    /// Raw title of the dominant window, or [`UNKNOWN_TITLE`].
    pub dominant_title: String,
    /// The sanitized folder name.
    pub folder: String,
    pub moves: Vec<MoveOutcome>,
}

#[derive(Debug)]
enum SessionState {
    Idle,
    Recording(FocusTracker),
}

/// Owns all per-session state and reacts to recorder events.
#[derive(Debug)]
pub struct SessionController<S, F> {
    settings: MoverSettings,
    title_source: S,
    fs: F,
    state: SessionState,
    last_output_active: Option<bool>,
    focus: FocusAccumulator,
    queue: OutputPathQueue,
}

impl<S, F> SessionController<S, F>
where
    S: TitleSource + Clone,
    F: FileSystem + Clone + Send + 'static,
{
    pub fn new(settings: MoverSettings, title_source: S, fs: F) -> Self {
        Self {
            settings,
            title_source,
            fs,
            state: SessionState::Idle,
            last_output_active: None,
            focus: FocusAccumulator::new(),
            queue: OutputPathQueue::new(),
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, SessionState::Recording(_))
    }

    /// Recordings queued for the running session.
    pub fn queued_paths(&self) -> &[String] {
        self.queue.current()
    }

    /// Focus totals of the last completed session.
    ///
    /// Empty while a session is running.
    pub const fn focus(&self) -> &FocusAccumulator {
        &self.focus
    }

    /// Queues a recording path reported by the recorder, in any state.
    pub fn handle_path_reported(&mut self, path: Option<&str>) {
        if let Some(path) = path {
            self.queue.add(path);
        }
    }

    /// Applies a recorder state change.
    ///
    /// Returns a summary when this change completed a session that had
    /// recordings queued.
    pub async fn handle_state_changed(&mut self, change: StateChange) -> Option<SessionSummary> {
        self.handle_path_reported(change.output_path.as_deref());

        if change.output_state.is_pause_marker()
            || self.last_output_active == Some(change.output_active)
        {
            tracing::debug!(
                state = %change.output_state,
                active = change.output_active,
                "ignoring output state report"
            );
            return None;
        }
        self.last_output_active = Some(change.output_active);

        if change.output_active {
            self.start_session();
            None
        } else {
            self.finish_session().await
        }
    }

    /// Stops a running tracker without moving anything.
    pub async fn shutdown(&mut self) {
        if let SessionState::Recording(tracker) =
            std::mem::replace(&mut self.state, SessionState::Idle)
        {
            if let Err(err) = tracker.stop().await {
                tracing::error!(error = %err, "focus tracker failed during shutdown");
            }
        }
    }

    fn start_session(&mut self) {
        if self.is_recording() {
            tracing::warn!("recording start reported while already recording");
            return;
        }

        tracing::info!("recording started");
        self.focus.clear();
        let tracker = FocusTracker::spawn(self.title_source.clone(), self.settings.track_interval);
        self.state = SessionState::Recording(tracker);
    }

    async fn finish_session(&mut self) -> Option<SessionSummary> {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Recording(tracker) => {
                tracing::info!("recording stopped");
                // The accumulator is only complete once the tracker has flushed.
                self.focus = match tracker.stop().await {
                    Ok(focus) => focus,
                    Err(err) => {
                        tracing::error!(error = %err, "focus tracker failed");
                        FocusAccumulator::new()
                    }
                };
            }
            SessionState::Idle => {
                // Connected while the recorder was already recording.
                tracing::info!("recording stopped before tracking started");
                self.focus.clear();
            }
        }

        if self.queue.is_empty() {
            tracing::warn!("no output path recorded by the recorder");
            return None;
        }

        let dominant_title = if let Some(title) = self.focus.dominant() {
            tracing::info!(title, "dominant window");
            title.to_string()
        } else {
            tracing::warn!("no window activity tracked");
            UNKNOWN_TITLE.to_string()
        };
        let folder = sanitize(&dominant_title, &self.settings.shorthand);
        tracing::info!(%folder, "sanitized window title");

        let moves = self.relocate_queued(&folder).await;
        self.queue.rotate();

        Some(SessionSummary {
            dominant_title,
            folder,
            moves,
        })
    }

    /// Moves every queued recording into `folder`, off the async workers.
    async fn relocate_queued(&self, folder: &str) -> Vec<MoveOutcome> {
        let fs = self.fs.clone();
        let settings = self.settings.clone();
        let sources = self.queue.current().to_vec();
        let folder = folder.to_string();

        let moving = tokio::task::spawn_blocking(move || {
            sources
                .into_iter()
                .map(|source| {
                    let result = relocate(&fs, &settings, &source, &folder);
                    match &result {
                        Ok(dest) => tracing::info!(to = %dest.display(), "recording moved"),
                        Err(err) => tracing::error!(error = %err, "failed to move recording"),
                    }
                    MoveOutcome { source, result }
                })
                .collect()
        });

        match moving.await {
            Ok(moves) => moves,
            Err(err) => {
                tracing::error!(error = %err, "recording move task failed");
                Vec::new()
            }
        }
    }
}

/// Translates, checks and moves one recording into `folder`.
fn relocate<F: FileSystem>(
    fs: &F,
    settings: &MoverSettings,
    source: &str,
    folder: &str,
) -> Result<PathBuf, MoveError> {
    let path = settings.translate.translate(Path::new(source));
    if !fs.exists(&path) {
        return Err(MoveError::NotFound { path });
    }
    let Some(file_name) = path.file_name() else {
        return Err(MoveError::NotFound { path });
    };

    let target_dir = destination_dir(&path, &settings.dest_base, folder).map_err(|source| {
        MoveError::CreateDir {
            path: settings.dest_base.join(folder),
            source,
        }
    })?;
    fs.create_dir_all(&target_dir).map_err(|source| MoveError::CreateDir {
        path: target_dir.clone(),
        source,
    })?;

    let dest = target_dir.join(file_name);
    fs.move_file(&path, &dest).map_err(|source| MoveError::Move {
        from: path.clone(),
        to: dest.clone(),
        source,
    })?;
    Ok(dest)
}

impl<S, F> RecorderEvents for SessionController<S, F>
where
    S: TitleSource + Clone,
    F: FileSystem + Clone + Send + 'static,
{
    fn output_path_changed(&mut self, path: Option<String>) {
        self.handle_path_reported(path.as_deref());
    }

    async fn output_state_changed(&mut self, change: StateChange) {
        self.handle_state_changed(change).await;
    }
}

#[cfg(test)]
mod tests {
    use std::future::{Future, ready};
    use std::sync::{Arc, Mutex};
    use std::thread::ThreadId;

    use super::*;
    use crate::event::OutputState;
    use crate::fs::LocalFs;
    use crate::paths::TranslationRule;
    use crate::title::TitleError;

    #[derive(Debug, Clone)]
    struct FixedTitle(&'static str);

    impl TitleSource for FixedTitle {
        fn active_title(&mut self) -> impl Future<Output = Result<String, TitleError>> + Send {
            ready(Ok(self.0.to_string()))
        }
    }

    /// Local filesystem that remembers which thread performed the move.
    #[derive(Debug, Clone, Default)]
    struct ThreadRecordingFs {
        move_thread: Arc<Mutex<Option<ThreadId>>>,
    }

    impl FileSystem for ThreadRecordingFs {
        fn exists(&self, path: &Path) -> bool {
            LocalFs.exists(path)
        }

        fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
            LocalFs.create_dir_all(path)
        }

        fn move_file(&self, from: &Path, to: &Path) -> std::io::Result<()> {
            *self.move_thread.lock().unwrap() = Some(std::thread::current().id());
            LocalFs.move_file(from, to)
        }
    }

    fn controller(title: &'static str) -> SessionController<FixedTitle, LocalFs> {
        SessionController::new(MoverSettings::default(), FixedTitle(title), LocalFs)
    }

    fn started() -> StateChange {
        StateChange::new(true, OutputState::Started)
    }

    fn stopped() -> StateChange {
        StateChange::new(false, OutputState::Stopped)
    }

    /// Creates `<root>/raw/<name>` and returns its path as a string.
    fn recording(root: &Path, name: &str) -> String {
        let raw = root.join("raw");
        std::fs::create_dir_all(&raw).unwrap();
        let path = raw.join(name);
        std::fs::write(&path, b"frames").unwrap();
        path.to_string_lossy().into_owned()
    }

    async fn record_for<F>(controller: &mut SessionController<FixedTitle, F>, secs: u64)
    where
        F: FileSystem + Clone + Send + 'static,
    {
        assert!(controller.handle_state_changed(started()).await.is_none());
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn finished_session_moves_recording_into_dominant_window_folder() {
        let temp = tempfile::tempdir().unwrap();
        let clip = recording(temp.path(), "clip.mkv");
        let mut controller = controller("Elden Ring - DX12");

        record_for(&mut controller, 3).await;
        let summary = controller
            .handle_state_changed(stopped().with_path(clip.clone()))
            .await
            .expect("session should complete");

        assert_eq!(summary.dominant_title, "Elden Ring - DX12");
        assert_eq!(summary.folder, "Elden-Ring");
        assert_eq!(summary.moves.len(), 1);
        let dest = summary.moves[0].result.as_ref().unwrap();
        assert_eq!(*dest, temp.path().join("Elden-Ring").join("clip.mkv"));
        assert!(dest.exists());
        assert!(!Path::new(&clip).exists());
        assert!(!controller.is_recording());
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_start_does_not_restart_tracking() {
        let mut controller = controller("Game");

        record_for(&mut controller, 2).await;
        assert!(controller.handle_state_changed(started()).await.is_none());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(controller.is_recording());

        controller.handle_path_reported(Some("/nowhere/clip.mkv"));
        controller.handle_state_changed(stopped()).await.unwrap();

        let total = controller.focus().total();
        assert!(total >= Duration::from_millis(3990), "got {total:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_resume_never_end_the_session() {
        let mut controller = controller("Game");
        record_for(&mut controller, 1).await;

        let paused = StateChange::new(false, OutputState::Paused);
        assert!(controller.handle_state_changed(paused).await.is_none());
        assert!(controller.is_recording());

        let resumed = StateChange::new(true, OutputState::Resumed);
        assert!(controller.handle_state_changed(resumed).await.is_none());
        assert!(controller.is_recording());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_moves_do_not_stop_the_rest() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("raw").join("gone.mkv");
        let clip = recording(temp.path(), "clip.mkv");
        let mut controller = controller("Game");

        controller.handle_path_reported(Some(&missing.to_string_lossy()));
        controller.handle_path_reported(Some(&clip));
        record_for(&mut controller, 1).await;
        let summary = controller.handle_state_changed(stopped()).await.unwrap();

        assert_eq!(summary.moves.len(), 2);
        assert!(matches!(
            summary.moves[0].result,
            Err(MoveError::NotFound { .. })
        ));
        assert!(summary.moves[1].result.is_ok());
        assert!(controller.queued_paths().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn session_without_focus_samples_uses_unknown_folder() {
        let temp = tempfile::tempdir().unwrap();
        let clip = recording(temp.path(), "clip.mkv");
        let mut controller = controller("Game");

        controller.handle_state_changed(started()).await;
        // Stopping before the tracker ever ran leaves no samples.
        let summary = controller
            .handle_state_changed(stopped().with_path(clip))
            .await
            .unwrap();

        assert_eq!(summary.dominant_title, UNKNOWN_TITLE);
        assert_eq!(
            *summary.moves[0].result.as_ref().unwrap(),
            temp.path().join("Unknown").join("clip.mkv")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn session_without_paths_moves_nothing() {
        let mut controller = controller("Game");
        record_for(&mut controller, 1).await;

        assert!(controller.handle_state_changed(stopped()).await.is_none());
        assert!(!controller.is_recording());
        assert_eq!(controller.focus().dominant(), Some("Game"));
    }

    #[tokio::test(start_paused = true)]
    async fn moved_path_is_not_requeued_next_session() {
        let temp = tempfile::tempdir().unwrap();
        let clip = recording(temp.path(), "clip.mkv");
        let mut controller = controller("Game");

        record_for(&mut controller, 1).await;
        controller
            .handle_state_changed(stopped().with_path(clip.clone()))
            .await
            .unwrap();

        controller.handle_path_reported(Some(&clip));
        assert!(controller.queued_paths().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_any_start_files_queued_paths_under_unknown() {
        let temp = tempfile::tempdir().unwrap();
        let old = recording(temp.path(), "old.mkv");
        let new = recording(temp.path(), "new.mkv");
        let mut controller = controller("Game");

        let summary = controller
            .handle_state_changed(stopped().with_path(old.clone()))
            .await
            .expect("queued path should be moved");
        assert_eq!(summary.dominant_title, UNKNOWN_TITLE);
        assert_eq!(
            *summary.moves[0].result.as_ref().unwrap(),
            temp.path().join("Unknown").join("old.mkv")
        );
        assert!(controller.queued_paths().is_empty());

        record_for(&mut controller, 2).await;
        let summary = controller
            .handle_state_changed(stopped().with_path(new))
            .await
            .unwrap();
        assert_eq!(summary.folder, "Game");
        assert_eq!(summary.moves.len(), 1);
        assert_eq!(
            *summary.moves[0].result.as_ref().unwrap(),
            temp.path().join("Game").join("new.mkv")
        );
        assert!(temp.path().join("Unknown").join("old.mkv").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_any_start_without_paths_does_nothing() {
        let mut controller = controller("Game");

        assert!(controller.handle_state_changed(stopped()).await.is_none());
        assert!(!controller.is_recording());
        assert!(controller.focus().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn moves_run_off_the_event_thread() {
        let temp = tempfile::tempdir().unwrap();
        let clip = recording(temp.path(), "clip.mkv");
        let fs = ThreadRecordingFs::default();
        let mut controller =
            SessionController::new(MoverSettings::default(), FixedTitle("Game"), fs.clone());

        record_for(&mut controller, 1).await;
        let summary = controller
            .handle_state_changed(stopped().with_path(clip))
            .await
            .unwrap();

        assert!(summary.moves[0].result.is_ok());
        let move_thread = *fs.move_thread.lock().unwrap();
        let move_thread = move_thread.expect("move_file was called");
        assert_ne!(move_thread, std::thread::current().id());
    }

    #[tokio::test(start_paused = true)]
    async fn translated_path_is_moved() {
        let temp = tempfile::tempdir().unwrap();
        recording(temp.path(), "clip.mkv");
        let settings = MoverSettings {
            dest_base: PathBuf::from("sorted"),
            translate: PathTranslationTable::new(vec![TranslationRule::new(
                "/recorder/videos",
                temp.path().join("raw").to_string_lossy(),
            )]),
            ..MoverSettings::default()
        };
        let mut controller = SessionController::new(settings, FixedTitle("Game"), LocalFs);

        record_for(&mut controller, 1).await;
        let summary = controller
            .handle_state_changed(stopped().with_path("/recorder/videos/clip.mkv"))
            .await
            .unwrap();

        assert_eq!(
            *summary.moves[0].result.as_ref().unwrap(),
            temp.path().join("raw").join("sorted").join("Game").join("clip.mkv")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_tracking_without_moving() {
        let temp = tempfile::tempdir().unwrap();
        let clip = recording(temp.path(), "clip.mkv");
        let mut controller = controller("Game");

        controller.handle_path_reported(Some(&clip));
        record_for(&mut controller, 1).await;
        controller.shutdown().await;

        assert!(!controller.is_recording());
        assert!(Path::new(&clip).exists());
    }
}
