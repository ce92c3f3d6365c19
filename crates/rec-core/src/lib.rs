//! Core logic for the recording mover.
//!
//! This crate contains the pieces that decide where a finished recording goes:
//! - Sanitizing: reducing a window title to a folder name
//! - Path resolution: translating recorder paths and computing destinations
//! - Focus tracking: attributing wall-clock time to window titles
//! - Session control: reacting to recorder start/stop events

pub mod controller;
pub mod event;
mod focus;
pub mod fs;
pub mod paths;
mod queue;
pub mod sanitize;
pub mod title;
pub mod tracker;

pub use controller::{MoveOutcome, MoverSettings, SessionController, SessionSummary, UNKNOWN_TITLE};
pub use event::{OutputState, RecorderEvents, StateChange, UnknownOutputState};
pub use focus::{FocusAccumulator, FocusSampler};
pub use fs::{FileSystem, LocalFs, MoveError};
pub use paths::{PathTranslationTable, TableError, TranslationRule};
pub use queue::OutputPathQueue;
pub use sanitize::{ShorthandTable, sanitize};
pub use title::{
    ActiveTitleSource, CommandTitleSource, DESKTOP_TITLE, OsTitleSource, TitleError, TitleSource,
};
pub use tracker::{FocusTracker, SampleObserver, TrackerError};
