//! Extraction state reporting and cancellation support.
//!
//! Every extraction walks the same state machine:
//!
//! ```text
//! Idle -> MetadataPending -> Seeking -> FrameReady -> Encoding -> Done
//!   \            \              \            \            \
//!    `------------`--------------`------------`------------`--> Failed
//! ```
//!
//! [`ProgressCallback`] observes each transition as a [`ProgressInfo`]
//! snapshot, and [`CancellationToken`] lets a caller that lost interest stop
//! the pipeline at the next step boundary.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framegrab::{
//!     ExtractOptions, FrameExtractor, FramePosition, FramegrabError, ProgressCallback,
//!     ProgressInfo, VideoSource,
//! };
//!
//! struct PrintState;
//!
//! impl ProgressCallback for PrintState {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("[{:?}] {:?} after {:?}", info.position, info.state, info.elapsed);
//!     }
//! }
//!
//! # async fn example() -> Result<(), FramegrabError> {
//! let options = ExtractOptions::new().with_progress(Arc::new(PrintState));
//! let extractor = FrameExtractor::with_options(options);
//! let frame = extractor
//!     .extract(&VideoSource::open("input.mp4")?, FramePosition::Last)
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

use crate::position::{FramePosition, SeekTarget};

/// Where an extraction currently is in its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionState {
    /// Not started.
    Idle,
    /// Waiting for the container metadata to become available.
    MetadataPending,
    /// Waiting for the decoder to land on the target frame.
    Seeking,
    /// The target frame is decoded and sampled into the surface.
    FrameReady,
    /// Waiting for the still-image encoder.
    Encoding,
    /// Finished successfully.
    Done,
    /// Finished with an error.
    Failed,
}

impl ExtractionState {
    /// Returns `true` for `Done` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, ExtractionState::Done | ExtractionState::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Forward moves go one step at a time; any non-terminal state may fail.
    pub fn can_transition_to(self, next: ExtractionState) -> bool {
        use ExtractionState::*;

        match (self, next) {
            (Idle, MetadataPending)
            | (MetadataPending, Seeking)
            | (Seeking, FrameReady)
            | (FrameReady, Encoding)
            | (Encoding, Done) => true,
            (current, Failed) => !current.is_terminal(),
            _ => false,
        }
    }
}

/// A snapshot taken at every state transition.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// The state just entered.
    pub state: ExtractionState,
    /// Which frame is being extracted.
    pub position: FramePosition,
    /// Wall-clock time since the extraction started.
    pub elapsed: Duration,
    /// Seek target, once it is known.
    pub seek_target: Option<SeekTarget>,
}

/// Trait for observing extraction state transitions.
///
/// Implementations must be [`Send`] and [`Sync`] because the extractor may
/// be driven from any runtime worker.
///
/// Callbacks are **infallible**: they observe but cannot halt the pipeline.
/// Use [`CancellationToken`] for that.
pub trait ProgressCallback: Send + Sync {
    /// Called once per state transition.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all notifications. The default callback.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone it and call [`cancel`](CancellationToken::cancel) from anywhere;
/// the extractor checks it before each pipeline step. A step that is
/// already running is not preempted; its result is discarded.
///
/// # Example
///
/// ```
/// use framegrab::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks one extraction's state and emits callbacks.
pub(crate) struct StateTracker {
    callback: Arc<dyn ProgressCallback>,
    position: FramePosition,
    state: ExtractionState,
    seek_target: Option<SeekTarget>,
    start_time: Instant,
}

impl StateTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, position: FramePosition) -> Self {
        Self {
            callback,
            position,
            state: ExtractionState::Idle,
            seek_target: None,
            start_time: Instant::now(),
        }
    }

    pub(crate) fn state(&self) -> ExtractionState {
        self.state
    }

    pub(crate) fn set_seek_target(&mut self, target: SeekTarget) {
        self.seek_target = Some(target);
    }

    /// Move to `next` and report it.
    pub(crate) fn advance(&mut self, next: ExtractionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {next:?}",
            self.state
        );
        log::debug!(
            "{} frame: {:?} -> {next:?}",
            self.position,
            self.state
        );
        self.state = next;

        let info = ProgressInfo {
            state: next,
            position: self.position,
            elapsed: self.start_time.elapsed(),
            seek_target: self.seek_target,
        };
        self.callback.on_progress(&info);
    }

    /// Move to `Failed` unless already terminal.
    pub(crate) fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.advance(ExtractionState::Failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    const ALL: [ExtractionState; 7] = [
        ExtractionState::Idle,
        ExtractionState::MetadataPending,
        ExtractionState::Seeking,
        ExtractionState::FrameReady,
        ExtractionState::Encoding,
        ExtractionState::Done,
        ExtractionState::Failed,
    ];

    #[test]
    fn forward_path_has_no_shortcuts() {
        assert!(ExtractionState::Idle.can_transition_to(ExtractionState::MetadataPending));
        assert!(!ExtractionState::Idle.can_transition_to(ExtractionState::Seeking));
        assert!(!ExtractionState::MetadataPending.can_transition_to(ExtractionState::FrameReady));
        assert!(!ExtractionState::Seeking.can_transition_to(ExtractionState::Encoding));
        assert!(!ExtractionState::FrameReady.can_transition_to(ExtractionState::Done));
    }

    #[test]
    fn terminal_states_are_final() {
        for next in ALL {
            assert!(!ExtractionState::Done.can_transition_to(next));
            assert!(!ExtractionState::Failed.can_transition_to(next));
        }
    }

    #[test]
    fn every_live_state_can_fail() {
        for state in ALL.into_iter().filter(|state| !state.is_terminal()) {
            assert!(state.can_transition_to(ExtractionState::Failed));
        }
    }

    struct Recorder(Mutex<Vec<ExtractionState>>);

    impl ProgressCallback for Recorder {
        fn on_progress(&self, info: &ProgressInfo) {
            self.0.lock().unwrap().push(info.state);
        }
    }

    #[test]
    fn tracker_reports_each_transition_once() {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let mut tracker = StateTracker::new(recorder.clone(), FramePosition::First);
        tracker.advance(ExtractionState::MetadataPending);
        tracker.fail();
        tracker.fail();

        assert_eq!(tracker.state(), ExtractionState::Failed);
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![ExtractionState::MetadataPending, ExtractionState::Failed]
        );
    }

    #[test]
    fn cancellation_token_clone_shares_state() {
        let token = CancellationToken::default();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
