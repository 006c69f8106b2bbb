//! Media element abstraction
//!
//! The playback core never touches a real `<video>` element. Presenters drive
//! a `MediaElement` implementation instead: a browser binding in production,
//! `SimulatedMedia` in the driver binary and tests.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::trace;

/// Why a media element failed or refused to play
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    /// Play request aborted because the element or its source was removed
    #[error("play request aborted: {0}")]
    Aborted(String),

    /// Play request interrupted by a pause or a new load
    #[error("play request interrupted")]
    Interrupted,

    /// Autoplay policy refused playback
    #[error("playback not allowed: {0}")]
    NotAllowed(String),

    /// Media could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Media could not be fetched
    #[error("network error: {0}")]
    Network(String),

    /// Container or codec not supported
    #[error("unsupported source: {0}")]
    Unsupported(String),
}

impl MediaError {
    /// Expected outcome of tearing down an element mid-play, not a failure
    pub fn is_benign_cancellation(&self) -> bool {
        matches!(self, MediaError::Aborted(_) | MediaError::Interrupted)
    }

    /// Whether the element itself is broken (vs. a refused play request)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MediaError::Decode(_) | MediaError::Network(_) | MediaError::Unsupported(_)
        )
    }
}

/// Lifecycle events a media element reports back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    LoadStart,
    LoadedData,
    Error(MediaError),
}

/// Imperative control surface of one media element
pub trait MediaElement: Send + Sync {
    fn attach_source(&self, url: &str);
    fn detach_source(&self);
    /// (Re)load the current source, or the empty source when detached
    fn load(&self);
    /// Start playback; the error is the rejection of the play request
    fn play(&self) -> Result<(), MediaError>;
    fn pause(&self);
    fn set_muted(&self, muted: bool);
    fn set_volume(&self, volume: f32);
    fn seek_to_start(&self);
}

/// Observable state of a `SimulatedMedia`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulatedMediaState {
    pub source: Option<String>,
    pub playing: bool,
    pub muted: bool,
    pub volume: f32,
    pub position_reset_count: u32,
    pub load_count: u32,
}

#[derive(Debug, Default)]
struct SimulatedInner {
    state: SimulatedMediaState,
    pending_events: VecDeque<MediaEvent>,
    /// Next play() calls fail with this error
    play_failure: Option<MediaError>,
    /// Next load fails with this error instead of producing LoadedData
    load_failure: Option<MediaError>,
}

/// In-memory media element
///
/// Loading a source queues `LoadStart` and `LoadedData` (or the configured
/// failure); the owner drains them with `take_events` and feeds them to the
/// presenter, the way a browser fires DOM media events.
#[derive(Debug)]
pub struct SimulatedMedia {
    label: String,
    inner: Mutex<SimulatedInner>,
}

impl SimulatedMedia {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            inner: Mutex::new(SimulatedInner {
                state: SimulatedMediaState {
                    muted: true,
                    volume: 1.0,
                    ..Default::default()
                },
                ..Default::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SimulatedMediaState {
        self.lock().state.clone()
    }

    /// Drain DOM-style events produced since the last call
    pub fn take_events(&self) -> Vec<MediaEvent> {
        self.lock().pending_events.drain(..).collect()
    }

    /// Make the next play() calls reject with `error` (None clears)
    pub fn fail_play_with(&self, error: Option<MediaError>) {
        self.lock().play_failure = error;
    }

    /// Make the next load report `error` instead of LoadedData
    pub fn fail_load_with(&self, error: MediaError) {
        self.lock().load_failure = Some(error);
    }

    /// Report an error right now, as a stalled network would
    pub fn raise_error(&self, error: MediaError) {
        let mut inner = self.lock();
        inner.state.playing = false;
        inner.pending_events.push_back(MediaEvent::Error(error));
    }
}

impl MediaElement for SimulatedMedia {
    fn attach_source(&self, url: &str) {
        trace!("[{}] attach {}", self.label, url);
        self.lock().state.source = Some(url.to_string());
    }

    fn detach_source(&self) {
        trace!("[{}] detach", self.label);
        let mut inner = self.lock();
        inner.state.source = None;
        inner.state.playing = false;
    }

    fn load(&self) {
        let mut inner = self.lock();
        inner.state.load_count += 1;
        inner.pending_events.clear();
        if inner.state.source.is_none() {
            inner.state.playing = false;
            return;
        }
        inner.pending_events.push_back(MediaEvent::LoadStart);
        let outcome = match inner.load_failure.take() {
            Some(error) => MediaEvent::Error(error),
            None => MediaEvent::LoadedData,
        };
        inner.pending_events.push_back(outcome);
    }

    fn play(&self) -> Result<(), MediaError> {
        let mut inner = self.lock();
        if let Some(error) = inner.play_failure.clone() {
            return Err(error);
        }
        if inner.state.source.is_none() {
            return Err(MediaError::Aborted("no source attached".to_string()));
        }
        inner.state.playing = true;
        Ok(())
    }

    fn pause(&self) {
        self.lock().state.playing = false;
    }

    fn set_muted(&self, muted: bool) {
        self.lock().state.muted = muted;
    }

    fn set_volume(&self, volume: f32) {
        self.lock().state.volume = volume.clamp(0.0, 1.0);
    }

    fn seek_to_start(&self) {
        self.lock().state.position_reset_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benign_classification() {
        assert!(MediaError::Aborted("removed".into()).is_benign_cancellation());
        assert!(MediaError::Interrupted.is_benign_cancellation());
        assert!(!MediaError::NotAllowed("gesture".into()).is_benign_cancellation());
        assert!(!MediaError::Decode("bad".into()).is_benign_cancellation());
        assert!(MediaError::Network("503".into()).is_fatal());
        assert!(!MediaError::Interrupted.is_fatal());
    }

    #[test]
    fn test_simulated_load_produces_events() {
        let media = SimulatedMedia::new("v1");
        media.attach_source("a.mp4");
        media.load();
        assert_eq!(
            media.take_events(),
            vec![MediaEvent::LoadStart, MediaEvent::LoadedData]
        );
        assert!(media.take_events().is_empty());
    }

    #[test]
    fn test_simulated_load_of_empty_source_is_silent() {
        let media = SimulatedMedia::new("v1");
        media.load();
        assert!(media.take_events().is_empty());
        assert_eq!(media.snapshot().load_count, 1);
    }

    #[test]
    fn test_play_without_source_aborts() {
        let media = SimulatedMedia::new("v1");
        assert!(matches!(media.play(), Err(MediaError::Aborted(_))));
    }
}
