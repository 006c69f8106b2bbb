//! Video resource loader
//!
//! Tracks per-video admission (idle → loading → loaded) under a global
//! concurrency ceiling. Visibility says *whether* a video is wanted; the
//! loader decides whether it may consume bandwidth and decoder resources now.
//!
//! - Requests over the ceiling are dropped, not queued. Callers retry on the
//!   next visibility or eviction event.
//! - `loading → loaded` happens after a fixed settle delay run as a tokio
//!   task. Eviction aborts that task, and every task carries a generation
//!   number so a completion that raced the eviction is ignored.
//! - Loads never fail here; media errors belong to the presenter.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use showreel_common::config::PlaybackTuning;
use showreel_common::{ShowreelEvent, VideoId};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::device::DeviceProfile;

/// Admission state of one video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
}

/// Render-ready flags for one video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VideoLoadStatus {
    pub is_loading: bool,
    pub is_loaded: bool,
    /// Already admitted, or a slot is free
    pub can_load: bool,
}

/// Outcome of `request_load`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Took a free slot and started settling
    Admitted,
    /// Already loading or loaded; nothing changed
    AlreadyActive,
    /// Ceiling reached; request dropped
    Rejected { active: usize, ceiling: usize },
}

impl Admission {
    /// True when the video holds a slot after the call
    pub fn holds_slot(self) -> bool {
        !matches!(self, Admission::Rejected { .. })
    }
}

struct Slot {
    state: LoadState,
    generation: u64,
    settle: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct LoaderInner {
    slots: HashMap<VideoId, Slot>,
    next_generation: u64,
}

/// Shared handle to the loader; clones see the same slots
#[derive(Clone)]
pub struct ResourceLoader {
    inner: Arc<Mutex<LoaderInner>>,
    ceiling: usize,
    settle_delay: Duration,
    event_tx: broadcast::Sender<ShowreelEvent>,
}

impl ResourceLoader {
    /// Create a loader; a zero ceiling is raised to 1
    pub fn new(
        ceiling: usize,
        settle_delay: Duration,
        event_tx: broadcast::Sender<ShowreelEvent>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LoaderInner::default())),
            ceiling: ceiling.max(1),
            settle_delay,
            event_tx,
        }
    }

    pub fn for_profile(
        profile: &DeviceProfile,
        tuning: &PlaybackTuning,
        event_tx: broadcast::Sender<ShowreelEvent>,
    ) -> Self {
        Self::new(profile.ceiling, tuning.settle_delay(), event_tx)
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    fn lock(&self) -> MutexGuard<'_, LoaderInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ShowreelEvent) {
        // No receivers is fine
        let _ = self.event_tx.send(event);
    }

    /// Ask for a concurrency slot for `video_id`
    pub fn request_load(&self, video_id: &str) -> Admission {
        let mut inner = self.lock();

        if inner.slots.contains_key(video_id) {
            return Admission::AlreadyActive;
        }

        let active = inner.slots.len();
        if active >= self.ceiling {
            drop(inner);
            debug!(
                "Load of {} rejected: {}/{} slots in use",
                video_id, active, self.ceiling
            );
            self.emit(ShowreelEvent::LoadRejected {
                video_id: video_id.to_string(),
                active,
                ceiling: self.ceiling,
                timestamp: chrono::Utc::now(),
            });
            return Admission::Rejected {
                active,
                ceiling: self.ceiling,
            };
        }

        inner.next_generation += 1;
        let generation = inner.next_generation;

        let settle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let loader = self.clone();
                let id = video_id.to_string();
                let delay = self.settle_delay;
                Some(handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    loader.settle(&id, generation);
                }))
            }
            Err(_) => None,
        };

        // Outside a runtime there is no timer to wait on
        let state = if settle.is_some() {
            LoadState::Loading
        } else {
            LoadState::Loaded
        };

        inner.slots.insert(
            video_id.to_string(),
            Slot {
                state,
                generation,
                settle,
            },
        );
        let active = inner.slots.len();
        drop(inner);

        debug!("Load of {} admitted ({}/{})", video_id, active, self.ceiling);
        self.emit(ShowreelEvent::LoadAdmitted {
            video_id: video_id.to_string(),
            active,
            ceiling: self.ceiling,
            timestamp: chrono::Utc::now(),
        });
        if state == LoadState::Loaded {
            self.emit(ShowreelEvent::LoadSettled {
                video_id: video_id.to_string(),
                timestamp: chrono::Utc::now(),
            });
        }

        Admission::Admitted
    }

    /// Settle-timer completion; ignored if the slot was evicted or reissued
    fn settle(&self, video_id: &str, generation: u64) {
        let mut inner = self.lock();
        let Some(slot) = inner.slots.get_mut(video_id) else {
            trace!("Stale settle for {} ignored (evicted)", video_id);
            return;
        };
        if slot.generation != generation || slot.state != LoadState::Loading {
            trace!("Stale settle for {} ignored (generation {})", video_id, generation);
            return;
        }

        slot.state = LoadState::Loaded;
        slot.settle = None;
        drop(inner);

        debug!("Load of {} settled", video_id);
        self.emit(ShowreelEvent::LoadSettled {
            video_id: video_id.to_string(),
            timestamp: chrono::Utc::now(),
        });
    }

    /// Release the slot of `video_id`. Idempotent.
    ///
    /// Returns true if a slot was actually freed.
    pub fn request_unload(&self, video_id: &str) -> bool {
        let mut inner = self.lock();
        let Some(slot) = inner.slots.remove(video_id) else {
            return false;
        };
        if let Some(settle) = slot.settle {
            settle.abort();
        }
        let active = inner.slots.len();
        drop(inner);

        debug!("Evicted {} ({}/{})", video_id, active, self.ceiling);
        self.emit(ShowreelEvent::LoadEvicted {
            video_id: video_id.to_string(),
            active,
            timestamp: chrono::Utc::now(),
        });
        true
    }

    pub fn state(&self, video_id: &str) -> LoadState {
        self.lock()
            .slots
            .get(video_id)
            .map(|slot| slot.state)
            .unwrap_or(LoadState::Idle)
    }

    pub fn is_loaded(&self, video_id: &str) -> bool {
        self.state(video_id) == LoadState::Loaded
    }

    pub fn is_loading(&self, video_id: &str) -> bool {
        self.state(video_id) == LoadState::Loading
    }

    /// Number of loading + loaded videos
    pub fn active_count(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn status(&self, video_id: &str) -> VideoLoadStatus {
        let inner = self.lock();
        let state = inner.slots.get(video_id).map(|slot| slot.state);
        VideoLoadStatus {
            is_loading: state == Some(LoadState::Loading),
            is_loaded: state == Some(LoadState::Loaded),
            can_load: state.is_some() || inner.slots.len() < self.ceiling,
        }
    }
}

impl std::fmt::Debug for ResourceLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLoader")
            .field("ceiling", &self.ceiling)
            .field("settle_delay", &self.settle_delay)
            .field("active", &self.active_count())
            .finish()
    }
}
