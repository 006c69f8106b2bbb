//! Video presentation adapter
//!
//! Per-instance glue between one media element, the coordinator's declared
//! intent (is this the audible video?) and the loader's admission state.
//!
//! ```text
//! placeholder --visible+admitted--> loading --loaded data--> ready-muted <--> ready-active
//!      ^                               |                          |               |
//!      +-------------- hidden ---------+--------------------------+---------------+
//! any --media error--> error (terminal until unmount)
//! ```
//!
//! Ready instances always keep looping; losing audibility mutes, it never
//! pauses. The media source is attached only after the loader reports the
//! video loaded, so an instance never downloads without a slot.

use std::sync::Arc;

use showreel_common::{PresentationState, ShowreelEvent, VideoEntry};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::loader::{Admission, VideoLoadStatus};
use crate::media::{MediaElement, MediaError, MediaEvent};
use crate::state::SharedState;

pub struct VideoPresenter {
    instance_id: Uuid,
    entry: VideoEntry,
    media: Arc<dyn MediaElement>,
    shared: Arc<SharedState>,
    state: PresentationState,
    is_playing: bool,
    source_attached: bool,
    mounted: bool,
}

impl VideoPresenter {
    /// Mount an instance and register its media handle
    pub fn mount(entry: VideoEntry, media: Arc<dyn MediaElement>, shared: Arc<SharedState>) -> Self {
        shared.coordinator.register_media_ref(&entry.id, &media);
        let is_playing = shared.is_playing(&entry.id);
        let instance_id = Uuid::new_v4();
        trace!("Mounted {} as instance {}", entry.id, instance_id);

        Self {
            instance_id,
            entry,
            media,
            shared,
            state: PresentationState::Placeholder,
            is_playing,
            source_attached: false,
            mounted: true,
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn video_id(&self) -> &str {
        &self.entry.id
    }

    pub fn entry(&self) -> &VideoEntry {
        &self.entry
    }

    pub fn state(&self) -> PresentationState {
        self.state
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn transition(&mut self, to: PresentationState) {
        if self.state == to {
            return;
        }
        let from = std::mem::replace(&mut self.state, to);
        debug!("{} [{}]: {} -> {}", self.entry.id, self.instance_id, from, to);
        self.shared.broadcast_event(ShowreelEvent::PresentationChanged {
            instance_id: self.instance_id,
            video_id: self.entry.id.clone(),
            from,
            to,
            timestamp: chrono::Utc::now(),
        });
    }

    // ----- visibility -----

    /// Element entered the preload window
    ///
    /// Returns the loader's answer, or None when this instance does not want
    /// a slot (already loading/ready, failed, or unmounted).
    pub fn on_visible(&mut self) -> Option<Admission> {
        if !self.mounted || self.state != PresentationState::Placeholder {
            return None;
        }

        let admission = self.shared.loader.request_load(&self.entry.id);
        if admission.holds_slot() {
            self.transition(PresentationState::Loading);
            self.refresh();
        }
        Some(admission)
    }

    /// Element left the unload window: evict and release the media
    pub fn on_hidden(&mut self) {
        if !self.mounted {
            return;
        }
        self.shared.loader.request_unload(&self.entry.id);
        if self.state == PresentationState::Error {
            return;
        }
        self.release_media();
        self.transition(PresentationState::Placeholder);
    }

    // ----- intent / admission -----

    /// Reconcile with the current playing flag and load status
    pub fn sync(&mut self, is_playing: bool, load: VideoLoadStatus) {
        if !self.mounted {
            return;
        }
        self.is_playing = is_playing;

        match self.state {
            PresentationState::Loading => {
                if !load.is_loading && !load.is_loaded {
                    // Slot released behind our back
                    self.release_media();
                    self.transition(PresentationState::Placeholder);
                } else if load.is_loaded && !self.source_attached {
                    trace!("{}: slot settled, attaching source", self.entry.id);
                    self.media.attach_source(&self.entry.video_url);
                    self.media.load();
                    self.source_attached = true;
                }
            }
            PresentationState::ReadyMuted if is_playing => self.activate(),
            PresentationState::ReadyActive if !is_playing => self.demote(),
            _ => {}
        }
    }

    /// Read the coordinator and loader and reconcile
    pub fn refresh(&mut self) {
        let is_playing = self.shared.is_playing(&self.entry.id);
        let load = self.shared.video_state(&self.entry.id);
        self.sync(is_playing, load);
    }

    /// Toggle this video through the coordinator (tile click)
    pub fn click(&mut self) {
        if !self.mounted {
            return;
        }
        let coordinator = &self.shared.coordinator;
        if coordinator.is_playing(&self.entry.id) {
            coordinator.pause(&self.entry.id);
        } else {
            coordinator.play(&self.entry.id);
        }
        self.refresh();
    }

    // ----- media element events -----

    pub fn on_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::LoadStart => trace!("{}: load start", self.entry.id),
            MediaEvent::LoadedData => self.on_loaded_data(),
            MediaEvent::Error(error) => self.on_media_error(error),
        }
    }

    fn on_loaded_data(&mut self) {
        if !self.mounted || self.state != PresentationState::Loading || !self.source_attached {
            trace!("{}: stale loaded-data ignored", self.entry.id);
            return;
        }

        // Intent may have changed since the last sync
        let audible = self.shared.is_playing(&self.entry.id);
        self.is_playing = audible;
        self.transition(if audible {
            PresentationState::ReadyActive
        } else {
            PresentationState::ReadyMuted
        });
        self.start_playback(audible);
    }

    /// Element reported a failure; terminal until remount
    pub fn on_media_error(&mut self, error: MediaError) {
        if !self.mounted || self.state == PresentationState::Error {
            return;
        }

        warn!("{}: media failed: {}", self.entry.id, error);
        self.shared.broadcast_event(ShowreelEvent::MediaFailed {
            instance_id: self.instance_id,
            video_id: self.entry.id.clone(),
            reason: error.to_string(),
            timestamp: chrono::Utc::now(),
        });
        self.release_media();
        self.shared.loader.request_unload(&self.entry.id);
        self.transition(PresentationState::Error);
    }

    /// A play request was rejected (synchronously or later)
    pub fn on_play_rejected(&mut self, error: MediaError) {
        if error.is_benign_cancellation() {
            debug!("{}: play cancelled ({})", self.entry.id, error);
        } else if error.is_fatal() {
            self.on_media_error(error);
        } else {
            warn!("{}: play rejected: {}", self.entry.id, error);
        }
    }

    // ----- media control -----

    fn start_playback(&mut self, audible: bool) {
        self.media.set_muted(!audible);
        if audible {
            self.media.set_volume(self.shared.tuning.active_volume);
        }
        if let Err(error) = self.media.play() {
            self.on_play_rejected(error);
        }
    }

    /// Take over audibility: unmute and (re)start
    fn activate(&mut self) {
        self.transition(PresentationState::ReadyActive);
        self.start_playback(true);
    }

    /// Lose audibility: mute but keep looping
    fn demote(&mut self) {
        self.media.set_muted(true);
        self.transition(PresentationState::ReadyMuted);
    }

    fn release_media(&mut self) {
        self.media.pause();
        self.media.seek_to_start();
        self.media.detach_source();
        self.media.load();
        self.source_attached = false;
    }

    /// Tear the instance down. Safe to call repeatedly; also run on drop.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.release_media();
        self.shared.coordinator.unregister_media_ref(&self.entry.id);
        self.shared.loader.request_unload(&self.entry.id);
        self.mounted = false;
        trace!("Unmounted instance {} ({})", self.instance_id, self.entry.id);
    }
}

impl Drop for VideoPresenter {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl std::fmt::Debug for VideoPresenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoPresenter")
            .field("instance_id", &self.instance_id)
            .field("video_id", &self.entry.id)
            .field("state", &self.state)
            .field("is_playing", &self.is_playing)
            .field("mounted", &self.mounted)
            .finish()
    }
}
