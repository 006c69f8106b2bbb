//! Shared playback state
//!
//! One owned context handed to every mounted video instance: the coordinator,
//! the loader, the device profile and the event broadcaster. There are no
//! ambient globals; whoever mounts an instance passes this handle in.

use std::sync::Arc;

use showreel_common::config::PlaybackTuning;
use showreel_common::ShowreelEvent;
use tokio::sync::broadcast;

use crate::device::DeviceProfile;
use crate::loader::{ResourceLoader, VideoLoadStatus};
use crate::playback::PlaybackCoordinator;

/// Shared state accessible by all components
pub struct SharedState {
    pub coordinator: PlaybackCoordinator,
    pub loader: ResourceLoader,
    pub profile: DeviceProfile,
    pub tuning: PlaybackTuning,

    /// Event broadcaster for all core events
    event_tx: broadcast::Sender<ShowreelEvent>,
}

impl SharedState {
    /// Create shared state for a classified device
    pub fn new(profile: DeviceProfile, tuning: PlaybackTuning) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(256);
        Arc::new(Self {
            coordinator: PlaybackCoordinator::new(event_tx.clone()),
            loader: ResourceLoader::for_profile(&profile, &tuning, event_tx.clone()),
            profile,
            tuning,
            event_tx,
        })
    }

    /// Broadcast an event to all listeners
    pub fn broadcast_event(&self, event: ShowreelEvent) {
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to the event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<ShowreelEvent> {
        self.event_tx.subscribe()
    }

    /// Render flags for one video
    pub fn video_state(&self, video_id: &str) -> VideoLoadStatus {
        self.loader.status(video_id)
    }

    pub fn is_playing(&self, video_id: &str) -> bool {
        self.coordinator.is_playing(video_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceClass;

    #[test]
    fn test_components_share_one_event_stream() {
        let tuning = PlaybackTuning::default();
        let state = SharedState::new(DeviceProfile::new(DeviceClass::Capable, &tuning), tuning);
        let mut rx = state.subscribe_events();

        state.coordinator.play("v1");
        state.loader.request_load("v1");

        assert!(matches!(rx.try_recv(), Ok(ShowreelEvent::PlayingChanged { .. })));
        assert!(matches!(rx.try_recv(), Ok(ShowreelEvent::LoadAdmitted { .. })));
        assert!(state.is_playing("v1"));
        assert!(state.video_state("v1").is_loaded);
    }
}
