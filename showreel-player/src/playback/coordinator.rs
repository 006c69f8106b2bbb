//! Playback coordinator
//!
//! Single authority for which video, if any, is audible. Holds the global
//! sequence, lazily-created category sequences, and the shared playing id.
//!
//! Every operation is a synchronous state transition that is safe to call
//! repeatedly: empty sequences, stale indices and unknown ids are no-ops.
//! The playing id is only written under the write lock and published through
//! a `watch` channel in the same critical section, so at most one id is ever
//! recorded as playing and observers see changes in call order.
//!
//! Sequence replacement never touches the playing id; only play, pause, stop
//! and the transport commands do.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use showreel_common::{CategoryId, SequenceScope, ShowreelEvent, VideoEntry, VideoId};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use super::registry::MediaRegistry;
use super::sequence::{PlaySequence, SequenceView};
use crate::media::MediaElement;

#[derive(Default)]
struct CoordinatorInner {
    global: PlaySequence,
    categories: HashMap<CategoryId, PlaySequence>,
    playing: Option<VideoId>,
}

impl CoordinatorInner {
    fn sequence_mut(&mut self, scope: &SequenceScope) -> Option<&mut PlaySequence> {
        match scope {
            SequenceScope::Global => Some(&mut self.global),
            SequenceScope::Category(id) => self.categories.get_mut(id),
        }
    }

    fn sequence(&self, scope: &SequenceScope) -> Option<&PlaySequence> {
        match scope {
            SequenceScope::Global => Some(&self.global),
            SequenceScope::Category(id) => self.categories.get(id),
        }
    }
}

/// Shared handle to the coordinator; clones see the same state
#[derive(Clone)]
pub struct PlaybackCoordinator {
    inner: Arc<RwLock<CoordinatorInner>>,
    playing_tx: Arc<watch::Sender<Option<VideoId>>>,
    registry: MediaRegistry,
    event_tx: broadcast::Sender<ShowreelEvent>,
}

impl PlaybackCoordinator {
    pub fn new(event_tx: broadcast::Sender<ShowreelEvent>) -> Self {
        let (playing_tx, _) = watch::channel(None);
        Self {
            inner: Arc::new(RwLock::new(CoordinatorInner::default())),
            playing_tx: Arc::new(playing_tx),
            registry: MediaRegistry::new(),
            event_tx,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CoordinatorInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CoordinatorInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ShowreelEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Set the playing id; caller holds the write lock
    fn set_playing_locked(&self, inner: &mut CoordinatorInner, next: Option<VideoId>) {
        if inner.playing == next {
            return;
        }
        let previous = std::mem::replace(&mut inner.playing, next.clone());
        self.playing_tx.send_replace(next.clone());

        info!(
            "Now playing: {} (was {})",
            next.as_deref().unwrap_or("none"),
            previous.as_deref().unwrap_or("none")
        );
        self.emit(ShowreelEvent::PlayingChanged {
            previous,
            current: next,
            timestamp: chrono::Utc::now(),
        });
    }

    // ----- sequence population -----

    /// Replace the global sequence and reset its cursor
    pub fn set_global_videos(&self, videos: Vec<VideoEntry>) {
        let len = videos.len();
        self.write().global.replace(videos);
        debug!("Global sequence replaced ({} videos)", len);
        self.emit(ShowreelEvent::SequenceReplaced {
            scope: SequenceScope::Global,
            len,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Replace or create a category sequence and reset its cursor
    pub fn set_category_videos(&self, category_id: &str, videos: Vec<VideoEntry>) {
        let len = videos.len();
        self.write()
            .categories
            .entry(category_id.to_string())
            .or_default()
            .replace(videos);
        debug!("Category {} sequence replaced ({} videos)", category_id, len);
        self.emit(ShowreelEvent::SequenceReplaced {
            scope: SequenceScope::Category(category_id.to_string()),
            len,
            timestamp: chrono::Utc::now(),
        });
    }

    pub fn has_category(&self, category_id: &str) -> bool {
        self.read().categories.contains_key(category_id)
    }

    // ----- transport -----

    /// Shared body of the cursor-moving commands
    fn play_with<F>(&self, scope: &SequenceScope, step: F) -> Option<VideoId>
    where
        F: FnOnce(&mut PlaySequence) -> Option<&VideoEntry>,
    {
        let mut inner = self.write();
        let (index, video_id) = {
            let sequence = inner.sequence_mut(scope)?;
            let video_id = step(sequence)?.id.clone();
            (sequence.current_index(), video_id)
        };
        self.set_playing_locked(&mut inner, Some(video_id.clone()));
        drop(inner);

        self.emit(ShowreelEvent::CursorMoved {
            scope: scope.clone(),
            index,
            video_id: video_id.clone(),
            timestamp: chrono::Utc::now(),
        });
        Some(video_id)
    }

    /// Select `index` in `scope` and play it; out of range is a no-op
    pub fn play_at(&self, scope: &SequenceScope, index: usize) -> Option<VideoId> {
        self.play_with(scope, |seq| seq.select(index))
    }

    /// Advance `scope` with wraparound and play; no-op on empty
    pub fn play_next(&self, scope: &SequenceScope) -> Option<VideoId> {
        self.play_with(scope, PlaySequence::advance)
    }

    /// Retreat `scope` with wraparound and play; no-op on empty
    pub fn play_previous(&self, scope: &SequenceScope) -> Option<VideoId> {
        self.play_with(scope, PlaySequence::retreat)
    }

    /// Force `video_id` to be the playing one, independent of any sequence
    pub fn play(&self, video_id: &str) {
        let mut inner = self.write();
        self.set_playing_locked(&mut inner, Some(video_id.to_string()));
    }

    /// Clear the playing id only if it is `video_id`
    ///
    /// Returns false when another video had already taken over.
    pub fn pause(&self, video_id: &str) -> bool {
        let mut inner = self.write();
        if inner.playing.as_deref() != Some(video_id) {
            return false;
        }
        self.set_playing_locked(&mut inner, None);
        true
    }

    pub fn stop_all(&self) {
        let mut inner = self.write();
        self.set_playing_locked(&mut inner, None);
    }

    // ----- queries -----

    pub fn playing_video_id(&self) -> Option<VideoId> {
        self.read().playing.clone()
    }

    pub fn is_playing(&self, video_id: &str) -> bool {
        self.read().playing.as_deref() == Some(video_id)
    }

    /// `{current_index, videos}` of a scope; None for unknown categories
    pub fn sequence(&self, scope: &SequenceScope) -> Option<SequenceView> {
        self.read().sequence(scope).map(PlaySequence::view)
    }

    pub fn current_index(&self, scope: &SequenceScope) -> Option<usize> {
        self.read().sequence(scope).map(PlaySequence::current_index)
    }

    /// Receiver that observes every playing id change
    pub fn subscribe_playing(&self) -> watch::Receiver<Option<VideoId>> {
        self.playing_tx.subscribe()
    }

    // ----- media refs -----

    pub fn register_media_ref(&self, video_id: &str, handle: &Arc<dyn MediaElement>) {
        self.registry.register(video_id, handle);
    }

    pub fn unregister_media_ref(&self, video_id: &str) {
        self.registry.unregister(video_id);
    }

    pub fn media_ref(&self, video_id: &str) -> Option<Arc<dyn MediaElement>> {
        self.registry.get(video_id)
    }

    pub fn registry(&self) -> &MediaRegistry {
        &self.registry
    }
}

impl std::fmt::Debug for PlaybackCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("PlaybackCoordinator")
            .field("global_len", &inner.global.len())
            .field("categories", &inner.categories.len())
            .field("playing", &inner.playing)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use showreel_common::LocalizedText;

    fn entries(ids: &[&str]) -> Vec<VideoEntry> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| VideoEntry {
                id: id.to_string(),
                category_id: "c1".to_string(),
                title: LocalizedText::default(),
                subtitle: LocalizedText::default(),
                video_url: format!("{}.mp4", id),
                thumbnail_url: None,
                order: i as i64,
            })
            .collect()
    }

    fn coordinator() -> PlaybackCoordinator {
        let (tx, _) = broadcast::channel(64);
        PlaybackCoordinator::new(tx)
    }

    #[test]
    fn test_three_nexts_wrap_to_start() {
        let c = coordinator();
        c.set_global_videos(entries(&["A", "B", "C"]));

        c.play_next(&SequenceScope::Global);
        c.play_next(&SequenceScope::Global);
        c.play_next(&SequenceScope::Global);

        assert_eq!(c.playing_video_id().as_deref(), Some("A"));
        assert_eq!(c.current_index(&SequenceScope::Global), Some(0));
    }

    #[test]
    fn test_previous_from_zero_wraps_to_last() {
        let c = coordinator();
        c.set_global_videos(entries(&["A", "B", "C"]));
        assert_eq!(c.play_previous(&SequenceScope::Global).as_deref(), Some("C"));
        assert_eq!(c.current_index(&SequenceScope::Global), Some(2));
    }

    #[test]
    fn test_play_at_out_of_range_is_noop() {
        let c = coordinator();
        c.set_global_videos(entries(&["A", "B", "C"]));
        c.play_at(&SequenceScope::Global, 1);

        assert!(c.play_at(&SequenceScope::Global, 5).is_none());
        assert_eq!(c.current_index(&SequenceScope::Global), Some(1));
        assert_eq!(c.playing_video_id().as_deref(), Some("B"));
    }

    #[test]
    fn test_pause_only_clears_matching_id() {
        let c = coordinator();
        c.play("X");
        assert!(!c.pause("Y"));
        assert_eq!(c.playing_video_id().as_deref(), Some("X"));
        assert!(c.pause("X"));
        assert!(c.playing_video_id().is_none());
    }

    #[test]
    fn test_sequence_replacement_keeps_playing_id() {
        let c = coordinator();
        c.set_global_videos(entries(&["A", "B"]));
        c.play_at(&SequenceScope::Global, 1);
        c.set_global_videos(entries(&["X", "Y", "Z"]));

        assert_eq!(c.playing_video_id().as_deref(), Some("B"));
        assert_eq!(c.current_index(&SequenceScope::Global), Some(0));
    }

    #[test]
    fn test_scopes_have_independent_cursors() {
        let c = coordinator();
        let global = SequenceScope::Global;
        let cat = SequenceScope::Category("c1".into());
        c.set_global_videos(entries(&["A", "B", "C"]));
        c.set_category_videos("c1", entries(&["B", "C"]));

        c.play_at(&global, 0);
        c.play_next(&cat);

        assert_eq!(c.current_index(&global), Some(0));
        assert_eq!(c.current_index(&cat), Some(1));
        // Category selection took over audibility
        assert_eq!(c.playing_video_id().as_deref(), Some("C"));
    }

    #[test]
    fn test_unknown_category_is_noop() {
        let c = coordinator();
        let scope = SequenceScope::Category("missing".into());
        assert!(c.play_next(&scope).is_none());
        assert!(c.play_previous(&scope).is_none());
        assert!(c.sequence(&scope).is_none());
        assert!(c.playing_video_id().is_none());
    }

    #[test]
    fn test_watch_receiver_sees_changes() {
        let c = coordinator();
        let rx = c.subscribe_playing();
        c.play("A");
        assert_eq!(rx.borrow().as_deref(), Some("A"));
        c.stop_all();
        assert!(rx.borrow().is_none());
    }

    #[test]
    fn test_playing_changed_not_emitted_for_same_id() {
        let (tx, mut rx) = broadcast::channel(16);
        let c = PlaybackCoordinator::new(tx);
        c.play("A");
        c.play("A");
        c.stop_all();
        c.stop_all();

        let changes = std::iter::from_fn(|| rx.try_recv().ok())
            .filter(|e| matches!(e, ShowreelEvent::PlayingChanged { .. }))
            .count();
        assert_eq!(changes, 2);
    }
}
