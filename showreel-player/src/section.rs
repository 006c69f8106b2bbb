//! Portfolio section
//!
//! Mounts one presenter per video of the active filter, lays the tiles out
//! in a single column and drives them from viewport scrolls, transport
//! commands and media events. This is the only place that knows about the
//! category filter; the coordinator just sees sequences and ids.
//!
//! The loader drops over-ceiling requests. Visible instances it rejected wait
//! here in FIFO order and are retried before any newly visible instance
//! whenever a slot frees up.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::Serialize;
use showreel_common::config::LayoutConfig;
use showreel_common::{
    Catalog, CategoryId, Locale, PresentationState, SequenceScope, VideoEntry, VideoId,
};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::loader::Admission;
use crate::media::{MediaElement, MediaEvent};
use crate::playback::SequenceView;
use crate::presenter::VideoPresenter;
use crate::state::SharedState;
use crate::viewport::{Rect, ViewportTracker, VisibilityEvent};

/// Builds the media element for a newly mounted tile
pub type MediaFactory = Box<dyn FnMut(&VideoEntry) -> Arc<dyn MediaElement> + Send>;

/// Single-column tile geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileLayout {
    pub tile_width: f64,
    pub tile_height: f64,
    pub gap: f64,
}

impl TileLayout {
    pub fn from_config(config: &LayoutConfig) -> Self {
        Self {
            tile_width: config.tile_width_px,
            tile_height: config.tile_height_px,
            gap: config.gap_px,
        }
    }

    /// Page rectangle of the tile at `index`
    pub fn tile_rect(&self, index: usize) -> Rect {
        let y = index as f64 * (self.tile_height + self.gap);
        Rect::new(0.0, y, self.tile_width, self.tile_height)
    }

    pub fn content_height(&self, tiles: usize) -> f64 {
        if tiles == 0 {
            return 0.0;
        }
        tiles as f64 * self.tile_height + (tiles - 1) as f64 * self.gap
    }
}

/// Per-tile line of `SectionStatus`
#[derive(Debug, Clone, Serialize)]
pub struct TileStatus {
    pub video_id: VideoId,
    pub title: String,
    pub state: PresentationState,
    pub visible: bool,
    pub queued: bool,
    pub playing: bool,
}

/// Snapshot of the section for display
#[derive(Debug, Clone, Serialize)]
pub struct SectionStatus {
    pub filter: Option<CategoryId>,
    /// Localized name of the filter category
    pub filter_name: Option<String>,
    pub scope: SequenceScope,
    pub playing: Option<VideoId>,
    pub active_loads: usize,
    pub ceiling: usize,
    pub sequence: Option<SequenceView>,
    pub tiles: Vec<TileStatus>,
}

pub struct PortfolioSection {
    catalog: Catalog,
    shared: Arc<SharedState>,
    factory: MediaFactory,
    layout: TileLayout,
    tracker: ViewportTracker,
    /// Mounted tiles in layout order
    presenters: Vec<VideoPresenter>,
    /// Visible instances the loader turned away, oldest first
    pending: VecDeque<Uuid>,
    filter: Option<CategoryId>,
    locale: Locale,
    viewport: Rect,
    mounted: bool,
}

impl PortfolioSection {
    /// Mount the section showing every video, viewport at the top
    pub fn mount(
        catalog: Catalog,
        shared: Arc<SharedState>,
        layout: TileLayout,
        viewport_size: (f64, f64),
        factory: MediaFactory,
    ) -> Self {
        shared.coordinator.set_global_videos(catalog.videos.clone());
        let tracker = ViewportTracker::new(shared.profile.visibility);

        let mut section = Self {
            catalog,
            shared,
            factory,
            layout,
            tracker,
            presenters: Vec::new(),
            pending: VecDeque::new(),
            filter: None,
            locale: Locale::default(),
            viewport: Rect::new(0.0, 0.0, viewport_size.0, viewport_size.1),
            mounted: true,
        };
        section.rebuild_tiles();
        info!(
            "Portfolio section mounted: {} videos, {} device, ceiling {}",
            section.presenters.len(),
            section.shared.profile.class,
            section.shared.loader.ceiling()
        );
        section.apply_viewport();
        section
    }

    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Language used for titles and category names in `status`
    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }

    /// Sequence the transport commands address
    pub fn active_scope(&self) -> SequenceScope {
        match &self.filter {
            Some(id) => SequenceScope::Category(id.clone()),
            None => SequenceScope::Global,
        }
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn content_height(&self) -> f64 {
        self.layout.content_height(self.presenters.len())
    }

    pub fn presenter(&self, video_id: &str) -> Option<&VideoPresenter> {
        self.presenters.iter().find(|p| p.video_id() == video_id)
    }

    pub fn tile_state(&self, video_id: &str) -> Option<PresentationState> {
        self.presenter(video_id).map(VideoPresenter::state)
    }

    pub fn mounted_video_ids(&self) -> Vec<VideoId> {
        self.presenters.iter().map(|p| p.video_id().to_string()).collect()
    }

    pub fn pending_video_ids(&self) -> Vec<VideoId> {
        self.pending
            .iter()
            .filter_map(|id| self.index_of_instance(*id))
            .map(|i| self.presenters[i].video_id().to_string())
            .collect()
    }

    fn index_of_instance(&self, instance_id: Uuid) -> Option<usize> {
        self.presenters.iter().position(|p| p.instance_id() == instance_id)
    }

    fn index_of_video(&self, video_id: &str) -> Option<usize> {
        self.presenters.iter().position(|p| p.video_id() == video_id)
    }

    // ----- filter -----

    /// Switch the category filter (`None` shows everything).
    ///
    /// A category sequence is created the first time its category is
    /// selected. The playing id is left alone even when the playing video
    /// is no longer on screen.
    pub fn select_category(&mut self, category_id: Option<&str>) {
        if !self.mounted || self.filter.as_deref() == category_id {
            return;
        }

        if let Some(id) = category_id {
            if self.catalog.category(id).is_none() {
                warn!("Filtering on unknown category {}", id);
            }
            if !self.shared.coordinator.has_category(id) {
                self.shared
                    .coordinator
                    .set_category_videos(id, self.catalog.videos_in_category(id));
            }
        }

        info!("Filter: {}", category_id.unwrap_or("all"));
        self.filter = category_id.map(str::to_string);
        self.rebuild_tiles();
        self.viewport.y = 0.0;
        self.apply_viewport();
    }

    fn filtered_entries(&self) -> Vec<VideoEntry> {
        match &self.filter {
            Some(id) => self.catalog.videos_in_category(id),
            None => self.catalog.videos.clone(),
        }
    }

    /// Keyed re-render: tiles that stay keep their instance, new ones mount,
    /// dropped ones unmount.
    fn rebuild_tiles(&mut self) {
        let mut previous = std::mem::take(&mut self.presenters);
        let mut next = Vec::new();

        for (index, entry) in self.filtered_entries().into_iter().enumerate() {
            let rect = self.layout.tile_rect(index);
            match previous.iter().position(|p| p.video_id() == entry.id) {
                Some(pos) => {
                    let presenter = previous.swap_remove(pos);
                    self.tracker.update_element(presenter.instance_id(), rect);
                    next.push(presenter);
                }
                None => {
                    let media = (self.factory)(&entry);
                    let presenter = VideoPresenter::mount(entry, media, self.shared.clone());
                    self.tracker.observe(presenter.instance_id(), rect);
                    next.push(presenter);
                }
            }
        }

        for mut dropped in previous {
            self.tracker.unobserve(dropped.instance_id());
            self.pending.retain(|id| *id != dropped.instance_id());
            dropped.unmount();
        }

        debug!("Tiles rebuilt: {} mounted", next.len());
        self.presenters = next;
    }

    // ----- viewport -----

    /// Scroll so the viewport's top edge sits at `y`
    pub fn scroll_to(&mut self, y: f64) {
        if !self.mounted {
            return;
        }
        self.viewport.y = y.max(0.0);
        self.apply_viewport();
    }

    /// Resize the viewport (orientation change, window resize)
    pub fn resize(&mut self, width: f64, height: f64) {
        if !self.mounted {
            return;
        }
        self.viewport.width = width;
        self.viewport.height = height;
        self.apply_viewport();
    }

    /// Exits first so their slots go to waiting instances, then the retry
    /// queue, then new entries in layout order.
    fn apply_viewport(&mut self) {
        let events = self.tracker.evaluate(self.viewport);
        let (entered, exited): (Vec<VisibilityEvent>, Vec<VisibilityEvent>) =
            events.into_iter().partition(|e| e.visible);

        for event in exited {
            self.pending.retain(|id| *id != event.instance_id);
            if let Some(i) = self.index_of_instance(event.instance_id) {
                self.presenters[i].on_hidden();
            }
        }

        self.retry_pending();

        for event in entered {
            if let Some(i) = self.index_of_instance(event.instance_id) {
                self.admit(i);
            }
        }
    }

    fn admit(&mut self, index: usize) {
        let instance_id = self.presenters[index].instance_id();
        if let Some(Admission::Rejected { active, ceiling }) = self.presenters[index].on_visible() {
            debug!(
                "{} waiting for a slot ({}/{})",
                self.presenters[index].video_id(),
                active,
                ceiling
            );
            if !self.pending.contains(&instance_id) {
                self.pending.push_back(instance_id);
            }
        }
    }

    /// Offer free slots to waiting instances in arrival order
    fn retry_pending(&mut self) {
        while let Some(&instance_id) = self.pending.front() {
            let Some(index) = self.index_of_instance(instance_id) else {
                self.pending.pop_front();
                continue;
            };
            if !self.tracker.is_visible(instance_id) {
                self.pending.pop_front();
                continue;
            }

            match self.presenters[index].on_visible() {
                Some(Admission::Rejected { .. }) => break,
                admission => {
                    trace!(
                        "Retry for {}: {:?}",
                        self.presenters[index].video_id(),
                        admission
                    );
                    self.pending.pop_front();
                }
            }
        }
    }

    // ----- transport -----

    pub fn next(&mut self) -> Option<VideoId> {
        let id = self.shared.coordinator.play_next(&self.active_scope());
        self.reconcile();
        id
    }

    pub fn previous(&mut self) -> Option<VideoId> {
        let id = self.shared.coordinator.play_previous(&self.active_scope());
        self.reconcile();
        id
    }

    pub fn select(&mut self, index: usize) -> Option<VideoId> {
        let id = self.shared.coordinator.play_at(&self.active_scope(), index);
        self.reconcile();
        id
    }

    pub fn play(&mut self, video_id: &str) {
        if self.catalog.video(video_id).is_none() {
            warn!("Playing {} which is not in the catalog", video_id);
        }
        self.shared.coordinator.play(video_id);
        self.reconcile();
    }

    pub fn pause(&mut self, video_id: &str) -> bool {
        let paused = self.shared.coordinator.pause(video_id);
        self.reconcile();
        paused
    }

    pub fn stop(&mut self) {
        self.shared.coordinator.stop_all();
        self.reconcile();
    }

    /// Tile click; false when the video has no mounted tile
    pub fn click(&mut self, video_id: &str) -> bool {
        let Some(index) = self.index_of_video(video_id) else {
            return false;
        };
        self.presenters[index].click();
        self.reconcile();
        true
    }

    // ----- media / reconciliation -----

    /// Route a media element event to its tile; false when none is mounted
    pub fn dispatch_media_event(&mut self, video_id: &str, event: MediaEvent) -> bool {
        let Some(index) = self.index_of_video(video_id) else {
            trace!("Media event for unmounted {} dropped", video_id);
            return false;
        };
        self.presenters[index].on_media_event(event);
        self.presenters[index].refresh();
        self.retry_pending();
        true
    }

    /// Bring every tile in line with the coordinator and loader
    pub fn reconcile(&mut self) {
        if !self.mounted {
            return;
        }
        for presenter in &mut self.presenters {
            presenter.refresh();
        }
        self.retry_pending();
    }

    pub fn status(&self) -> SectionStatus {
        let scope = self.active_scope();
        let playing = self.shared.coordinator.playing_video_id();
        let tiles = self
            .presenters
            .iter()
            .map(|p| TileStatus {
                video_id: p.video_id().to_string(),
                title: p.entry().title.get(self.locale).to_string(),
                state: p.state(),
                visible: self.tracker.is_visible(p.instance_id()),
                queued: self.pending.contains(&p.instance_id()),
                playing: playing.as_deref() == Some(p.video_id()),
            })
            .collect();

        SectionStatus {
            filter_name: self
                .filter
                .as_deref()
                .and_then(|id| self.catalog.category(id))
                .map(|c| c.name.get(self.locale).to_string()),
            filter: self.filter.clone(),
            sequence: self.shared.coordinator.sequence(&scope),
            scope,
            playing,
            active_loads: self.shared.loader.active_count(),
            ceiling: self.shared.loader.ceiling(),
            tiles,
        }
    }

    /// Tear down every tile. Safe to call repeatedly; also run on drop.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.tracker.disconnect();
        self.pending.clear();
        for presenter in &mut self.presenters {
            presenter.unmount();
        }
        self.presenters.clear();
        self.mounted = false;
        info!("Portfolio section unmounted");
    }
}

impl Drop for PortfolioSection {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceClass, DeviceProfile};
    use showreel_common::config::PlaybackTuning;
    use showreel_common::{Category, LocalizedText};

    fn catalog() -> Catalog {
        let category = |id: &str, order| Category {
            id: id.into(),
            name: LocalizedText::new(id, format!("{} (fr)", id)),
            order,
        };
        let video = |id: &str, cat: &str, order| VideoEntry {
            id: id.into(),
            category_id: cat.into(),
            title: LocalizedText::new(format!("Title {}", id), ""),
            subtitle: LocalizedText::default(),
            video_url: format!("{}.mp4", id),
            thumbnail_url: None,
            order,
        };
        Catalog::new(
            vec![category("c1", 0), category("c2", 1)],
            vec![video("a", "c1", 0), video("b", "c2", 1), video("c", "c1", 2)],
        )
    }

    fn layout() -> TileLayout {
        TileLayout {
            tile_width: 640.0,
            tile_height: 360.0,
            gap: 40.0,
        }
    }

    fn section(class: DeviceClass) -> PortfolioSection {
        let tuning = PlaybackTuning::default();
        let shared = SharedState::new(DeviceProfile::new(class, &tuning), tuning);
        let factory: MediaFactory =
            Box::new(|entry: &VideoEntry| Arc::new(crate::media::SimulatedMedia::new(entry.id.clone())));
        PortfolioSection::mount(catalog(), shared, layout(), (640.0, 360.0), factory)
    }

    #[test]
    fn test_tile_layout() {
        let layout = layout();
        assert_eq!(layout.tile_rect(2).y, 800.0);
        assert_eq!(layout.content_height(3), 1160.0);
        assert_eq!(layout.content_height(0), 0.0);
    }

    #[test]
    fn test_mount_admits_visible_tiles() {
        let section = section(DeviceClass::Capable);
        assert_eq!(section.mounted_video_ids(), vec!["a", "b", "c"]);
        assert_eq!(section.tile_state("a"), Some(PresentationState::Loading));
        assert_eq!(section.tile_state("c"), Some(PresentationState::Placeholder));
    }

    #[test]
    fn test_filter_creates_category_sequence_once() {
        let mut section = section(DeviceClass::Capable);
        section.select_category(Some("c1"));
        assert_eq!(section.mounted_video_ids(), vec!["a", "c"]);

        section.next();
        assert_eq!(section.shared().coordinator.current_index(&section.active_scope()), Some(1));

        section.select_category(None);
        section.select_category(Some("c1"));
        assert_eq!(section.shared().coordinator.current_index(&section.active_scope()), Some(1));
    }

    #[test]
    fn test_click_unknown_tile() {
        let mut section = section(DeviceClass::Capable);
        section.select_category(Some("c2"));
        assert!(!section.click("a"));
        assert!(section.click("b"));
        assert_eq!(section.status().playing.as_deref(), Some("b"));
    }

    #[test]
    fn test_status_uses_locale() {
        let mut section = section(DeviceClass::Capable);
        section.select_category(Some("c1"));
        section.set_locale(Locale::Fr);
        let status = section.status();
        assert_eq!(status.filter_name.as_deref(), Some("c1 (fr)"));
        // Blank French title falls back to English
        assert_eq!(status.tiles[0].title, "Title a");
    }

    #[test]
    fn test_resize_admits_newly_visible_tiles() {
        let mut section = section(DeviceClass::Capable);
        assert_eq!(section.tile_state("c"), Some(PresentationState::Placeholder));
        section.resize(640.0, 1200.0);
        assert_eq!(section.tile_state("c"), Some(PresentationState::Loading));
        assert_eq!(section.viewport().height, 1200.0);
    }

    #[test]
    fn test_unmount_releases_everything() {
        let mut section = section(DeviceClass::Capable);
        let shared = section.shared().clone();
        section.unmount();
        section.unmount();
        assert_eq!(shared.loader.active_count(), 0);
        assert!(shared.coordinator.registry().is_empty());
    }
}
