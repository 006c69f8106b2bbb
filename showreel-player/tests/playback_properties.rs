//! Coordinator and loader properties
//!
//! Covers the single-playing-id guarantee, cursor wraparound, guards on
//! stale indices, and admission limits under the settle timer.

use std::time::Duration;

use showreel_common::config::PlaybackTuning;
use showreel_common::{LocalizedText, SequenceScope, ShowreelEvent, VideoEntry};
use showreel_player::device::{DeviceClass, DeviceProfile};
use showreel_player::loader::{Admission, LoadState, ResourceLoader};
use showreel_player::playback::PlaybackCoordinator;
use tokio::sync::broadcast;

fn video(id: &str, category: &str) -> VideoEntry {
    VideoEntry {
        id: id.to_string(),
        category_id: category.to_string(),
        title: LocalizedText::new(id, id),
        subtitle: LocalizedText::default(),
        video_url: format!("https://cdn.example/{}.mp4", id),
        thumbnail_url: None,
        order: 0,
    }
}

fn coordinator() -> (PlaybackCoordinator, broadcast::Receiver<ShowreelEvent>) {
    let (tx, rx) = broadcast::channel(64);
    (PlaybackCoordinator::new(tx), rx)
}

fn abc() -> Vec<VideoEntry> {
    vec![video("A", "c1"), video("B", "c1"), video("C", "c2")]
}

#[test]
fn test_next_wraps_back_to_start() {
    let (coord, _rx) = coordinator();
    coord.set_global_videos(abc());

    coord.play_next(&SequenceScope::Global);
    coord.play_next(&SequenceScope::Global);
    coord.play_next(&SequenceScope::Global);

    assert_eq!(coord.playing_video_id().as_deref(), Some("A"));
    assert_eq!(coord.current_index(&SequenceScope::Global), Some(0));
}

#[test]
fn test_previous_from_start_wraps_to_end() {
    let (coord, _rx) = coordinator();
    coord.set_global_videos(abc());

    assert_eq!(coord.play_previous(&SequenceScope::Global).as_deref(), Some("C"));
    assert_eq!(coord.current_index(&SequenceScope::Global), Some(2));
    assert_eq!(coord.play_next(&SequenceScope::Global).as_deref(), Some("A"));
    assert_eq!(coord.current_index(&SequenceScope::Global), Some(0));
}

#[test]
fn test_out_of_range_select_is_noop() {
    let (coord, _rx) = coordinator();
    coord.set_global_videos(abc());
    coord.play_at(&SequenceScope::Global, 1);

    assert_eq!(coord.play_at(&SequenceScope::Global, 5), None);
    assert_eq!(coord.playing_video_id().as_deref(), Some("B"));
    assert_eq!(coord.current_index(&SequenceScope::Global), Some(1));
}

#[test]
fn test_pause_of_other_id_keeps_playing() {
    let (coord, _rx) = coordinator();
    coord.play("X");
    assert!(!coord.pause("Y"));
    assert_eq!(coord.playing_video_id().as_deref(), Some("X"));
    assert!(coord.pause("X"));
    assert_eq!(coord.playing_video_id(), None);
}

#[test]
fn test_category_select_takes_over_global() {
    let (coord, _rx) = coordinator();
    coord.set_global_videos(abc());
    coord.set_category_videos("c1", vec![video("A", "c1"), video("B", "c1")]);
    let c1 = SequenceScope::Category("c1".into());

    coord.play_at(&SequenceScope::Global, 2);
    coord.play_at(&c1, 1);

    assert_eq!(coord.playing_video_id().as_deref(), Some("B"));
    // Cursors are independent
    assert_eq!(coord.current_index(&SequenceScope::Global), Some(2));
    assert_eq!(coord.current_index(&c1), Some(1));
}

#[test]
fn test_empty_and_unknown_scopes_are_noops() {
    let (coord, _rx) = coordinator();
    assert_eq!(coord.play_next(&SequenceScope::Global), None);
    assert_eq!(coord.play_previous(&SequenceScope::Category("nope".into())), None);
    assert_eq!(coord.playing_video_id(), None);
    assert!(coord.sequence(&SequenceScope::Category("nope".into())).is_none());
}

#[test]
fn test_at_most_one_playing_across_operations() {
    let (coord, mut rx) = coordinator();
    coord.set_global_videos(abc());
    coord.set_category_videos("c2", vec![video("C", "c2")]);
    let c2 = SequenceScope::Category("c2".into());

    coord.play("A");
    coord.play_next(&SequenceScope::Global);
    coord.play_at(&c2, 0);
    coord.pause("A");
    coord.set_global_videos(vec![video("Z", "c9")]);
    coord.play_previous(&SequenceScope::Global);
    coord.stop_all();

    // Every change names the previous holder, so the chain never forks
    let mut holder: Option<String> = None;
    while let Ok(event) = rx.try_recv() {
        if let ShowreelEvent::PlayingChanged { previous, current, .. } = event {
            assert_eq!(previous, holder);
            assert_ne!(previous, current);
            holder = current;
        }
    }
    assert_eq!(holder, None);
    assert_eq!(coord.playing_video_id(), None);
}

#[test]
fn test_replacing_sequence_keeps_playing_id() {
    let (coord, _rx) = coordinator();
    coord.set_global_videos(abc());
    coord.play_at(&SequenceScope::Global, 2);

    coord.set_global_videos(vec![video("D", "c3")]);
    assert_eq!(coord.playing_video_id().as_deref(), Some("C"));
    assert_eq!(coord.current_index(&SequenceScope::Global), Some(0));
}

#[tokio::test]
async fn test_watch_sees_latest_playing_id() {
    let (coord, _rx) = coordinator();
    let mut playing = coord.subscribe_playing();

    coord.play("A");
    coord.play("B");
    playing.changed().await.unwrap();
    assert_eq!(playing.borrow_and_update().as_deref(), Some("B"));
}

// ----- loader -----

fn loader(class: DeviceClass) -> ResourceLoader {
    let tuning = PlaybackTuning::default();
    let (tx, _) = broadcast::channel(64);
    ResourceLoader::for_profile(&DeviceProfile::new(class, &tuning), &tuning, tx)
}

#[tokio::test(start_paused = true)]
async fn test_constrained_second_load_waits_for_unload() {
    let loader = loader(DeviceClass::Constrained);

    assert_eq!(loader.request_load("v0"), Admission::Admitted);
    assert!(matches!(loader.request_load("v1"), Admission::Rejected { .. }));
    assert!(!loader.status("v1").can_load);

    // Settling does not free the slot
    tokio::time::sleep(loader.settle_delay() + Duration::from_millis(1)).await;
    assert!(loader.is_loaded("v0"));
    assert!(matches!(loader.request_load("v1"), Admission::Rejected { .. }));
    assert_eq!(loader.state("v1"), LoadState::Idle);

    loader.request_unload("v0");
    assert!(loader.status("v1").can_load);
    assert_eq!(loader.request_load("v1"), Admission::Admitted);
}

#[tokio::test(start_paused = true)]
async fn test_capable_ceiling_is_four() {
    let loader = loader(DeviceClass::Capable);
    let admitted = (0..10)
        .filter(|i| loader.request_load(&format!("v{}", i)) == Admission::Admitted)
        .count();

    assert_eq!(admitted, 4);
    assert_eq!(loader.active_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_double_unload_matches_single() {
    let loader = loader(DeviceClass::Capable);
    loader.request_load("v0");
    loader.request_load("v1");

    assert!(loader.request_unload("v0"));
    let once = (loader.state("v0"), loader.active_count(), loader.status("v0"));
    assert!(!loader.request_unload("v0"));
    let twice = (loader.state("v0"), loader.active_count(), loader.status("v0"));
    assert_eq!(once, twice);
}

#[tokio::test(start_paused = true)]
async fn test_evicted_load_never_settles() {
    let loader = loader(DeviceClass::Capable);
    let half = loader.settle_delay() / 2;
    loader.request_load("v0");
    tokio::time::sleep(half).await;
    loader.request_unload("v0");
    loader.request_load("v0");

    // The first timer's deadline passes while the reissued load is still young
    tokio::time::sleep(half + Duration::from_millis(1)).await;
    assert!(loader.is_loading("v0"));
    tokio::time::sleep(half).await;
    assert!(loader.is_loaded("v0"));
}
