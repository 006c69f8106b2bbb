//! Non-owning media handle registry
//!
//! Mounted presenters register their media element under the video id and
//! must deregister on teardown. Entries are weak: the registry never keeps an
//! element alive, and a dropped element simply stops resolving.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use showreel_common::VideoId;

use crate::media::MediaElement;

#[derive(Clone, Default)]
pub struct MediaRegistry {
    refs: Arc<Mutex<HashMap<VideoId, Weak<dyn MediaElement>>>>,
}

impl MediaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<VideoId, Weak<dyn MediaElement>>> {
        self.refs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register (or replace) the handle for `video_id`
    pub fn register(&self, video_id: &str, handle: &Arc<dyn MediaElement>) {
        self.lock().insert(video_id.to_string(), Arc::downgrade(handle));
    }

    /// Remove the handle for `video_id`; returns whether one was present
    pub fn unregister(&self, video_id: &str) -> bool {
        self.lock().remove(video_id).is_some()
    }

    /// Live handle for `video_id`, if its element still exists
    pub fn get(&self, video_id: &str) -> Option<Arc<dyn MediaElement>> {
        self.lock().get(video_id).and_then(Weak::upgrade)
    }

    pub fn contains(&self, video_id: &str) -> bool {
        self.lock().contains_key(video_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::SimulatedMedia;

    #[test]
    fn test_registry_is_weak() {
        let registry = MediaRegistry::new();
        let media: Arc<dyn MediaElement> = Arc::new(SimulatedMedia::new("v1"));
        registry.register("v1", &media);

        assert!(registry.get("v1").is_some());
        drop(media);
        assert!(registry.get("v1").is_none());
        // Entry stays until explicit deregistration
        assert!(registry.contains("v1"));
        assert!(registry.unregister("v1"));
        assert!(!registry.unregister("v1"));
        assert!(registry.is_empty());
    }
}
