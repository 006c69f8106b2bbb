//! Cursored play sequences

use serde::Serialize;
use showreel_common::VideoEntry;

/// Shape exposed to presentational code for either scope
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SequenceView {
    pub current_index: usize,
    pub videos: Vec<VideoEntry>,
}

/// Ordered list of videos plus a cursor
///
/// The cursor is a valid index whenever the list is non-empty and 0 when it
/// is empty. Every movement on an empty sequence is a no-op.
#[derive(Debug, Clone, Default)]
pub struct PlaySequence {
    videos: Vec<VideoEntry>,
    current_index: usize,
}

impl PlaySequence {
    pub fn new(videos: Vec<VideoEntry>) -> Self {
        Self {
            videos,
            current_index: 0,
        }
    }

    /// Replace the contents and reset the cursor to 0
    pub fn replace(&mut self, videos: Vec<VideoEntry>) {
        self.videos = videos;
        self.current_index = 0;
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> Option<&VideoEntry> {
        self.videos.get(self.current_index)
    }

    pub fn videos(&self) -> &[VideoEntry] {
        &self.videos
    }

    /// Move the cursor to `index`; out-of-range indices leave it untouched
    pub fn select(&mut self, index: usize) -> Option<&VideoEntry> {
        if index >= self.videos.len() {
            return None;
        }
        self.current_index = index;
        self.videos.get(index)
    }

    /// Advance with wraparound
    pub fn advance(&mut self) -> Option<&VideoEntry> {
        let len = self.videos.len();
        if len == 0 {
            return None;
        }
        self.current_index = (self.current_index + 1) % len;
        self.videos.get(self.current_index)
    }

    /// Retreat with wraparound (0 goes to the last entry)
    pub fn retreat(&mut self) -> Option<&VideoEntry> {
        let len = self.videos.len();
        if len == 0 {
            return None;
        }
        self.current_index = (self.current_index + len - 1) % len;
        self.videos.get(self.current_index)
    }

    pub fn view(&self) -> SequenceView {
        SequenceView {
            current_index: self.current_index,
            videos: self.videos.clone(),
        }
    }
}
