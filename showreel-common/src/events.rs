//! Event types for the showreel event system
//!
//! Every state change in the playback core (playing id, load admission,
//! presenter transitions) is broadcast as a `ShowreelEvent` so presentational
//! code and diagnostics can follow along without polling.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{CategoryId, VideoId};

/// Addressing scope for transport commands
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "category_id", rename_all = "lowercase")]
pub enum SequenceScope {
    /// The "all work" sequence, every video in catalog order
    Global,
    /// Videos of a single category
    Category(CategoryId),
}

impl std::fmt::Display for SequenceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequenceScope::Global => write!(f, "global"),
            SequenceScope::Category(id) => write!(f, "category:{}", id),
        }
    }
}

/// Presentation state of a single mounted video instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationState {
    /// Thumbnail or spinner, no media attached
    Placeholder,
    /// Admitted by the loader, media not yet playable
    Loading,
    /// Playable and looping silently
    ReadyMuted,
    /// Playable with sound, the "now playing" instance
    ReadyActive,
    /// Media failed; static fallback until remount
    Error,
}

impl PresentationState {
    pub fn is_ready(self) -> bool {
        matches!(self, PresentationState::ReadyMuted | PresentationState::ReadyActive)
    }
}

impl std::fmt::Display for PresentationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresentationState::Placeholder => write!(f, "placeholder"),
            PresentationState::Loading => write!(f, "loading"),
            PresentationState::ReadyMuted => write!(f, "ready-muted"),
            PresentationState::ReadyActive => write!(f, "ready-active"),
            PresentationState::Error => write!(f, "error"),
        }
    }
}

/// Showreel event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShowreelEvent {
    /// The audible video changed (either side may be None)
    PlayingChanged {
        previous: Option<VideoId>,
        current: Option<VideoId>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A sequence was replaced and its cursor reset
    SequenceReplaced {
        scope: SequenceScope,
        len: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A sequence cursor moved through a transport command
    CursorMoved {
        scope: SequenceScope,
        index: usize,
        video_id: VideoId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Loader admitted a video into a concurrency slot
    LoadAdmitted {
        video_id: VideoId,
        active: usize,
        ceiling: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Loader dropped a request because the ceiling was reached
    LoadRejected {
        video_id: VideoId,
        active: usize,
        ceiling: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Settle delay elapsed, video counts as loaded
    LoadSettled {
        video_id: VideoId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Video released its concurrency slot
    LoadEvicted {
        video_id: VideoId,
        active: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A presenter changed state
    PresentationChanged {
        instance_id: Uuid,
        video_id: VideoId,
        from: PresentationState,
        to: PresentationState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A media element reported a real (non-cancellation) failure
    MediaFailed {
        instance_id: Uuid,
        video_id: VideoId,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl ShowreelEvent {
    /// Video the event concerns, if any
    pub fn video_id(&self) -> Option<&str> {
        match self {
            ShowreelEvent::PlayingChanged { current, .. } => current.as_deref(),
            ShowreelEvent::SequenceReplaced { .. } => None,
            ShowreelEvent::CursorMoved { video_id, .. }
            | ShowreelEvent::LoadAdmitted { video_id, .. }
            | ShowreelEvent::LoadRejected { video_id, .. }
            | ShowreelEvent::LoadSettled { video_id, .. }
            | ShowreelEvent::LoadEvicted { video_id, .. }
            | ShowreelEvent::PresentationChanged { video_id, .. }
            | ShowreelEvent::MediaFailed { video_id, .. } => Some(video_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = ShowreelEvent::PlayingChanged {
            previous: None,
            current: Some("v1".to_string()),
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PlayingChanged");
        assert_eq!(json["current"], "v1");
        assert!(json["previous"].is_null());
    }

    #[test]
    fn test_scope_serialization() {
        let json = serde_json::to_value(SequenceScope::Category("ads".into())).unwrap();
        assert_eq!(json["scope"], "category");
        assert_eq!(json["category_id"], "ads");

        let json = serde_json::to_value(SequenceScope::Global).unwrap();
        assert_eq!(json["scope"], "global");
    }

    #[test]
    fn test_presentation_state_display() {
        assert_eq!(PresentationState::ReadyMuted.to_string(), "ready-muted");
        assert!(PresentationState::ReadyActive.is_ready());
        assert!(!PresentationState::Loading.is_ready());
    }

    #[test]
    fn test_event_video_id() {
        let event = ShowreelEvent::LoadSettled {
            video_id: "v9".to_string(),
            timestamp: chrono::Utc::now(),
        };
        assert_eq!(event.video_id(), Some("v9"));
    }
}
