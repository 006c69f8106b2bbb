//! Playback coordination
//!
//! The coordinator owns the global and per-category sequences and the single
//! "now playing" id; the registry keeps weak media handles for lookup.

pub mod coordinator;
pub mod registry;
pub mod sequence;

pub use coordinator::PlaybackCoordinator;
pub use registry::MediaRegistry;
pub use sequence::{PlaySequence, SequenceView};
