//! # Showreel Player Library (showreel-player)
//!
//! Playback coordination core for a video portfolio page.
//!
//! **Purpose:** Let many independently mounted video tiles share "only one
//! video is audible" semantics, lazy-load and unload media by viewport
//! visibility under a device-dependent concurrency ceiling, and expose
//! transport controls over a global and per-category play sequences.
//!
//! **Architecture:** `SharedState` owns the coordinator and the loader;
//! `VideoPresenter` instances reconcile their media element against both;
//! `PortfolioSection` drives presenters from viewport and catalog input.

pub mod catalog;
pub mod commands;
pub mod device;
pub mod error;
pub mod loader;
pub mod media;
pub mod playback;
pub mod presenter;
pub mod section;
pub mod state;
pub mod viewport;

pub use error::{Error, Result};
pub use state::SharedState;
