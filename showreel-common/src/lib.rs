//! # Showreel Common Library
//!
//! Shared code for the showreel portfolio player including:
//! - Catalog models (categories, video entries, localized text)
//! - Event types (ShowreelEvent enum)
//! - Configuration loading and resolution

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;

pub use catalog::{Catalog, Category, CategoryId, Locale, LocalizedText, VideoEntry, VideoId};
pub use error::{Error, Result};
pub use events::{PresentationState, SequenceScope, ShowreelEvent};
