//! Portfolio catalog model
//!
//! Categories and video entries as the content store returns them. The
//! catalog is read-only for the playback core: it is loaded in bulk once per
//! page view and sorted by each record's `order` field.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Video identifier (document id in the content store)
pub type VideoId = String;

/// Category identifier (document id in the content store)
pub type CategoryId = String;

/// Display locales carried by catalog text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Fr,
}

impl std::str::FromStr for Locale {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "fr" => Ok(Locale::Fr),
            other => Err(crate::Error::InvalidInput(format!("unknown locale '{}'", other))),
        }
    }
}

/// Two-locale display text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    #[serde(default)]
    pub en: String,
    #[serde(default)]
    pub fr: String,
}

impl LocalizedText {
    pub fn new(en: impl Into<String>, fr: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            fr: fr.into(),
        }
    }

    /// Text for `locale`, falling back to English when the translation is blank
    pub fn get(&self, locale: Locale) -> &str {
        match locale {
            Locale::Fr if !self.fr.trim().is_empty() => &self.fr,
            _ => &self.en,
        }
    }
}

/// Portfolio category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: LocalizedText,
    #[serde(default)]
    pub order: i64,
}

/// Single portfolio video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoEntry {
    pub id: VideoId,
    pub category_id: CategoryId,
    #[serde(default)]
    pub title: LocalizedText,
    #[serde(default)]
    pub subtitle: LocalizedText,
    pub video_url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Sort key, unique within the category
    #[serde(default)]
    pub order: i64,
}

/// Bulk-loaded catalog, both lists sorted ascending by `order`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub videos: Vec<VideoEntry>,
}

impl Catalog {
    /// Build a catalog, sorting both lists by `order`.
    ///
    /// The sort is stable so records sharing an order keep the store's order.
    pub fn new(mut categories: Vec<Category>, mut videos: Vec<VideoEntry>) -> Self {
        categories.sort_by_key(|c| c.order);
        videos.sort_by_key(|v| v.order);
        Self { categories, videos }
    }

    /// Parse a catalog JSON document (`{"categories": [...], "videos": [...]}`)
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let raw: Catalog = serde_json::from_str(json)?;
        Ok(Self::new(raw.categories, raw.videos))
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn video(&self, id: &str) -> Option<&VideoEntry> {
        self.videos.iter().find(|v| v.id == id)
    }

    /// Videos belonging to `category_id`, in catalog order.
    ///
    /// Unknown category ids yield an empty list.
    pub fn videos_in_category(&self, category_id: &str) -> Vec<VideoEntry> {
        self.videos
            .iter()
            .filter(|v| v.category_id == category_id)
            .cloned()
            .collect()
    }

    /// Videos whose category id does not reference an existing category
    pub fn orphaned_videos(&self) -> Vec<&VideoEntry> {
        let known: HashSet<&str> = self.categories.iter().map(|c| c.id.as_str()).collect();
        self.videos
            .iter()
            .filter(|v| !known.contains(v.category_id.as_str()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }
}
