//! JSON file catalog
//!
//! Reads a catalog export: `{"categories": [...], "videos": [...]}`.

use std::path::{Path, PathBuf};

use showreel_common::{Catalog, Category, VideoEntry};
use tracing::debug;

use super::CatalogProvider;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and decode the whole export in one pass, sorted by `order`
    pub async fn read_catalog(&self) -> Result<Catalog> {
        debug!("Reading catalog file {}", self.path.display());
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(Catalog::from_json(&content)?)
    }
}

impl CatalogProvider for FileCatalog {
    async fn fetch_categories(&self) -> Result<Vec<Category>> {
        Ok(self.read_catalog().await?.categories)
    }

    async fn fetch_videos(&self) -> Result<Vec<VideoEntry>> {
        Ok(self.read_catalog().await?.videos)
    }
}
