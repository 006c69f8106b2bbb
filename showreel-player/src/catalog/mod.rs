//! Content catalog providers
//!
//! The catalog is fetched once per page view as two bulk lists. Providers
//! only fetch; `load_catalog` runs both requests concurrently and sorts the
//! result by `order`.

mod file;
mod http;

pub use file::FileCatalog;
pub use http::HttpCatalog;

use std::future::Future;
use std::time::Duration;

use showreel_common::config::CatalogConfig;
use showreel_common::{Catalog, Category, VideoEntry};
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Source of categories and videos
pub trait CatalogProvider: Send + Sync {
    fn fetch_categories(&self) -> impl Future<Output = Result<Vec<Category>>> + Send;
    fn fetch_videos(&self) -> impl Future<Output = Result<Vec<VideoEntry>>> + Send;
}

/// Fetch both lists and build a sorted catalog
pub async fn load_catalog<P: CatalogProvider>(provider: &P) -> Result<Catalog> {
    let (categories, videos) =
        tokio::try_join!(provider.fetch_categories(), provider.fetch_videos())?;
    let catalog = Catalog::new(categories, videos);
    log_catalog(&catalog);
    Ok(catalog)
}

fn log_catalog(catalog: &Catalog) {
    info!(
        "Catalog loaded: {} categories, {} videos",
        catalog.categories.len(),
        catalog.videos.len()
    );
    for orphan in catalog.orphaned_videos() {
        warn!(
            "Video {} references unknown category {}",
            orphan.id, orphan.category_id
        );
    }
}

/// Configured provider, file taking precedence over URL
pub enum ConfiguredCatalog {
    File(FileCatalog),
    Http(HttpCatalog),
}

impl ConfiguredCatalog {
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        if let Some(path) = &config.path {
            return Ok(Self::File(FileCatalog::new(path)));
        }
        if let Some(url) = &config.url {
            let timeout = Duration::from_millis(config.timeout_ms.unwrap_or(10_000));
            return Ok(Self::Http(HttpCatalog::new(url, timeout)?));
        }
        Err(Error::NoCatalogSource)
    }

    pub async fn load(&self) -> Result<Catalog> {
        match self {
            Self::File(provider) => {
                let catalog = provider.read_catalog().await?;
                log_catalog(&catalog);
                Ok(catalog)
            }
            Self::Http(provider) => load_catalog(provider).await,
        }
    }
}
