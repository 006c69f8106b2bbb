//! Content store REST client
//!
//! `GET {base}/categories` and `GET {base}/videos`, each answering a JSON
//! array. Ordering is applied by `load_catalog`, not trusted from the store.

use std::time::Duration;

use serde::de::DeserializeOwned;
use showreel_common::{Category, VideoEntry};
use tracing::debug;

use super::CatalogProvider;
use crate::error::{Error, Result};

const USER_AGENT: &str = concat!("showreel/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.base_url, collection)
    }

    async fn fetch<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let url = self.collection_url(collection);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::CatalogStatus {
                url,
                status: status.as_u16(),
            });
        }
        Ok(response.json::<Vec<T>>().await?)
    }
}

impl CatalogProvider for HttpCatalog {
    async fn fetch_categories(&self) -> Result<Vec<Category>> {
        self.fetch("categories").await
    }

    async fn fetch_videos(&self) -> Result<Vec<VideoEntry>> {
        self.fetch("videos").await
    }
}
