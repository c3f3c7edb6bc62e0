use async_trait::async_trait;
use bevy::prelude::*;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::tile_system::types::{TileError, TileImage, TileKey};

/// Subdomains substituted for `{s}`, chosen per tile so requests spread out
const SUBDOMAINS: [&str; 3] = ["a", "b", "c"];

/// A tile server URL with `{z}`, `{x}`, `{y}` (and optionally `{s}`) placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    pub fn parse(template: impl Into<String>) -> Result<Self, TileError> {
        let template = template.into();
        if ["{z}", "{x}", "{y}"].iter().all(|p| template.contains(p)) {
            Ok(Self(template))
        } else {
            Err(TileError::InvalidTemplate(template))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the URL for a (normalized) tile key
    pub fn url_for(&self, key: TileKey) -> String {
        let subdomain = SUBDOMAINS[(key.x + key.y).rem_euclid(SUBDOMAINS.len() as i64) as usize];
        self.0
            .replace("{z}", &key.z.to_string())
            .replace("{x}", &key.x.to_string())
            .replace("{y}", &key.y.to_string())
            .replace("{s}", subdomain)
    }
}

/// Something that turns a tile URL into decoded pixels
#[async_trait]
pub trait TileLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<TileImage, TileError>;
}

/// Loads tiles over HTTP and decodes them with the `image` crate
pub struct HttpTileLoader {
    /// HTTP client for making requests
    client: Client,
}

impl HttpTileLoader {
    pub fn new(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .pool_max_idle_per_host(8)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TileLoader for HttpTileLoader {
    async fn load(&self, url: &str) -> Result<TileImage, TileError> {
        debug!("Requesting tile URL: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TileError::DownloadFailed(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(TileError::NotFound);
        }
        if !status.is_success() {
            return Err(TileError::DownloadFailed(format!("HTTP status {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TileError::DownloadFailed(e.to_string()))?;
        debug!("Received {} bytes from {}", bytes.len(), url);

        decode_tile(&bytes)
    }
}

/// Decode PNG/JPEG/WebP bytes into an RGBA tile
pub fn decode_tile(bytes: &[u8]) -> Result<TileImage, TileError> {
    let image = image::load_from_memory(bytes).map_err(|e| TileError::Decode(e.to_string()))?;
    Ok(Arc::new(image.into_rgba8()))
}
