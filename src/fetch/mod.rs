// src/fetch/mod.rs
//! Retrieval of published workbooks over HTTP or from a local mirror, with an
//! optional on-disk cache.

pub mod cache;
pub mod catalog;

use reqwest::Client;
use std::io;
use tokio::fs;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use crate::locate::Location;
use crate::{
    config::Config,
    error::{Error, FetchCause, Result},
    sheet::ContentType,
};
pub use cache::{CacheEntry, FetchCache};

/// Payload of one location, exactly as published.
#[derive(Debug, Clone)]
pub struct RawRecord {
    location: Location,
    content_type: ContentType,
    bytes: Vec<u8>,
    from_cache: bool,
}

impl RawRecord {
    pub fn new(location: Location, bytes: Vec<u8>, from_cache: bool) -> Self {
        RawRecord {
            content_type: ContentType::from_path(location.url.path()),
            location,
            bytes,
            from_cache,
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// True when the payload was served from the cache directory.
    pub fn from_cache(&self) -> bool {
        self.from_cache
    }
}

pub struct RawFetcher {
    client: Client,
    cache: Option<FetchCache>,
    refresh: bool,
}

impl RawFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::Config(format!("building HTTP client: {e}")))?;
        Ok(RawFetcher {
            client,
            cache: config.cache_dir.clone().map(FetchCache::new),
            refresh: config.refresh,
        })
    }

    pub fn cache(&self) -> Option<&FetchCache> {
        self.cache.as_ref()
    }

    /// Payload for `location`, from the cache when possible. Remote payloads
    /// are written back to the cache; a failed cache write only warns.
    #[instrument(level = "debug", skip(self, location), fields(url = %location.url))]
    pub async fn fetch(&self, location: &Location) -> Result<RawRecord> {
        let url = &location.url;
        let cache = self.cache.as_ref().filter(|_| url.scheme() != "file");

        if let Some(cache) = cache {
            if !self.refresh {
                if let Some(bytes) = cache.get(url).await.map_err(|e| fetch_error(url, e))? {
                    debug!(bytes = bytes.len(), "served from cache");
                    return Ok(RawRecord::new(location.clone(), bytes, true));
                }
            }
        }

        let bytes = self.get_bytes(url).await?;
        if let Some(cache) = cache {
            if let Err(e) = cache.put(url, &bytes).await {
                warn!(error = %e, "could not cache payload");
            }
        }
        Ok(RawRecord::new(location.clone(), bytes, false))
    }

    /// Removes the cached payload of `location`, if any.
    pub async fn evict(&self, location: &Location) -> Result<bool> {
        match &self.cache {
            Some(cache) => cache
                .remove(&location.url)
                .await
                .map_err(|e| fetch_error(&location.url, e)),
            None => Ok(false),
        }
    }

    /// Uncached GET; `file://` URLs are read from disk.
    pub async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>> {
        if url.scheme() == "file" {
            let path = url.to_file_path().map_err(|_| {
                fetch_error(url, io::Error::new(io::ErrorKind::InvalidInput, "not a local path"))
            })?;
            let bytes = fs::read(&path).await.map_err(|e| fetch_error(url, e))?;
            debug!(path = %path.display(), bytes = bytes.len(), "read local file");
            return Ok(bytes);
        }

        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| fetch_error(url, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Fetch {
                location: url.clone(),
                cause: FetchCause::Status(status),
            });
        }
        let bytes = resp.bytes().await.map_err(|e| fetch_error(url, e))?;
        info!(url = %url, bytes = bytes.len(), "downloaded");
        Ok(bytes.to_vec())
    }

    pub async fn get_text(&self, url: &Url) -> Result<String> {
        let bytes = self.get_bytes(url).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn fetch_error(url: &Url, cause: impl Into<FetchCause>) -> Error {
    Error::Fetch {
        location: url.clone(),
        cause: cause.into(),
    }
}
