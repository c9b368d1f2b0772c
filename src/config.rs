// src/config.rs
//! Pipeline configuration.
//!
//! Loaded from an optional YAML file; every field has a default, and the CLI
//! overrides individual fields after loading. Passed explicitly to
//! `Pipeline::new`.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://www.eia.gov/electricity/data/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root the published file paths are resolved against. `file://` URLs
    /// point at a local mirror with the same layout.
    pub base_url: String,
    /// Payload cache; `None` disables caching.
    pub cache_dir: Option<PathBuf>,
    /// Re-download even when a cached payload exists.
    pub refresh: bool,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Upper bound on requests in flight for one query.
    pub max_concurrency: usize,
    /// Latest year considered published; defaults to the local calendar year.
    pub current_year: Option<i32>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_dir: None,
            refresh: false,
            timeout_secs: 60,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            max_concurrency: 3,
            current_year: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;
        let config: Config = serde_yaml::from_str(&text)
            .map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))?;
        debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("base_url {:?}: {e}", self.base_url)))
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
            .unwrap_or_else(|| chrono::Local::now().year())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}
