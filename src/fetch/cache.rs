// src/fetch/cache.rs
//! On-disk payload cache keyed by source URL.
//!
//! - Layout: `{root}/{host}[_{port}]/{url path}`; nothing else is stored.
//! - Atomic writes (write to `.tmp`, rename into place), so readers never see
//!   a partial payload. Concurrent writers of the same entry are not
//!   coordinated; the last rename wins.
//! - Entries are never invalidated here; callers overwrite with `put`.

use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::fs;
use tracing::{debug, trace};
use url::Url;

const TMP_SUFFIX: &str = "tmp";

#[derive(Debug, Clone)]
pub struct FetchCache {
    root: PathBuf,
}

/// A cached payload on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub size: u64,
}

impl FetchCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FetchCache { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the payload of `url` lives.
    pub fn path_for(&self, url: &Url) -> PathBuf {
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}_{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => "local".to_string(),
        };
        let mut path = self.root.join(sanitize(&host));
        for segment in url.path().split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                continue;
            }
            path.push(sanitize(segment));
        }
        path
    }

    /// Cached bytes for `url`, or `None` when not cached.
    pub async fn get(&self, url: &Url) -> io::Result<Option<Vec<u8>>> {
        let path = self.path_for(url);
        match fs::read(&path).await {
            Ok(bytes) => {
                trace!(path = %path.display(), bytes = bytes.len(), "cache hit");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Stores `bytes` for `url`, replacing any previous entry.
    pub async fn put(&self, url: &Url, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.path_for(url);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp = tmp_path(&path);
        fs::write(&tmp, bytes).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }
        debug!(path = %path.display(), bytes = bytes.len(), "cached payload");
        Ok(path)
    }

    /// Drops the entry for `url`; absent entries are fine.
    pub async fn remove(&self, url: &Url) -> io::Result<bool> {
        match fs::remove_file(self.path_for(url)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Every complete payload under the root, sorted by path.
    pub fn entries(&self) -> io::Result<Vec<CacheEntry>> {
        let pattern = format!(
            "{}/**/*",
            glob::Pattern::escape(&self.root.to_string_lossy())
        );
        let paths = glob::glob(&pattern)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let mut out = Vec::new();
        for path in paths {
            let path = path.map_err(io::Error::from)?;
            if path.extension().is_some_and(|ext| ext == TMP_SUFFIX) {
                continue;
            }
            let meta = std::fs::metadata(&path)?;
            if meta.is_file() {
                out.push(CacheEntry {
                    path,
                    size: meta.len(),
                });
            }
        }
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }

    /// Deletes the whole cache directory. Returns how many payloads it held.
    pub fn clear(&self) -> io::Result<usize> {
        if !self.root.exists() {
            return Ok(0);
        }
        let count = self.entries()?.len();
        std::fs::remove_dir_all(&self.root)?;
        Ok(count)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}

fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn key_mirrors_host_and_path() {
        let cache = FetchCache::new("/var/cache/eia");
        let u = url("https://www.eia.gov/electricity/data/eia861m/xls/small_scale_solar_2024.xlsx");
        assert_eq!(
            cache.path_for(&u),
            Path::new("/var/cache/eia/www.eia.gov/electricity/data/eia861m/xls/small_scale_solar_2024.xlsx")
        );
        let odd = url("http://127.0.0.1:8080/a/../b%20c/x.xlsx");
        assert_eq!(
            cache.path_for(&odd),
            Path::new("/var/cache/eia/127.0.0.1_8080/b_20c/x.xlsx")
        );
    }

    #[tokio::test]
    async fn put_get_remove() -> Result<()> {
        let dir = tempdir()?;
        let cache = FetchCache::new(dir.path().join("cache"));
        let u = url("https://www.eia.gov/eia860m/archive/xls/august_generator2020.xlsx");

        assert_eq!(cache.get(&u).await?, None);
        let path = cache.put(&u, b"first").await?;
        assert!(path.starts_with(cache.root()));
        cache.put(&u, b"second").await?;
        assert_eq!(cache.get(&u).await?.as_deref(), Some(&b"second"[..]));

        assert!(cache.remove(&u).await?);
        assert!(!cache.remove(&u).await?);
        assert_eq!(cache.get(&u).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn entries_skip_partial_writes_and_clear_removes_all() -> Result<()> {
        let dir = tempdir()?;
        let cache = FetchCache::new(dir.path());
        cache.put(&url("https://h/a/one.xlsx"), b"1").await?;
        cache.put(&url("https://h/b/two.xlsx"), b"22").await?;
        std::fs::write(dir.path().join("h/a/three.xlsx.tmp"), b"partial")?;

        let entries = cache.entries()?;
        let names: Vec<_> = entries
            .iter()
            .map(|e| e.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["one.xlsx", "two.xlsx"]);
        assert_eq!(entries[1].size, 2);

        assert_eq!(cache.clear()?, 2);
        assert!(cache.entries()?.is_empty());
        assert_eq!(cache.clear()?, 0);
        Ok(())
    }
}
