//! Memory and disk caches for registry documents.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// In-process cache keyed by request URL.
#[derive(Debug)]
pub struct MemoryCache<T> {
    entries: DashMap<String, T>,
}

impl<T> Default for MemoryCache<T> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<T: Clone> MemoryCache<T> {
    pub fn get(&self, url: &str) -> Option<T> {
        self.entries.get(url).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, url: impl Into<String>, value: T) {
        self.entries.insert(url.into(), value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// On-disk cache for documents of exact versions.
///
/// Layout under the cache root:
///
/// ```text
/// registry/{prefix}{name}@{version}.json   package manifests
/// meta/{sha256(url)}                       ?meta documents
/// ```
///
/// Every operation is best effort: read and write failures are logged and
/// treated as a miss.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `~/.esm.sh`, or `None` when there is no home directory.
    pub fn default_root() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".esm.sh"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn package_path(&self, registry_prefix: &str, name: &str, version: &str) -> PathBuf {
        self.root
            .join("registry")
            .join(format!("{registry_prefix}{name}@{version}.json"))
    }

    pub fn meta_path(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        self.root.join("meta").join(format!("{digest:x}"))
    }

    /// Read and decode `path`; a file that fails to decode is removed.
    pub async fn read<T: DeserializeOwned>(&self, path: &Path) -> Option<T> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                debug!(path = %path.display(), %err, "disk cache unreadable");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                debug!(path = %path.display(), "disk cache hit");
                Some(value)
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "removing corrupt cache file");
                let _ = tokio::fs::remove_file(path).await;
                None
            }
        }
    }

    pub async fn write(&self, path: &Path, bytes: &[u8]) {
        if let Some(parent) = path.parent() {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                debug!(path = %parent.display(), %err, "could not create cache directory");
                return;
            }
        }
        if let Err(err) = tokio::fs::write(path, bytes).await {
            debug!(path = %path.display(), %err, "could not write cache file");
        }
    }
}
