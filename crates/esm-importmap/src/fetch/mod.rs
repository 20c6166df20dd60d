//! Package metadata fetching with two-level caching.
//!
//! Every lookup goes through the same discipline:
//!
//! 1. memory cache, without taking any lock
//! 2. keyed lock on the request URL, so identical concurrent requests
//!    collapse into one network call
//! 3. memory cache again, in case the lock holder before us filled it
//! 4. disk cache, only for exact versions (tags and ranges move upstream)
//! 5. the registry
//!
//! Caches belong to the [`MetadataFetcher`] instance; share one fetcher
//! (behind an `Arc`) to share its caches.

mod cache;
mod keyed_mutex;

pub use cache::{DiskCache, MemoryCache};
pub use keyed_mutex::KeyedMutex;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Target;
use crate::meta::{Import, ImportMeta};
use crate::npm::is_exact_version;
use crate::registry::Registry;
use crate::specifier::RegistryKind;
use crate::{Error, Result};

/// The subset of a `package.json` the resolver needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub dependencies: IndexMap<String, String>,
    pub peer_dependencies: IndexMap<String, String>,
    #[serde(skip)]
    pub kind: RegistryKind,
}

impl PackageInfo {
    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty() || !self.peer_dependencies.is_empty()
    }

    /// `{cdn_origin}/{self}`, the URL every binding of this package starts with.
    pub fn base_url(&self, cdn_origin: &str) -> String {
        format!("{cdn_origin}/{self}")
    }

    /// Last segment of the name; the CDN serves the package entry as
    /// `/{target}/{entry}.mjs`.
    pub fn entry_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

impl fmt::Display for PackageInfo {
    /// The CDN path segment, with the `*` (external-all) modifier when the
    /// package has dependencies, e.g. `*react-dom@18.2.0` or `gh/user/repo@main`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.registry_prefix())?;
        if self.has_dependencies() {
            f.write_str("*")?;
        }
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Fetches package manifests and `?meta` documents from a CDN.
#[derive(Debug)]
pub struct MetadataFetcher {
    registry: Arc<dyn Registry>,
    packages: MemoryCache<PackageInfo>,
    metas: MemoryCache<ImportMeta>,
    locks: KeyedMutex,
    disk: Option<DiskCache>,
    fetches: AtomicUsize,
}

impl MetadataFetcher {
    /// Create a fetcher with the default disk cache at `~/.esm.sh`.
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self {
            registry,
            packages: MemoryCache::default(),
            metas: MemoryCache::default(),
            locks: KeyedMutex::new(),
            disk: DiskCache::default_root().map(DiskCache::new),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Store exact-version documents under `dir` instead.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.disk = Some(DiskCache::new(dir));
        self
    }

    /// Keep documents in memory only.
    pub fn without_disk_cache(mut self) -> Self {
        self.disk = None;
        self
    }

    pub fn disk_cache(&self) -> Option<&DiskCache> {
        self.disk.as_ref()
    }

    /// Number of requests actually sent to the registry.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Fetch `{cdn_origin}/{registry_prefix}{name}@{version}/package.json`.
    ///
    /// `version` may be an exact version, a range or a tag; the returned
    /// manifest always carries the resolved exact version.
    pub async fn fetch_package_info(
        &self,
        cdn_origin: &str,
        registry_prefix: &str,
        name: &str,
        version: &str,
    ) -> Result<PackageInfo> {
        let url = package_url(cdn_origin, registry_prefix, name, version);
        if let Some(info) = self.packages.get(&url) {
            return Ok(info);
        }

        let _guard = self.locks.lock(&url).await;
        if let Some(info) = self.packages.get(&url) {
            debug!(%url, "memory cache hit after lock");
            return Ok(info);
        }

        let kind = RegistryKind::from_prefix(registry_prefix);
        if is_exact_version(version) {
            if let Some(disk) = &self.disk {
                let path = disk.package_path(registry_prefix, name, version);
                if let Some(mut info) = disk.read::<PackageInfo>(&path).await {
                    tag_package(&mut info, kind, name);
                    self.packages.insert(url, info.clone());
                    return Ok(info);
                }
            }
        }

        let body = self
            .get(&url, || Error::PackageNotFound {
                name: name.to_string(),
                version: version.to_string(),
            })
            .await?;
        let mut info: PackageInfo = decode(&url, &body)?;
        tag_package(&mut info, kind, name);
        debug!(%url, version = %info.version, "fetched package manifest");

        if is_exact_version(&info.version) {
            if let Some(disk) = &self.disk {
                let path = disk.package_path(registry_prefix, name, &info.version);
                disk.write(&path, &body).await;
            }
        }

        if info.version != version {
            let resolved = package_url(cdn_origin, registry_prefix, name, &info.version);
            self.packages.insert(resolved, info.clone());
        }
        self.packages.insert(url, info.clone());
        Ok(info)
    }

    /// Fetch the `?meta` document of `import`.
    ///
    /// `target` selects the build the metadata describes; `None` leaves the
    /// choice to the CDN.
    pub async fn fetch_import_meta(
        &self,
        cdn_origin: &str,
        import: &Import,
        target: Option<Target>,
    ) -> Result<ImportMeta> {
        let url = import.meta_url(cdn_origin, &import.version, target);
        if let Some(meta) = self.metas.get(&url) {
            return Ok(meta);
        }

        let _guard = self.locks.lock(&url).await;
        if let Some(meta) = self.metas.get(&url) {
            return Ok(meta);
        }

        let exact = is_exact_version(&import.version);
        if exact {
            if let Some(disk) = &self.disk {
                if let Some(mut meta) = disk.read::<ImportMeta>(&disk.meta_path(&url)).await {
                    tag_meta(&mut meta, import);
                    self.metas.insert(url, meta.clone());
                    return Ok(meta);
                }
            }
        }

        let body = self
            .get(&url, || Error::PackageNotFound {
                name: import.specifier(false),
                version: import.version.clone(),
            })
            .await?;
        let mut meta: ImportMeta = decode(&url, &body)?;
        tag_meta(&mut meta, import);
        debug!(%url, version = %meta.import.version, "fetched import meta");

        if let Some(disk) = &self.disk {
            let resolved = import.meta_url(cdn_origin, &meta.import.version, target);
            if is_exact_version(&meta.import.version) {
                disk.write(&disk.meta_path(&resolved), &body).await;
            }
        }

        if meta.import.version != import.version {
            let resolved = import.meta_url(cdn_origin, &meta.import.version, target);
            self.metas.insert(resolved, meta.clone());
        }
        self.metas.insert(url, meta.clone());
        Ok(meta)
    }

    async fn get(&self, url: &str, not_found: impl FnOnce() -> Error) -> Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let response = self.registry.get(url).await?;
        match response.status {
            200 => Ok(response.body),
            404 => Err(not_found()),
            status => Err(Error::UnexpectedStatus {
                status,
                body: response.text(),
            }),
        }
    }
}

fn package_url(cdn_origin: &str, registry_prefix: &str, name: &str, version: &str) -> String {
    format!("{cdn_origin}/{registry_prefix}{name}@{version}/package.json")
}

fn decode<T: DeserializeOwned>(url: &str, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|err| Error::Decode {
        url: url.to_string(),
        message: err.to_string(),
    })
}

fn tag_package(info: &mut PackageInfo, kind: RegistryKind, requested_name: &str) {
    info.kind = kind;
    // the CDN reports jsr packages under their npm bridge name
    if kind == RegistryKind::Jsr || info.name.is_empty() {
        info.name = requested_name.to_string();
    }
}

fn tag_meta(meta: &mut ImportMeta, import: &Import) {
    meta.import.name = import.name.clone();
    meta.import.registry = import.registry;
}
