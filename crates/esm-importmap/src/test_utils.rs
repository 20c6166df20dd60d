//! Test utilities for esm-importmap.
//!
//! [`MockRegistry`] stands in for the CDN in resolver and fetcher tests. It
//! answers the two request shapes the fetcher issues:
//!
//! - `{origin}/{prefix}{name}@{range}/package.json`
//! - `{origin}/[*]{prefix}{name}@{version}[/{subpath}]?meta[&target=..]`
//!
//! Ranges and tags resolve to the highest published version that satisfies
//! them, like the real registry. Every request is counted per URL.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use percent_encoding::percent_decode_str;
use rustc_hash::FxHashMap;
use semver::Version;
use serde_json::json;

use crate::fetch::PackageInfo;
use crate::npm::{VersionRange, is_dist_tag, split_package_version};
use crate::registry::{Registry, RegistryResponse};
use crate::Result;

type PackageKey = (&'static str, String);

/// In-process registry serving published manifests.
#[derive(Debug, Default)]
pub struct MockRegistry {
    packages: RwLock<FxHashMap<PackageKey, BTreeMap<String, PackageInfo>>>,
    failures: RwLock<FxHashMap<String, u16>>,
    requests: DashMap<String, usize>,
    total: AtomicUsize,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an npm package.
    pub fn publish(
        self,
        name: &str,
        version: &str,
        dependencies: &[(&str, &str)],
        peer_dependencies: &[(&str, &str)],
    ) -> Self {
        self.publish_to("", name, version, dependencies, peer_dependencies)
    }

    /// Publish a package on the registry selected by `prefix` (`gh/`, `jsr/`).
    pub fn publish_to(
        self,
        prefix: &'static str,
        name: &str,
        version: &str,
        dependencies: &[(&str, &str)],
        peer_dependencies: &[(&str, &str)],
    ) -> Self {
        let to_map = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };
        let info = PackageInfo {
            name: name.to_string(),
            version: version.to_string(),
            dependencies: to_map(dependencies),
            peer_dependencies: to_map(peer_dependencies),
            ..PackageInfo::default()
        };
        self.packages
            .write()
            .entry((prefix, name.to_string()))
            .or_default()
            .insert(version.to_string(), info);
        self
    }

    /// Answer every request for `name` with `status`.
    pub fn fail(&self, name: &str, status: u16) {
        self.failures.write().insert(name.to_string(), status);
    }

    /// Stop failing requests for `name`.
    pub fn recover(&self, name: &str) {
        self.failures.write().remove(name);
    }

    /// Requests received for exactly `url`.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.requests.get(url).map_or(0, |count| *count)
    }

    /// Requests received for any version of `name`.
    pub fn fetch_count_for(&self, name: &str) -> usize {
        let plain = format!("/{name}@");
        let external = format!("*{name}@");
        self.requests
            .iter()
            .filter(|entry| entry.key().contains(&plain) || entry.key().contains(&external))
            .map(|entry| *entry.value())
            .sum()
    }

    pub fn total_fetches(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Highest published version of `prefix{name}` matching `requested`.
    fn resolve(&self, prefix: &'static str, name: &str, requested: &str) -> Option<PackageInfo> {
        let packages = self.packages.read();
        let versions = packages.get(&(prefix, name.to_string()))?;
        if let Some(info) = versions.get(requested) {
            return Some(info.clone());
        }

        let published = versions
            .values()
            .filter_map(|info| Version::parse(&info.version).ok().map(|v| (v, info)));
        let best = if requested.is_empty() || is_dist_tag(requested) {
            published.filter(|(v, _)| v.pre.is_empty()).max_by(|a, b| a.0.cmp(&b.0))
        } else {
            let range = VersionRange::parse(requested)?;
            published
                .filter(|(v, _)| range.matches(v))
                .max_by(|a, b| a.0.cmp(&b.0))
        };
        best.map(|(_, info)| info.clone())
    }

    fn failure(&self, name: &str) -> Option<u16> {
        self.failures.read().get(name).copied()
    }

    fn serve_package(&self, path: &str) -> RegistryResponse {
        let Some(spec) = path.strip_suffix("/package.json") else {
            return not_found();
        };
        let (prefix, spec) = split_prefix(spec);
        let (name, version) = split_package_version(spec);
        if let Some(status) = self.failure(name) {
            return RegistryResponse::new(status, format!("mock failure for {name}"));
        }
        match self.resolve(prefix, name, version) {
            Some(info) => json_response(&json!({
                "name": info.name,
                "version": info.version,
                "dependencies": info.dependencies,
                "peerDependencies": info.peer_dependencies,
                "description": "published by MockRegistry",
            })),
            None => not_found(),
        }
    }

    fn serve_meta(&self, path: &str, query: &str) -> RegistryResponse {
        let path = path.strip_prefix('*').unwrap_or(path);
        let (prefix, spec) = split_prefix(path);
        let (name, rest) = split_package_version(spec);
        let (version, sub_path) = rest.split_once('/').unwrap_or((rest, ""));
        if let Some(status) = self.failure(name) {
            return RegistryResponse::new(status, format!("mock failure for {name}"));
        }
        let Some(info) = self.resolve(prefix, name, version) else {
            return not_found();
        };

        let target = query
            .split('&')
            .find_map(|pair| pair.strip_prefix("target="))
            .unwrap_or("es2022");
        let imports: Vec<String> = info
            .dependencies
            .keys()
            .chain(info.peer_dependencies.keys())
            .map(|dep| format!("/{dep}@latest/{target}/{dep}.mjs"))
            .collect();
        json_response(&json!({
            "name": info.name,
            "version": info.version,
            "subpath": sub_path,
            "integrity": format!("sha384-{}{}", info.name.replace('/', "_"), info.version),
            "exports": ["default"],
            "imports": imports,
            "peerImports": [],
        }))
    }
}

#[async_trait]
impl Registry for MockRegistry {
    async fn get(&self, url: &str) -> Result<RegistryResponse> {
        self.total.fetch_add(1, Ordering::Relaxed);
        *self.requests.entry(url.to_string()).or_default() += 1;
        // give concurrent callers a chance to pile up on the same key
        tokio::task::yield_now().await;

        let path = strip_origin(url);
        let path = percent_decode_str(path).decode_utf8_lossy();
        Ok(match path.split_once('?') {
            Some((path, query)) if query == "meta" || query.starts_with("meta&") => {
                self.serve_meta(path, query)
            }
            Some(_) => not_found(),
            None => self.serve_package(&path),
        })
    }
}

fn strip_origin(url: &str) -> &str {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    rest.split_once('/').map_or("", |(_, path)| path)
}

fn split_prefix(path: &str) -> (&'static str, &str) {
    for prefix in ["gh/", "jsr/", "pr/"] {
        if let Some(rest) = path.strip_prefix(prefix) {
            return (prefix, rest);
        }
    }
    ("", path)
}

fn json_response(value: &serde_json::Value) -> RegistryResponse {
    RegistryResponse::new(200, value.to_string())
}

fn not_found() -> RegistryResponse {
    RegistryResponse::new(404, "Not Found")
}

/// A registry holding the slice of npm the resolver tests exercise.
///
/// Versions and dependency ranges mirror the real packages.
pub fn fixture_registry() -> MockRegistry {
    MockRegistry::new()
        .publish("js-tokens", "1.0.3", &[], &[])
        .publish("js-tokens", "3.0.2", &[], &[])
        .publish("js-tokens", "4.0.0", &[], &[])
        .publish("loose-envify", "1.0.0", &[("js-tokens", "^1.0.0")], &[])
        .publish("loose-envify", "1.1.0", &[("js-tokens", "^1.0.1")], &[])
        .publish("loose-envify", "1.4.0", &[("js-tokens", "^3.0.0 || ^4.0.0")], &[])
        .publish("react", "18.2.0", &[("loose-envify", "^1.1.0")], &[])
        .publish("react", "18.3.1", &[("loose-envify", "^1.1.0")], &[])
        .publish("react", "19.1.0", &[], &[])
        .publish("react", "19.2.0-canary-1", &[], &[])
        .publish("scheduler", "0.23.2", &[("loose-envify", "^1.1.0")], &[])
        .publish("scheduler", "0.26.0", &[], &[])
        .publish(
            "react-dom",
            "18.3.1",
            &[("loose-envify", "^1.1.0"), ("scheduler", "^0.23.2")],
            &[("react", "^18.3.1")],
        )
        .publish(
            "react-dom",
            "19.1.0",
            &[("scheduler", "^0.26.0")],
            &[("react", "^19.1.0")],
        )
        .publish("@preact/signals-core", "1.8.0", &[], &[])
        .publish(
            "@preact/signals",
            "2.0.4",
            &[("@preact/signals-core", "^1.7.0")],
            &[("preact", "10.x")],
        )
        .publish("preact", "10.26.4", &[], &[])
        .publish_to("jsr/", "@luca/flag", "1.0.1", &[], &[])
        .publish_to("gh/", "esm-dev/tiny", "main", &[], &[])
}
