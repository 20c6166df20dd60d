//! Rebuilding an import map from its own direct bindings.

use std::sync::Arc;

use tracing::debug;

use super::AddPackagesOutcome;
use crate::fetch::MetadataFetcher;
use crate::import_map::{ImportMap, Imports};
use crate::meta::{Import, parse_esm_path};
use crate::specifier::RegistryKind;

impl ImportMap {
    /// Re-resolve every package bound to this map's CDN in `imports` and
    /// rebuild the map from scratch.
    ///
    /// Bindings that do not point at the CDN, aliases and scopes outside the
    /// CDN are kept as written. CDN scopes are dropped and regenerated, so
    /// stale conflict scopes left by earlier resolutions disappear.
    pub async fn tidy(&mut self, fetcher: &Arc<MetadataFetcher>) -> AddPackagesOutcome {
        let cdn_prefix = self.cdn_scope_key();

        let readded: Vec<(&String, String)> = self
            .imports
            .iter()
            .filter(|(_, url)| url.starts_with(&cdn_prefix))
            .filter_map(|(key, url)| readd_specifier(key, url).map(|spec| (key, spec)))
            .collect();

        let mut kept = Imports::default();
        for (key, url) in &self.imports {
            let bare = key.strip_suffix('/').unwrap_or(key);
            // a re-added package regenerates its subpath wildcard too
            if readded.iter().any(|(k, _)| k.as_str() == bare) {
                continue;
            }
            kept.insert(key.clone(), url.clone());
        }
        let mut specifiers: Vec<String> = readded.into_iter().map(|(_, spec)| spec).collect();
        specifiers.sort();
        specifiers.dedup();
        debug!(count = specifiers.len(), "re-resolving packages");

        let scopes = std::mem::take(&mut self.scopes)
            .into_iter()
            .filter(|(scope, _)| !scope.starts_with(&cdn_prefix))
            .collect();

        *self = ImportMap {
            src: std::mem::take(&mut self.src),
            config: std::mem::take(&mut self.config),
            imports: kept,
            scopes,
            routes: std::mem::take(&mut self.routes),
            integrity: std::mem::take(&mut self.integrity),
        };
        self.add_packages(fetcher, specifiers).await
    }
}

/// The `add` specifier that recreates the binding `key -> url`, if the
/// binding is a plain package entry.
fn readd_specifier(key: &str, url: &str) -> Option<String> {
    if key.ends_with('/') {
        return None;
    }
    let import = parse_esm_path(url).ok()?;
    if import.name != key || import.version.is_empty() || !import.sub_path.is_empty() {
        return None;
    }
    Some(add_specifier(&import))
}

fn add_specifier(import: &Import) -> String {
    match import.registry {
        RegistryKind::Jsr => format!("jsr:{}@{}", import.name, import.version),
        RegistryKind::PkgPrNew => format!("pr:{}@{}", import.name, import.version),
        _ => format!("{}@{}", import.name, import.version),
    }
}
