//! The import map model.
//!
//! An [`ImportMap`] is the WHATWG import map plus the CDN-specific `$src`
//! and `config` fields. It is constructed empty or parsed from an existing
//! `<script type="importmap">`, mutated by
//! [`ImportMap::add_packages`](crate::ImportMap::add_packages), and written
//! back with [`ImportMap::format_json`].

mod format;
pub mod html;
pub mod scope;

pub use scope::{ScopeKeys, compare_scope_keys, sort_scope_keys};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{ImportMapConfig, Target};
use crate::fetch::PackageInfo;
use crate::{Error, Result};

/// Specifier to URL bindings.
pub type Imports = IndexMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportMap {
    /// Where the map was loaded from; relative targets resolve against it.
    #[serde(rename = "$src", skip_serializing_if = "String::is_empty")]
    pub src: String,
    #[serde(skip_serializing_if = "is_default_config")]
    pub config: ImportMapConfig,
    pub imports: Imports,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub scopes: IndexMap<String, Imports>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub routes: IndexMap<String, String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub integrity: IndexMap<String, String>,
}

fn is_default_config(config: &ImportMapConfig) -> bool {
    *config == ImportMapConfig::default()
}

impl ImportMap {
    /// An empty map with the given configuration.
    pub fn with_config(config: ImportMapConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Parse the JSON body of an import map script.
    ///
    /// A blank body is an empty map.
    pub fn parse(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(|err| Error::InvalidImportMap(err.to_string()))
    }

    pub fn cdn_origin(&self) -> &str {
        self.config.cdn_origin()
    }

    pub fn target(&self) -> Target {
        self.config.target()
    }

    /// The scope shared by every transitive dependency, `{cdn_origin}/`.
    pub fn cdn_scope_key(&self) -> String {
        format!("{}/", self.cdn_origin())
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty() && self.scopes.values().all(IndexMap::is_empty)
    }

    /// Scope keys, most specific first.
    pub fn sorted_scope_keys(&self) -> ScopeKeys {
        ScopeKeys::new(self.scopes.keys().map(String::as_str))
    }

    /// The two bindings written for `pkg`: its entry module and the
    /// trailing-slash subpath wildcard.
    pub fn package_urls(&self, pkg: &PackageInfo) -> (String, String) {
        let base = pkg.base_url(self.cdn_origin());
        let target = self.target();
        (
            format!("{base}/{target}/{}.mjs", pkg.entry_name()),
            format!("{base}&target={target}/"),
        )
    }

    /// Resolve a bare specifier to a URL.
    ///
    /// With a `referrer`, the most specific scope whose prefix matches it
    /// replaces the global imports for this lookup. Returns the specifier
    /// unchanged and `false` when nothing matches.
    ///
    /// This is narrower than the chain the resolver checks while placing
    /// packages (own scope, then `{cdn}/`, then `imports`): there is no
    /// fallback from the matched scope to shorter scopes or to `imports`. A
    /// referrer under a conflict scope therefore sees only the bindings of
    /// that scope.
    pub fn resolve(&self, specifier: &str, referrer: Option<&str>) -> (String, bool) {
        let specifier = specifier.split_once('#').map_or(specifier, |(path, _)| path);
        let (path, query) = match specifier.split_once('?') {
            Some((path, query)) => (path, format!("?{query}")),
            None => (specifier, String::new()),
        };

        let bindings = referrer
            .and_then(|referrer| self.sorted_scope_keys().find(referrer).map(str::to_string))
            .and_then(|key| self.scopes.get(&key))
            .unwrap_or(&self.imports);

        match self.match_bindings(bindings, path, &query) {
            Some(url) => (url, true),
            None => (format!("{path}{query}"), false),
        }
    }

    fn match_bindings(&self, bindings: &Imports, path: &str, query: &str) -> Option<String> {
        if let Some(url) = bindings.get(path).filter(|url| !url.is_empty()) {
            return Some(format!("{}{query}", self.normalize_url(url)));
        }
        if !path.contains('/') {
            return None;
        }

        let prefix_match = bindings
            .iter()
            .filter(|(key, url)| key.ends_with('/') && !url.is_empty() && path.starts_with(key.as_str()))
            .max_by_key(|(key, _)| key.len());
        if let Some((key, url)) = prefix_match {
            let joined = format!("{url}{}", &path[key.len()..]);
            return Some(format!("{}{query}", self.normalize_url(&joined)));
        }

        // expand `"react": "https://esm.sh/react@18"` to cover `react/...`
        let expand_match = bindings
            .iter()
            .filter(|(key, url)| {
                !key.ends_with('/')
                    && !url.is_empty()
                    && path.len() > key.len()
                    && path.starts_with(key.as_str())
                    && path.as_bytes()[key.len()] == b'/'
            })
            .max_by_key(|(key, _)| key.len());
        expand_match.map(|(key, url)| {
            let (base, bound_query) = url.rsplit_once('?').unwrap_or((url.as_str(), ""));
            let merged = match (bound_query.is_empty(), query.is_empty()) {
                (true, _) => query.to_string(),
                (false, true) => format!("?{bound_query}"),
                (false, false) => format!("?{bound_query}&{}", &query[1..]),
            };
            let joined = format!("{base}{}", &path[key.len()..]);
            format!("{}{merged}", self.normalize_url(&joined))
        })
    }

    fn normalize_url(&self, url: &str) -> String {
        if url.starts_with("./") || url.starts_with("../") {
            if let Some(joined) = Url::parse(&self.src).ok().and_then(|base| base.join(url).ok()) {
                return joined.to_string();
            }
        }
        url.to_string()
    }

    /// Compact canonical JSON, see [`ImportMap::format_json`].
    pub fn to_json(&self) -> String {
        self.format_json(0)
    }
}
