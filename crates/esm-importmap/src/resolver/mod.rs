//! Dependency graph resolution into an import map.
//!
//! [`ImportMap::add_packages`] walks the dependency graph breadth first.
//! Manifests for a whole level are fetched concurrently, then placement
//! decisions are applied one by one, in a fixed order, by the single owner
//! of the map. Nothing but the fetcher is shared between tasks, and the
//! result does not depend on network timing.
//!
//! Placement rules for a dependency `d` of a package `p`:
//!
//! | existing binding seen by `p`      | `d` is a peer        | `d` is regular               |
//! |-----------------------------------|----------------------|------------------------------|
//! | satisfies `d`                     | nothing              | nothing                      |
//! | does not satisfy `d`              | warning              | scope `{cdn}/{p}/`           |
//! | none                              | global `imports`     | scope `{cdn}/`               |
//!
//! The binding `p` sees is the first of: its own scope `{cdn}/{p}/`, the
//! shared `{cdn}/` scope, then the global imports, which is the order a
//! browser consults for a module served from under `{cdn}/{p}/`.
//!
//! A regular dependency with no binding always goes to the shared `{cdn}/`
//! scope, even when `p` itself sits in a conflict scope. Every module served
//! from the CDN falls under `{cdn}/`, so the binding is visible to any later
//! parent that needs the same version, and the conflict scope keeps only the
//! bindings that differ.

mod deps;
mod input;
mod tidy;

pub use deps::{Dependency, resolve_dependencies};
pub use input::{PackageSpecifier, parse_package_specifier};

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::fetch::{MetadataFetcher, PackageInfo};
use crate::import_map::{ImportMap, Imports};
use crate::meta::parse_esm_path;
use crate::npm::{is_exact_version, satisfies};
use crate::specifier::RegistryKind;
use crate::{Error, Result};

/// Upper bound on manifest requests in flight.
const MAX_CONCURRENT_FETCHES: usize = 16;

/// What one [`ImportMap::add_packages`] call did.
#[derive(Debug, Default)]
pub struct AddPackagesOutcome {
    /// Manifests of the requested packages that were bound, in input order.
    pub added: Vec<PackageInfo>,
    /// Unmet peer dependencies.
    pub warnings: Vec<String>,
    /// Per-specifier failures; siblings are unaffected.
    pub errors: Vec<Error>,
}

impl AddPackagesOutcome {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Where a binding is written.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Placement {
    Imports,
    Scope(String),
}

/// `(registry prefix, name, version)` of a manifest request.
type FetchKey = (&'static str, String, String);

impl ImportMap {
    /// Resolve `specifiers` and their dependency graphs into this map.
    ///
    /// Requested packages are bound in the global imports, replacing earlier
    /// bindings of the same name. Invalid specifiers and failed fetches are
    /// collected in [`AddPackagesOutcome::errors`] without stopping the rest.
    pub async fn add_packages<I, S>(
        &mut self,
        fetcher: &Arc<MetadataFetcher>,
        specifiers: I,
    ) -> AddPackagesOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut outcome = AddPackagesOutcome::default();
        let cdn_origin = self.cdn_origin().to_string();

        let mut requests = Vec::new();
        for raw in specifiers {
            match parse_package_specifier(raw.as_ref()) {
                Ok(Some(spec)) => requests.push(spec),
                Ok(None) => {}
                Err(err) => outcome.errors.push(err),
            }
        }

        let keys: Vec<FetchKey> = requests
            .iter()
            .map(|spec| (spec.registry_prefix, spec.name.clone(), spec.version.clone()))
            .collect();
        let mut fetched = fetch_all(fetcher, &cdn_origin, keys.clone()).await;

        let mut level = Vec::new();
        for key in keys {
            match fetched.remove(&key) {
                Some(Ok(pkg)) => {
                    self.place(&pkg.name, &pkg, &Placement::Imports);
                    info!(package = %pkg, "added");
                    level.push(pkg.clone());
                    outcome.added.push(pkg);
                }
                Some(Err(err)) => outcome.errors.push(err),
                // duplicate specifier, already handled
                None => {}
            }
        }

        let mut walked = FxHashSet::default();
        level.retain(|pkg| walked.insert(pkg.to_string()));
        while !level.is_empty() {
            level = self
                .resolve_level(fetcher, &cdn_origin, level, &mut walked, &mut outcome)
                .await;
        }

        self.scopes.retain(|_, bindings| !bindings.is_empty());
        outcome
    }

    /// Place the dependencies of every package in `level`; returns the newly
    /// placed packages whose dependencies still need walking.
    async fn resolve_level(
        &mut self,
        fetcher: &Arc<MetadataFetcher>,
        cdn_origin: &str,
        level: Vec<PackageInfo>,
        walked: &mut FxHashSet<String>,
        outcome: &mut AddPackagesOutcome,
    ) -> Vec<PackageInfo> {
        let mut edges = Vec::new();
        for parent in level {
            let (deps, errors) = resolve_dependencies(&parent);
            outcome.errors.extend(errors);
            let parent_scope = format!("{cdn_origin}/{parent}/");
            edges.extend(deps.into_iter().map(|dep| (parent_scope.clone(), dep)));
        }

        let mut keys: Vec<FetchKey> = Vec::new();
        for (parent_scope, dep) in &edges {
            let needs_fetch = match self.lookup(parent_scope, &dep.specifier) {
                Some(url) => !dep.peer && !self.binding_satisfies(url, dep, None),
                None => true,
            };
            let key = fetch_key(dep);
            if needs_fetch && !keys.contains(&key) {
                keys.push(key);
            }
        }
        let mut fetched = fetch_all(fetcher, cdn_origin, keys).await;

        let mut next = Vec::new();
        for (parent_scope, dep) in edges {
            let existing = self.lookup(&parent_scope, &dep.specifier).map(str::to_string);
            let key = fetch_key(&dep);

            if let Some(url) = &existing {
                let resolved = fetched.get(&key).and_then(|r| r.as_ref().ok());
                if self.binding_satisfies(url, &dep, resolved) {
                    continue;
                }
                if dep.peer {
                    let current = parse_esm_path(url).map(|i| i.version).unwrap_or_default();
                    outcome.warnings.push(format!(
                        "incorrect peer dependency {}@{current} (unmet {})",
                        dep.specifier, dep.version
                    ));
                    continue;
                }
            }

            let pkg = match fetched.get(&key) {
                Some(Ok(pkg)) => pkg.clone(),
                Some(Err(_)) => {
                    if let Some(Err(err)) = fetched.remove(&key) {
                        outcome.errors.push(err);
                    }
                    continue;
                }
                // failure already reported for this request
                None => continue,
            };

            let placement = match (&existing, dep.peer) {
                (Some(_), _) => Placement::Scope(parent_scope),
                (None, true) => Placement::Imports,
                (None, false) => Placement::Scope(self.cdn_scope_key()),
            };
            self.place(&dep.specifier, &pkg, &placement);
            if walked.insert(pkg.to_string()) {
                next.push(pkg);
            }
        }
        next
    }

    /// The binding of `key` as seen from modules under `parent_scope`.
    fn lookup(&self, parent_scope: &str, key: &str) -> Option<&str> {
        let cdn_scope = self.cdn_scope_key();
        [parent_scope, cdn_scope.as_str()]
            .into_iter()
            .find_map(|scope| self.scopes.get(scope).and_then(|b| b.get(key)))
            .or_else(|| self.imports.get(key))
            .map(String::as_str)
            .filter(|url| !url.is_empty())
    }

    /// Whether an existing binding can stand in for `dep`.
    ///
    /// Bindings that do not point at this CDN are user overrides and always
    /// count as satisfied.
    fn binding_satisfies(&self, url: &str, dep: &Dependency, resolved: Option<&PackageInfo>) -> bool {
        let cdn_prefix = self.cdn_scope_key();
        if !url.starts_with(&cdn_prefix) {
            return true;
        }
        let Ok(bound) = parse_esm_path(url) else {
            return true;
        };
        let bound_kind = match bound.registry {
            RegistryKind::Url => RegistryKind::Npm,
            kind => kind,
        };
        let dep_kind = match dep.kind {
            RegistryKind::Url => RegistryKind::Npm,
            kind => kind,
        };
        if bound.name != dep.name || bound_kind != dep_kind {
            return false;
        }

        bound.version == dep.version
            || resolved.is_some_and(|pkg| pkg.version == bound.version)
            || (is_exact_version(&bound.version) && satisfies(&bound.version, &dep.version))
    }

    /// Write the entry and subpath bindings of `pkg` under `key`.
    fn place(&mut self, key: &str, pkg: &PackageInfo, placement: &Placement) {
        let (entry, subpath) = self.package_urls(pkg);
        let slash_key = format!("{key}/");
        debug!(%key, package = %pkg, ?placement, "placing");
        match placement {
            Placement::Imports => {
                // a direct binding must not be shadowed by a stale transitive one
                let cdn_scope = self.cdn_scope_key();
                if let Some(bindings) = self.scopes.get_mut(&cdn_scope) {
                    bindings.shift_remove(key);
                    bindings.shift_remove(&slash_key);
                }
                self.imports.insert(key.to_string(), entry);
                self.imports.insert(slash_key, subpath);
            }
            Placement::Scope(scope) => {
                let bindings: &mut Imports = self.scopes.entry(scope.clone()).or_default();
                bindings.insert(key.to_string(), entry);
                bindings.insert(slash_key, subpath);
            }
        }
    }
}

fn fetch_key(dep: &Dependency) -> FetchKey {
    (dep.registry_prefix(), dep.name.clone(), dep.version.clone())
}

/// Fetch every manifest in `keys` concurrently.
async fn fetch_all(
    fetcher: &Arc<MetadataFetcher>,
    cdn_origin: &str,
    keys: Vec<FetchKey>,
) -> FxHashMap<FetchKey, Result<PackageInfo>> {
    let mut results = FxHashMap::default();
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_FETCHES));
    let mut join_set = JoinSet::new();

    for key in keys {
        if results.contains_key(&key) {
            continue;
        }
        // replaced when the task reports back
        results.insert(key.clone(), Err(Error::Task(format!("{}{}@{} did not complete", key.0, key.1, key.2))));

        let fetcher = Arc::clone(fetcher);
        let semaphore = Arc::clone(&semaphore);
        let cdn_origin = cdn_origin.to_string();
        join_set.spawn(async move {
            let result = match semaphore.acquire().await {
                Ok(_permit) => {
                    let (prefix, name, version) = &key;
                    fetcher.fetch_package_info(&cdn_origin, prefix, name, version).await
                }
                Err(err) => Err(Error::Task(err.to_string())),
            };
            (key, result)
        });
    }

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((key, result)) => {
                results.insert(key, result);
            }
            Err(join_err) => {
                // the key is lost with the task; its placeholder error stays
                debug!(%join_err, "fetch task failed");
            }
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(name: &str, version: &str) -> PackageInfo {
        PackageInfo {
            name: name.to_string(),
            version: version.to_string(),
            ..PackageInfo::default()
        }
    }

    fn dep(name: &str, version: &str) -> Dependency {
        Dependency {
            specifier: name.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            peer: false,
            kind: RegistryKind::Npm,
        }
    }

    #[test]
    fn test_binding_satisfies() {
        let im = ImportMap::default();
        let url = "https://esm.sh/*loose-envify@1.1.0/es2024/loose-envify.mjs";
        assert!(im.binding_satisfies(url, &dep("loose-envify", "^1.1.0"), None));
        assert!(im.binding_satisfies(url, &dep("loose-envify", "1.1.0"), None));
        assert!(!im.binding_satisfies(url, &dep("loose-envify", "^2.0.0"), None));
        assert!(!im.binding_satisfies(url, &dep("other", "^1.1.0"), None));
        assert!(im.binding_satisfies(
            url,
            &dep("loose-envify", "latest"),
            Some(&pkg("loose-envify", "1.1.0"))
        ));
        assert!(im.binding_satisfies("./vendor/loose-envify.js", &dep("loose-envify", "^9"), None));
    }

    #[test]
    fn test_lookup_order() {
        let mut im = ImportMap::default();
        im.imports.insert("a".into(), "https://esm.sh/a@1.0.0/es2024/a.mjs".into());
        assert_eq!(im.lookup("https://esm.sh/*p@1.0.0/", "a"), Some("https://esm.sh/a@1.0.0/es2024/a.mjs"));

        im.place("a", &pkg("a", "2.0.0"), &Placement::Scope("https://esm.sh/".into()));
        assert_eq!(im.lookup("https://esm.sh/*p@1.0.0/", "a"), Some("https://esm.sh/a@2.0.0/es2024/a.mjs"));

        im.place("a", &pkg("a", "3.0.0"), &Placement::Scope("https://esm.sh/*p@1.0.0/".into()));
        assert_eq!(im.lookup("https://esm.sh/*p@1.0.0/", "a"), Some("https://esm.sh/a@3.0.0/es2024/a.mjs"));
        assert_eq!(im.lookup("https://esm.sh/*q@1.0.0/", "a"), Some("https://esm.sh/a@2.0.0/es2024/a.mjs"));
    }

    #[test]
    fn test_direct_placement_clears_transitive_binding() {
        let mut im = ImportMap::default();
        im.place("a", &pkg("a", "1.0.0"), &Placement::Scope("https://esm.sh/".into()));
        im.place("a", &pkg("a", "1.0.0"), &Placement::Imports);
        assert!(im.scopes["https://esm.sh/"].is_empty());
        assert_eq!(im.imports["a/"], "https://esm.sh/a@1.0.0&target=es2024/");
    }
}
