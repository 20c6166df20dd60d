//! Dependency lists of a fetched manifest.

use indexmap::IndexMap;

use crate::fetch::PackageInfo;
use crate::specifier::{RegistryKind, parse_dependency_version};
use crate::{Error, Result};

/// One edge of the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Import map key, the dependency map key of the manifest. Differs from
    /// `name` for aliases such as `"foo": "npm:bar@1"`.
    pub specifier: String,
    /// Package name as served by the CDN.
    pub name: String,
    /// Requested tag, range or exact version.
    pub version: String,
    pub peer: bool,
    pub kind: RegistryKind,
}

impl Dependency {
    fn parse(specifier: &str, raw_version: &str, peer: bool) -> Result<Self> {
        let pkg = parse_dependency_version(raw_version)?;
        let (name, version, kind) = if pkg.is_empty() {
            (specifier.to_string(), raw_version.to_string(), RegistryKind::Npm)
        } else {
            (pkg.cdn_name(), pkg.version.clone(), pkg.kind)
        };
        Ok(Self {
            specifier: specifier.to_string(),
            name,
            version: if version.is_empty() { "latest".to_string() } else { version },
            peer,
            kind,
        })
    }

    pub fn registry_prefix(&self) -> &'static str {
        self.kind.registry_prefix()
    }
}

/// Peer dependencies first, then regular ones, each sorted by key.
///
/// A key listed in both maps is treated as a regular dependency. Entries the
/// CDN cannot serve are reported and skipped.
pub fn resolve_dependencies(pkg: &PackageInfo) -> (Vec<Dependency>, Vec<Error>) {
    let mut errors = Vec::new();
    let mut parse_all = |deps: &IndexMap<String, String>, peer: bool| {
        let mut keys: Vec<&String> = deps.keys().collect();
        keys.sort();
        keys.into_iter()
            .filter_map(|key| match Dependency::parse(key, &deps[key], peer) {
                Ok(dep) => Some(dep),
                Err(err) => {
                    errors.push(err);
                    None
                }
            })
            .collect::<Vec<_>>()
    };

    let peers = parse_all(&pkg.peer_dependencies, true);
    let regular = parse_all(&pkg.dependencies, false);

    let mut deps: Vec<Dependency> = peers
        .into_iter()
        .filter(|peer| !regular.iter().any(|dep| dep.specifier == peer.specifier))
        .collect();
    deps.extend(regular);
    (deps, errors)
}
