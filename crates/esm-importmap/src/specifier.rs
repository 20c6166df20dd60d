//! Dependency version specifier parsing.
//!
//! A manifest's dependency map may point somewhere other than the npm
//! registry: `"react": "npm:react@19.0.0"`, `"flag": "jsr:@luca/flag@0.0.1"`,
//! `"lib": "github:user/repo#semver:1.2.3"` or a pkg.pr.new preview URL.
//! [`parse_dependency_version`] turns such a string into a [`PackageRef`] the
//! fetcher can route to the right registry prefix.

use std::fmt;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::npm::split_package_version;
use crate::{Error, Result};

const JSR_BRIDGE_SCOPE: &str = "@jsr/";

/// The upstream registry a package is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegistryKind {
    #[default]
    Npm,
    Github,
    Jsr,
    PkgPrNew,
    Url,
}

impl RegistryKind {
    /// The CDN path segment selecting this registry.
    pub fn registry_prefix(self) -> &'static str {
        match self {
            RegistryKind::Github => "gh/",
            RegistryKind::Jsr => "jsr/",
            RegistryKind::PkgPrNew => "pr/",
            RegistryKind::Npm | RegistryKind::Url => "",
        }
    }

    /// Inverse of [`RegistryKind::registry_prefix`] for the prefixes the CDN routes.
    pub fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "gh/" => RegistryKind::Github,
            "jsr/" => RegistryKind::Jsr,
            "pr/" => RegistryKind::PkgPrNew,
            _ => RegistryKind::Npm,
        }
    }
}

/// A reference to a package on one of the supported registries.
///
/// The zero value (empty name) means "not a special specifier": the raw
/// string is a plain semver range or tag for the npm registry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackageRef {
    pub name: String,
    pub version: String,
    pub kind: RegistryKind,
}

impl PackageRef {
    fn new(name: impl Into<String>, version: impl Into<String>, kind: RegistryKind) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            kind,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// The name the CDN serves the package under.
    ///
    /// JSR packages are parsed into the npm bridge form `@jsr/scope__name`;
    /// the CDN addresses them as `jsr/@scope/name`.
    pub fn cdn_name(&self) -> String {
        match (self.kind, self.name.strip_prefix(JSR_BRIDGE_SCOPE)) {
            (RegistryKind::Jsr, Some(bridged)) => format!("@{}", bridged.replacen("__", "/", 1)),
            _ => self.name.clone(),
        }
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}@{}",
            self.kind.registry_prefix(),
            self.cdn_name(),
            self.version
        )
    }
}

/// Resolves the version string of a dependency into a package reference.
///
/// e.g. "react": "npm:react@19.0.0"
/// e.g. "react": "github:facebook/react#semver:19.0.0"
/// e.g. "flag": "jsr:@luca/flag@0.0.1"
/// e.g. "tinybench": "https://pkg.pr.new/tinybench@a832a55"
pub fn parse_dependency_version(raw: &str) -> Result<PackageRef> {
    if raw.starts_with("file:") {
        return Err(Error::UnsupportedDependency("file"));
    }

    if let Some(rest) = raw.strip_prefix("npm:") {
        let (name, version) = split_package_version(rest);
        return Ok(PackageRef::new(name, version, RegistryKind::Npm));
    }

    if let Some(rest) = raw.strip_prefix("jsr:") {
        let (name, version) = split_package_version(rest);
        let bridged = name
            .strip_prefix('@')
            .and_then(|scoped| scoped.split_once('/'))
            .filter(|(scope, name)| !scope.is_empty() && !name.is_empty())
            .map(|(scope, name)| format!("{JSR_BRIDGE_SCOPE}{scope}__{name}"))
            .ok_or_else(|| Error::InvalidSpecifier(format!("invalid jsr dependency: {raw}")))?;
        return Ok(PackageRef::new(bridged, version, RegistryKind::Jsr));
    }

    if let Some(rest) = raw.strip_prefix("github:") {
        let (repo, fragment) = rest.rsplit_once('#').unwrap_or((rest, ""));
        return Ok(PackageRef::new(
            repo,
            github_ref(fragment),
            RegistryKind::Github,
        ));
    }

    if raw.starts_with("git+ssh://") || raw.starts_with("git+https://") || raw.starts_with("git://") {
        return parse_git_url(raw);
    }

    if raw.starts_with("https://") || raw.starts_with("http://") {
        return parse_pkg_pr_new_url(raw);
    }

    // see https://docs.npmjs.com/cli/v10/configuring-npm/package-json#git-urls-as-dependencies
    if !raw.starts_with('@') && raw.contains('/') {
        let (repo, fragment) = raw.rsplit_once('#').unwrap_or((raw, ""));
        return Ok(PackageRef::new(
            repo,
            github_ref(fragment),
            RegistryKind::Github,
        ));
    }

    Ok(PackageRef {
        version: raw.to_string(),
        ..PackageRef::default()
    })
}

fn github_ref(fragment: &str) -> String {
    let decoded = percent_decode_str(fragment).decode_utf8_lossy();
    decoded
        .strip_prefix("semver:")
        .unwrap_or(decoded.as_ref())
        .to_string()
}

fn parse_git_url(raw: &str) -> Result<PackageRef> {
    // scp-like ssh URLs (`git@github.com:owner/repo.git`) put the repo path where
    // a port would be; rewrite the colon so the path parses like the https form
    let normalized = match raw.strip_prefix("git+ssh://") {
        Some(rest) => match rest.split_once(':') {
            Some((authority, path)) if !path.starts_with(|c: char| c.is_ascii_digit()) => {
                format!("git+ssh://{authority}/{path}")
            }
            _ => raw.to_string(),
        },
        None => raw.to_string(),
    };

    let url = Url::parse(&normalized).map_err(|_| Error::UnsupportedDependency("git"))?;
    if url.host_str() != Some("github.com") {
        return Err(Error::UnsupportedDependency("git"));
    }
    let path = url.path().trim_start_matches('/');
    let repo = path.strip_suffix(".git").unwrap_or(path);
    if repo.is_empty() {
        return Err(Error::UnsupportedDependency("git"));
    }
    Ok(PackageRef::new(
        repo,
        github_ref(url.fragment().unwrap_or_default()),
        RegistryKind::Github,
    ))
}

fn parse_pkg_pr_new_url(raw: &str) -> Result<PackageRef> {
    let url = Url::parse(raw).map_err(|_| Error::UnsupportedDependency("http"))?;
    if url.host_str() != Some("pkg.pr.new") {
        return Err(Error::UnsupportedDependency("http"));
    }
    let path = url.path().trim_start_matches('/');
    let (name, rest) = path
        .rsplit_once('@')
        .ok_or(Error::UnsupportedDependency("http"))?;
    let version = rest.split('/').next().unwrap_or_default();
    if name.is_empty() || version.is_empty() {
        return Err(Error::UnsupportedDependency("http"));
    }
    Ok(PackageRef::new(name, version, RegistryKind::PkgPrNew))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_npm_alias() {
        let pkg = parse_dependency_version("npm:lodash@4.17.21").unwrap();
        assert_eq!(pkg, PackageRef::new("lodash", "4.17.21", RegistryKind::Npm));
        assert_eq!(pkg.to_string(), "lodash@4.17.21");

        let scoped = parse_dependency_version("npm:@preact/signals@^1.2.0").unwrap();
        assert_eq!(scoped.name, "@preact/signals");
        assert_eq!(scoped.version, "^1.2.0");
    }

    #[test]
    fn test_jsr_bridge_name() {
        let pkg = parse_dependency_version("jsr:@luca/flag@0.0.1").unwrap();
        assert_eq!(pkg.name, "@jsr/luca__flag");
        assert_eq!(pkg.kind, RegistryKind::Jsr);
        assert_eq!(pkg.cdn_name(), "@luca/flag");
        assert_eq!(pkg.to_string(), "jsr/@luca/flag@0.0.1");
    }

    #[test]
    fn test_jsr_requires_scope() {
        assert!(matches!(
            parse_dependency_version("jsr:flag@0.0.1"),
            Err(Error::InvalidSpecifier(_))
        ));
        assert!(parse_dependency_version("jsr:@luca@0.0.1").is_err());
    }

    #[test]
    fn test_github_shorthand() {
        let pkg = parse_dependency_version("github:user/repo#v1.2.3").unwrap();
        assert_eq!(pkg, PackageRef::new("user/repo", "v1.2.3", RegistryKind::Github));
        assert_eq!(pkg.to_string(), "gh/user/repo@v1.2.3");

        let semver = parse_dependency_version("github:facebook/react#semver:19.0.0").unwrap();
        assert_eq!(semver.version, "19.0.0");

        let encoded = parse_dependency_version("github:user/repo#semver%3A%5E1.0.0").unwrap();
        assert_eq!(encoded.version, "^1.0.0");
    }

    #[test]
    fn test_bare_owner_repo() {
        let pkg = parse_dependency_version("user/repo#main").unwrap();
        assert_eq!(pkg, PackageRef::new("user/repo", "main", RegistryKind::Github));
    }

    #[test]
    fn test_git_urls() {
        let https = parse_dependency_version("git+https://github.com/user/repo.git#v2.0.0").unwrap();
        assert_eq!(https, PackageRef::new("user/repo", "v2.0.0", RegistryKind::Github));

        let git = parse_dependency_version("git://github.com/user/repo.git#semver:1.0.0").unwrap();
        assert_eq!(git, PackageRef::new("user/repo", "1.0.0", RegistryKind::Github));

        let ssh = parse_dependency_version("git+ssh://git@github.com:user/repo.git#main").unwrap();
        assert_eq!(ssh, PackageRef::new("user/repo", "main", RegistryKind::Github));

        assert!(matches!(
            parse_dependency_version("git+https://gitlab.com/user/repo.git"),
            Err(Error::UnsupportedDependency("git"))
        ));
    }

    #[test]
    fn test_pkg_pr_new() {
        let pkg = parse_dependency_version("https://pkg.pr.new/tinybench@a832a55").unwrap();
        assert_eq!(pkg, PackageRef::new("tinybench", "a832a55", RegistryKind::PkgPrNew));
        assert_eq!(pkg.to_string(), "pr/tinybench@a832a55");

        let scoped = parse_dependency_version("https://pkg.pr.new/@vitejs/plugin-react@1234/dist").unwrap();
        assert_eq!(scoped.name, "@vitejs/plugin-react");
        assert_eq!(scoped.version, "1234");

        assert!(matches!(
            parse_dependency_version("https://example.com/pkg@1.0.0"),
            Err(Error::UnsupportedDependency("http"))
        ));
    }

    #[test]
    fn test_file_dependencies_are_rejected() {
        assert!(matches!(
            parse_dependency_version("file:../local"),
            Err(Error::UnsupportedDependency("file"))
        ));
    }

    #[test]
    fn test_plain_ranges_are_not_special() {
        let pkg = parse_dependency_version("^18.2.0").unwrap();
        assert!(pkg.is_empty());
        assert_eq!(pkg.version, "^18.2.0");

        assert!(parse_dependency_version("").unwrap().is_empty());
        assert!(parse_dependency_version("@scope/name").unwrap().is_empty());
    }
}
