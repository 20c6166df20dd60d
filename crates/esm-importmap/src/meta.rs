//! esm.sh module paths and `?meta` documents.
//!
//! Every binding the resolver writes is a CDN URL of the form
//! `https://esm.sh/[gh/|jsr/|pr/][*]name@version/{target}/{entry}.mjs`. This
//! module parses such URLs back into an [`Import`] (used to read the version
//! out of an existing binding) and models the `?meta` document the CDN serves
//! for a module.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::Target;
use crate::specifier::RegistryKind;
use crate::{Error, Result};

/// Build-target path segments the CDN inserts after `name@version`.
const TARGET_SEGMENTS: &[&str] = &["denonext", "deno", "node"];

/// A module import served by the CDN.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Import {
    pub name: String,
    pub version: String,
    #[serde(rename = "subpath", skip_serializing_if = "String::is_empty")]
    pub sub_path: String,
    /// Registry the CDN routes this import to.
    #[serde(skip)]
    pub registry: RegistryKind,
    /// Requested with the `*` (external-all) modifier.
    #[serde(skip)]
    pub external: bool,
    /// Points at a `.development.mjs` build.
    #[serde(skip)]
    pub dev: bool,
}

impl Import {
    /// The bare specifier of this import, e.g. `jsr:@luca/flag@0.0.1/cli`.
    pub fn specifier(&self, with_version: bool) -> String {
        let mut s = String::new();
        match self.registry {
            RegistryKind::Github => s.push_str("gh:"),
            RegistryKind::Jsr => s.push_str("jsr:"),
            RegistryKind::PkgPrNew => s.push_str("pr:"),
            RegistryKind::Npm | RegistryKind::Url => {}
        }
        s.push_str(&self.name);
        if with_version && !self.version.is_empty() {
            s.push('@');
            s.push_str(&self.version);
        }
        if !self.sub_path.is_empty() {
            s.push('/');
            s.push_str(&self.sub_path);
        }
        s
    }

    pub fn registry_prefix(&self) -> &'static str {
        self.registry.registry_prefix()
    }

    /// The `?meta` URL of this import on `cdn_origin`.
    ///
    /// `es2022` is the CDN's own default, so it is left out of the query.
    pub fn meta_url(&self, cdn_origin: &str, version: &str, target: Option<Target>) -> String {
        let mut url = format!(
            "{cdn_origin}/{}{}{}",
            if self.external { "*" } else { "" },
            self.registry_prefix(),
            self.name
        );
        if !version.is_empty() {
            url.push('@');
            url.push_str(version);
        }
        if !self.sub_path.is_empty() {
            url.push('/');
            url.push_str(&self.sub_path);
        }
        url.push_str("?meta");
        if let Some(target) = target.filter(|t| *t != Target::Es2022) {
            url.push_str("&target=");
            url.push_str(target.as_str());
        }
        url
    }
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.specifier(true))
    }
}

/// The `?meta` document of a module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImportMeta {
    #[serde(flatten)]
    pub import: Import,
    /// Subresource integrity hash, `sha384-...`.
    pub integrity: String,
    pub exports: Vec<String>,
    pub imports: Vec<String>,
    pub peer_imports: Vec<String>,
}

impl ImportMeta {
    /// True when the module imports anything outside its own package, which
    /// is what earns a binding the `*` modifier.
    pub fn has_external_imports(&self) -> bool {
        if !self.peer_imports.is_empty() {
            return true;
        }
        let own_prefix = format!("/{}@", self.import.name);
        self.imports
            .iter()
            .any(|path| !path.starts_with("/node/") && !path.starts_with(&own_prefix))
    }

    /// The package path segment used in CDN URLs, e.g. `*react-dom@19.1.0`.
    pub fn esm_specifier(&self) -> String {
        let mut s = String::from(self.import.registry_prefix());
        if self.has_external_imports() {
            s.push('*');
        }
        s.push_str(&self.import.name);
        s.push('@');
        s.push_str(&self.import.version);
        s
    }
}

/// Parses an [`Import`] out of a CDN pathname or absolute URL.
///
/// ```
/// use esm_importmap::parse_esm_path;
///
/// let import = parse_esm_path("https://esm.sh/*react-dom@19.1.0/es2022/client.mjs").unwrap();
/// assert_eq!(import.name, "react-dom");
/// assert_eq!(import.version, "19.1.0");
/// assert_eq!(import.sub_path, "client");
/// assert!(import.external);
/// ```
pub fn parse_esm_path(path_or_url: &str) -> Result<Import> {
    let invalid = || Error::InvalidUrl(path_or_url.to_string());

    let url = if path_or_url.starts_with("https://") || path_or_url.starts_with("http://") {
        Url::parse(path_or_url).map_err(|_| invalid())?
    } else if path_or_url.starts_with('/') {
        Url::parse(&format!("https://esm.sh{path_or_url}")).map_err(|_| invalid())?
    } else {
        return Err(invalid());
    };

    let mut import = Import::default();
    let mut pathname = url.path();
    for kind in [RegistryKind::Github, RegistryKind::Jsr, RegistryKind::PkgPrNew] {
        let prefix = format!("/{}", kind.registry_prefix());
        if let Some(rest) = pathname.strip_prefix(prefix.as_str()) {
            import.registry = kind;
            pathname = rest;
            break;
        }
    }

    let mut segments = pathname
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".");
    let first = segments.next().ok_or_else(invalid)?;

    // scoped npm names and GitHub `owner/repo` both span two segments
    let two_segments = import.registry == RegistryKind::Github || first.starts_with('@') || first.starts_with("*@");
    let (name, version) = if two_segments {
        let second = segments.next().ok_or_else(invalid)?;
        let (name, version) = split_last_at(second);
        (format!("{first}/{name}"), version)
    } else {
        let (name, version) = split_last_at(first);
        (name.to_string(), version)
    };
    import.external = name.starts_with('*');
    import.name = name.trim_start_matches('*').to_string();
    import.version = version.to_string();

    let rest: Vec<&str> = segments.collect();
    let has_target = rest
        .first()
        .is_some_and(|seg| seg.parse::<Target>().is_ok() || TARGET_SEGMENTS.contains(seg));
    let rest = if has_target { &rest[1..] } else { &rest[..] };
    if rest.is_empty() {
        return Ok(import);
    }

    let joined = rest.join("/");
    if has_target && pathname.ends_with(".mjs") {
        let mut sub_path = joined.trim_end_matches(".mjs");
        if let Some(stripped) = sub_path.strip_suffix(".development") {
            sub_path = stripped;
            import.dev = true;
        }
        // `react/es2022/react.mjs` is the package entry, not a subpath
        let is_entry = sub_path == import.name || import.name.ends_with(&format!("/{sub_path}"));
        if sub_path.contains('/') || !is_entry {
            import.sub_path = sub_path.to_string();
        }
    } else {
        import.sub_path = joined;
    }
    Ok(import)
}

fn split_last_at(segment: &str) -> (&str, &str) {
    match segment.rsplit_once('@') {
        Some((name, version)) if !name.is_empty() => (name, version),
        _ => (segment, ""),
    }
}
