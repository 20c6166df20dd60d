//! Parsing of user-supplied package specifiers.

use crate::npm::{
    is_valid_name_part, is_valid_version, normalize_package_version, validate_package_name,
};
use crate::{Error, Result};

/// A validated top-level request, e.g. `react@18` or `jsr:@luca/flag`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageSpecifier {
    pub name: String,
    /// Tag, range or exact version; `latest` when none was given.
    pub version: String,
    pub registry_prefix: &'static str,
}

/// Parse a command-line style specifier.
///
/// - `jsr:@scope/name@1` selects the JSR registry
/// - `pr:name@commit` selects a pkg.pr.new preview build
/// - `owner/repo#ref` (a slash without a leading `@`) selects GitHub
/// - `npm:name@1` is the same as `name@1`
///
/// Returns `Ok(None)` for an empty name, which callers skip silently.
pub fn parse_package_specifier(raw: &str) -> Result<Option<PackageSpecifier>> {
    let raw = raw.trim();
    let invalid = || Error::InvalidSpecifier(raw.to_string());

    let (spec, registry_prefix) = if let Some(rest) = raw.strip_prefix("jsr:") {
        (rest.to_string(), "jsr/")
    } else if let Some(rest) = raw.strip_prefix("pr:") {
        (rest.to_string(), "pr/")
    } else if let Some(rest) = raw.strip_prefix("npm:") {
        (rest.to_string(), "")
    } else if raw.contains('/') && !raw.starts_with('@') {
        // owner/repo#branch -> owner/repo@branch
        (raw.replacen('#', "@", 1), "gh/")
    } else {
        (raw.to_string(), "")
    };

    let (scope, name_version) = if spec.starts_with('@') || registry_prefix == "gh/" {
        spec.split_once('/').unwrap_or((spec.as_str(), ""))
    } else {
        ("", spec.as_str())
    };
    if name_version.is_empty() {
        return Ok(None);
    }

    let (name, version) = name_version.split_once('@').unwrap_or((name_version, ""));
    let scope_ok = scope.is_empty() || is_valid_name_part(scope.trim_start_matches('@'));
    let version_ok = version.is_empty() || is_valid_version(version);
    if !is_valid_name_part(name) || !scope_ok || !version_ok {
        return Err(invalid());
    }

    let name = if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}/{name}")
    };
    // GitHub `owner/repo` is not an npm name; everything else is
    if registry_prefix != "gh/" && !validate_package_name(&name) {
        return Err(invalid());
    }
    Ok(Some(PackageSpecifier {
        name,
        version: normalize_package_version(version),
        registry_prefix,
    }))
}
