//! npm naming and versioning rules.
//!
//! Package names and versions arrive from user input and from third-party
//! manifests, so everything here is a pure string check. Ranges are lowered
//! onto `semver::VersionReq`, which speaks Cargo's dialect: bare versions
//! become `=`, bare partials become wildcards and `||` is split into
//! alternatives.

use semver::{Version, VersionReq};

const MAX_NAME_LEN: usize = 214;

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '+' | '$' | '!')
}

fn is_version_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '+')
}

fn is_range_char(c: char) -> bool {
    matches!(c, '^' | '~' | '<' | '>' | '=' | '*' | '|' | ' ')
}

/// Checks one segment of a package name (`react`, or `types` of `@types/node`).
pub fn is_valid_name_part(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_name_char)
}

/// Checks a version, tag or range given on the command line.
///
/// Looser than the name grammar: range sigils and spaces are admitted so that
/// `react@^18` and `react@>=18 <19` reach the registry untouched.
pub fn is_valid_version(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| is_version_char(c) || is_range_char(c))
}

/// Validates a full package name, scoped or not.
/// based on https://github.com/npm/validate-npm-package-name
pub fn validate_package_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return false;
    }
    if let Some(scoped) = name.strip_prefix('@') {
        return match scoped.split_once('/') {
            Some((scope, name)) => is_valid_name_part(scope) && is_valid_name_part(name),
            None => false,
        };
    }
    is_valid_name_part(name)
}

/// Returns true for `MAJOR.MINOR.PATCH[-prerelease][+build]`.
pub fn is_exact_version(version: &str) -> bool {
    let mut parts = version.splitn(3, '.');
    let (Some(major), Some(minor), Some(patch)) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if !is_numeric(major) || !is_numeric(minor) || patch.is_empty() {
        return false;
    }

    let split = patch.find(['-', '+']);
    let (digits, suffix) = match split {
        Some(i) => (&patch[..i], &patch[i..]),
        None => (patch, ""),
    };
    if !is_numeric(digits) {
        return false;
    }
    if suffix.is_empty() {
        return true;
    }
    // the suffix must carry something after its sigil
    suffix.len() > 1
        && suffix[1..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '+'))
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Returns true if the given version is a distribution tag.
/// https://docs.npmjs.com/cli/v9/commands/npm-dist-tag
pub fn is_dist_tag(s: &str) -> bool {
    matches!(
        s,
        "latest" | "next" | "beta" | "alpha" | "canary" | "rc" | "experimental"
    )
}

/// Strips a leading `=` or `v` and maps empty or `*` versions to `latest`.
pub fn normalize_package_version(version: &str) -> String {
    let version = version.trim();
    let version = if let Some(rest) = version.strip_prefix('=') {
        rest
    } else if let Some(rest) = version.strip_prefix('v').filter(|rest| is_exact_version(rest)) {
        rest
    } else {
        version
    };
    if version.is_empty() || version == "*" {
        "latest".to_string()
    } else {
        version.to_string()
    }
}

/// Splits `name@version`, keeping the `@` of a scoped name with the name.
pub fn split_package_version(s: &str) -> (&str, &str) {
    let search_from = usize::from(s.starts_with('@'));
    match s[search_from..].find('@') {
        Some(i) if i > 0 => {
            let at = search_from + i;
            (&s[..at], &s[at + 1..])
        }
        _ => (s, ""),
    }
}

/// An npm semver range, e.g. `^3.0.0 || ^4.0.0` or `>= 1.2 < 2`.
#[derive(Debug, Clone)]
pub struct VersionRange {
    alternatives: Vec<VersionReq>,
}

impl VersionRange {
    /// Parses an npm range. Returns `None` for tags and anything unparseable.
    pub fn parse(range: &str) -> Option<Self> {
        let range = range.trim();
        if range.is_empty() || range.eq_ignore_ascii_case("latest") {
            return None;
        }
        let alternatives = range
            .split("||")
            .map(|set| {
                let canonical = canonicalize_comparator_set(set)?;
                VersionReq::parse(&canonical).ok()
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self { alternatives })
    }

    /// Checks a concrete version against any alternative of the range.
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }
}

/// Returns true when the exact `version` satisfies the npm `range`.
pub fn satisfies(version: &str, range: &str) -> bool {
    let Ok(version) = Version::parse(version) else {
        return false;
    };
    VersionRange::parse(range).is_some_and(|range| range.matches(&version))
}

fn canonicalize_comparator_set(set: &str) -> Option<String> {
    let set = set.trim();
    if set.is_empty() || matches!(set, "*" | "x" | "X") {
        return Some("*".to_string());
    }
    if let Some((low, high)) = set.split_once(" - ") {
        return Some(format!(
            ">={}, <={}",
            strip_v(low.trim()),
            strip_v(high.trim())
        ));
    }

    let mut comparators = Vec::new();
    let mut pending_op = "";
    for token in set.split_whitespace() {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            pending_op = token;
            continue;
        }
        comparators.push(canonicalize_comparator(pending_op, token)?);
        pending_op = "";
    }
    if comparators.is_empty() {
        return None;
    }
    Some(comparators.join(", "))
}

fn canonicalize_comparator(pending_op: &str, token: &str) -> Option<String> {
    let op_len = token
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '~' | '^'))
        .unwrap_or(token.len());
    let (inline_op, version) = token.split_at(op_len);
    let op = if inline_op.is_empty() { pending_op } else { inline_op };
    let version = strip_v(version);
    if version.is_empty() {
        return None;
    }

    if !op.is_empty() {
        return Some(format!("{op}{version}"));
    }
    // npm reads a bare version as exact and a bare partial as a wildcard
    if is_exact_version(version) {
        return Some(format!("={version}"));
    }
    match version.split('.').count() {
        1 | 2 if !version.contains(['x', 'X', '*']) => Some(format!("{version}.*")),
        _ => Some(version.to_string()),
    }
}

fn strip_v(version: &str) -> &str {
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('='))
        .unwrap_or(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_versions() {
        assert!(is_exact_version("1.0.0"));
        assert!(is_exact_version("18.3.1"));
        assert!(is_exact_version("1.0.0-beta.1"));
        assert!(is_exact_version("1.0.0+build.5"));
        assert!(is_exact_version("0.0.0-experimental-c8b778b7f-20220825"));

        assert!(!is_exact_version("1.0"));
        assert!(!is_exact_version("^1.0.0"));
        assert!(!is_exact_version("1.0.x"));
        assert!(!is_exact_version("latest"));
        assert!(!is_exact_version("1.0.0-"));
        assert!(!is_exact_version("a.b.c"));
        assert!(!is_exact_version(""));
    }

    #[test]
    fn test_package_names() {
        assert!(validate_package_name("react"));
        assert!(validate_package_name("@types/node"));
        assert!(validate_package_name("lodash.merge"));
        assert!(!validate_package_name("@types"));
        assert!(!validate_package_name("My Package"));
        assert!(!validate_package_name(""));
        assert!(!validate_package_name(&"a".repeat(215)));
    }

    #[test]
    fn test_version_grammar() {
        assert!(is_valid_version("18"));
        assert!(is_valid_version("^18.2.0"));
        assert!(is_valid_version(">=1 <2"));
        assert!(is_valid_version("next"));
        assert!(!is_valid_version("1.0.0;rm"));
        assert!(!is_valid_version(""));
    }

    #[test]
    fn test_split_package_version() {
        assert_eq!(split_package_version("react@18"), ("react", "18"));
        assert_eq!(split_package_version("@types/node@20"), ("@types/node", "20"));
        assert_eq!(split_package_version("@types/node"), ("@types/node", ""));
        assert_eq!(split_package_version("react"), ("react", ""));
    }

    #[test]
    fn test_normalize_package_version() {
        assert_eq!(normalize_package_version(""), "latest");
        assert_eq!(normalize_package_version("*"), "latest");
        assert_eq!(normalize_package_version("=1.2.3"), "1.2.3");
        assert_eq!(normalize_package_version("v1.2.3"), "1.2.3");
        assert_eq!(normalize_package_version("^1.2.3"), "^1.2.3");
    }

    #[test]
    fn test_range_satisfaction() {
        assert!(satisfies("4.0.0", "^3.0.0 || ^4.0.0"));
        assert!(satisfies("3.0.2", "^3.0.0 || ^4.0.0"));
        assert!(!satisfies("1.0.3", "^3.0.0 || ^4.0.0"));
        assert!(satisfies("1.4.0", ">= 1.1.0 < 2"));
        assert!(satisfies("1.2.9", "1.2"));
        assert!(!satisfies("1.3.0", "1.2"));
        assert!(satisfies("1.2.3", "1.2.3"));
        assert!(!satisfies("1.2.4", "1.2.3"));
        assert!(satisfies("1.5.0", "1.0.0 - 2.0.0"));
        assert!(satisfies("18.3.1", "*"));
        assert!(satisfies("18.3.1", "18.x"));
    }

    #[test]
    fn test_tags_are_not_ranges() {
        assert!(VersionRange::parse("latest").is_none());
        assert!(VersionRange::parse("next").is_none());
        assert!(!satisfies("1.0.0", "canary"));
    }
}
