//! Scope key ordering.

use std::cmp::Ordering;

/// Orders scope prefixes most specific first: more `/` separators wins, and
/// ties go to the lexicographically greater key.
///
/// `https://esm.sh/*react@18.3.1/` therefore sorts before `https://esm.sh/`,
/// so a referrer under both resolves through the package scope.
pub fn compare_scope_keys(a: &str, b: &str) -> Ordering {
    let slashes = |s: &str| s.bytes().filter(|&b| b == b'/').count();
    slashes(b).cmp(&slashes(a)).then_with(|| b.cmp(a))
}

/// Sort scope keys in place, most specific first.
pub fn sort_scope_keys<S: AsRef<str>>(keys: &mut [S]) {
    keys.sort_by(|a, b| compare_scope_keys(a.as_ref(), b.as_ref()));
}

/// An owned list of scope keys kept in lookup order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeKeys(Vec<String>);

impl ScopeKeys {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        sort_scope_keys(&mut keys);
        Self(keys)
    }

    /// The first (most specific) scope that is a prefix of `referrer`.
    pub fn find(&self, referrer: &str) -> Option<&str> {
        self.0
            .iter()
            .map(String::as_str)
            .find(|key| referrer.starts_with(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}
