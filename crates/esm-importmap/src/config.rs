//! Import map configuration: CDN origin, build target and SRI.
//!
//! This is the `config` block stored inside the import map itself, so a
//! resolution run is reproducible from the map alone.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The CDN used when an import map does not name one.
pub const DEFAULT_CDN_ORIGIN: &str = "https://esm.sh";

/// ECMAScript build target requested from the CDN.
///
/// The CDN serves one build per target under `/{target}/{entry}.mjs`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Es2015,
    Es2016,
    Es2017,
    Es2018,
    Es2019,
    Es2020,
    Es2021,
    Es2022,
    Es2023,
    Es2024,
    EsNext,
}

impl Target {
    /// Every recognised target, oldest first.
    pub const ALL: [Target; 11] = [
        Target::Es2015,
        Target::Es2016,
        Target::Es2017,
        Target::Es2018,
        Target::Es2019,
        Target::Es2020,
        Target::Es2021,
        Target::Es2022,
        Target::Es2023,
        Target::Es2024,
        Target::EsNext,
    ];

    /// The newest dated ECMAScript edition.
    pub const LATEST: Target = Target::Es2024;

    pub fn as_str(self) -> &'static str {
        match self {
            Target::Es2015 => "es2015",
            Target::Es2016 => "es2016",
            Target::Es2017 => "es2017",
            Target::Es2018 => "es2018",
            Target::Es2019 => "es2019",
            Target::Es2020 => "es2020",
            Target::Es2021 => "es2021",
            Target::Es2022 => "es2022",
            Target::Es2023 => "es2023",
            Target::Es2024 => "es2024",
            Target::EsNext => "esnext",
        }
    }
}

impl Default for Target {
    fn default() -> Self {
        Target::LATEST
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Target::ALL
            .into_iter()
            .find(|target| target.as_str() == lower)
            .ok_or_else(|| format!("unknown build target: {s}"))
    }
}

/// The `config` block of an import map.
///
/// Fields are kept as written so that an unknown target or an empty CDN
/// round-trips untouched; use [`ImportMapConfig::cdn_origin`] and
/// [`ImportMapConfig::target`] to read effective values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportMapConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cdn: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sri: bool,
}

impl ImportMapConfig {
    /// The CDN origin without a trailing slash, defaulting to esm.sh.
    pub fn cdn_origin(&self) -> &str {
        let cdn = self.cdn.trim_end_matches('/');
        if cdn.is_empty() {
            DEFAULT_CDN_ORIGIN
        } else {
            cdn
        }
    }

    /// The configured build target; unset or unrecognised values fall back to
    /// [`Target::LATEST`].
    pub fn target(&self) -> Target {
        self.target.parse().unwrap_or_default()
    }

    /// True when the CDN differs from the default and must be persisted.
    pub fn has_custom_cdn(&self) -> bool {
        self.cdn_origin() != DEFAULT_CDN_ORIGIN
    }
}
