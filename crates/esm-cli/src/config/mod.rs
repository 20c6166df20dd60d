//! Configuration with multi-source loading.
//!
//! Merges settings from CLI flags, environment variables and `esm.config.json`.
//! Priority: CLI > Environment > File > Defaults

mod defaults;
mod loading;
mod validation;

use esm_importmap::{ImportMap, Target};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use defaults::*;

/// esm configuration - loaded from esm.config.json, `ESM_*` or flags.
///
/// `cdn` and `target` are optional: when unset, the import map keeps the
/// values recorded in its own "config" block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EsmConfig {
    /// CDN origin, e.g. https://esm.sh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdn: Option<String>,

    /// Build target requested from the CDN
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,

    /// Record subresource integrity hashes
    #[serde(default)]
    pub sri: bool,

    /// Metadata cache directory; `None` disables the disk cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// HTML document hosting the import map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<PathBuf>,
}

impl EsmConfig {
    /// Write the configured CDN, target and SRI choice into `import_map`.
    pub fn apply_to(&self, import_map: &mut ImportMap) {
        if let Some(cdn) = &self.cdn {
            import_map.config.cdn = cdn.clone();
        }
        if let Some(target) = self.target {
            import_map.config.target = target.to_string();
        }
        if self.sri {
            import_map.config.sri = true;
        }
    }
}
