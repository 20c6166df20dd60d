use std::path::PathBuf;

/// Config file picked up from the working directory.
pub const CONFIG_FILE_NAME: &str = "esm.config.json";

/// Document searched for when `--html` is not given.
pub const DEFAULT_HTML_FILE: &str = "index.html";

/// Prefix of the environment variables read into the config.
pub const ENV_PREFIX: &str = "ESM_";

pub fn default_cache_dir() -> Option<PathBuf> {
    esm_importmap::fetch::DiskCache::default_root()
}
