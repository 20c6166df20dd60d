use crate::cli::ConfigArgs;
use crate::config::{CONFIG_FILE_NAME, ENV_PREFIX, EsmConfig, default_cache_dir};
use crate::error::{ConfigError, Result};
use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The subset of [`EsmConfig`] set on the command line.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FlagOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    cdn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<esm_importmap::Target>,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<PathBuf>,
}

impl EsmConfig {
    /// Load configuration from multiple sources.
    /// Priority: CLI args > environment variables > config file > defaults
    pub fn load(args: &ConfigArgs) -> Result<Self> {
        Self::load_from(args, Path::new("."))
    }

    /// Like [`EsmConfig::load`], looking for `esm.config.json` in `cwd`.
    pub fn load_from(args: &ConfigArgs, cwd: &Path) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default_config()));

        let config_file = match &args.config {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.clone()).into()),
            Some(path) => Some(path.clone()),
            None => {
                let default_path = cwd.join(CONFIG_FILE_NAME);
                default_path.exists().then_some(default_path)
            }
        };
        if let Some(path) = config_file {
            debug!(path = %path.display(), "loading config file");
            figment = figment.merge(Json::file(path));
        }

        // ESM_CDN, ESM_TARGET, ESM_SRI, ESM_CACHE_DIR, ESM_HTML
        figment = figment.merge(
            Env::prefixed(ENV_PREFIX)
                .only(&["cdn", "target", "sri", "cache_dir", "html"])
                .map(|key| key.as_str().replace("cache_dir", "cacheDir").into()),
        );

        figment = figment.merge(Serialized::defaults(FlagOverrides {
            cdn: args.cdn.clone(),
            target: args.target.map(Into::into),
            html: args.html.clone(),
        }));

        let mut config: Self = figment
            .extract()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if args.no_cache {
            config.cache_dir = None;
        }
        config.validate()?;
        Ok(config)
    }

    /// Get default configuration values.
    pub(crate) fn default_config() -> Self {
        Self {
            cdn: None,
            target: None,
            sri: false,
            cache_dir: default_cache_dir(),
            html: None,
        }
    }
}
