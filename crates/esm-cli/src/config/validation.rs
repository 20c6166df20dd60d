use crate::cli::parse_cdn_origin;
use crate::config::EsmConfig;
use crate::error::{ConfigError, Result};

impl EsmConfig {
    /// Validate values that came from files or the environment; flags are
    /// already checked by clap.
    pub fn validate(&mut self) -> Result<()> {
        if let Some(cdn) = &self.cdn {
            let origin = parse_cdn_origin(cdn).map_err(|hint| ConfigError::InvalidValue {
                field: "cdn".to_string(),
                value: cdn.clone(),
                hint,
            })?;
            self.cdn = Some(origin);
        }

        if let Some(html) = &self.html {
            if html.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "html".to_string(),
                    value: String::new(),
                    hint: "Point 'html' at the document hosting the import map".to_string(),
                }
                .into());
            }
        }

        Ok(())
    }
}
