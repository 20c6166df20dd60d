//! Tidy command implementation.

use crate::cli::TidyArgs;
use crate::commands::{report_problems, utils};
use crate::config::EsmConfig;
use crate::error::{CliError, Result};
use crate::ui;
use esm_importmap::{AddPackagesOutcome, MetadataFetcher};
use std::path::Path;
use std::sync::Arc;

/// Execute the tidy command.
///
/// Re-resolves every CDN binding in `imports`, drops stale scopes and
/// writes the rebuilt map back.
pub async fn execute(args: TidyArgs, config: &EsmConfig) -> Result<()> {
    let cwd = utils::get_cwd()?;
    let path = utils::document_path(config, &cwd);
    let fetcher = utils::build_fetcher(config)?;
    tidy_document(&path, config, &fetcher, args.dry_run).await?;
    Ok(())
}

/// Tidy the import map of the document at `path`.
pub async fn tidy_document(
    path: &Path,
    config: &EsmConfig,
    fetcher: &Arc<MetadataFetcher>,
    dry_run: bool,
) -> Result<AddPackagesOutcome> {
    let (document, mut import_map) = utils::Document::read_existing(path)?;
    config.apply_to(&mut import_map);
    let before = import_map.format_json(0);

    let spinner = ui::Spinner::new("Tidying import map...");
    let outcome = import_map.tidy(fetcher).await;
    spinner.clear();
    let failures = report_problems(&outcome);

    let after = import_map.format_json(0);
    if dry_run {
        println!("{after}");
    } else if before != after {
        document.write(&import_map)?;
        ui::success(&format!(
            "Tidied {} package(s) in {}",
            outcome.added.len(),
            path.display()
        ));
    } else {
        ui::info("Import map is already tidy");
    }

    if failures > 0 {
        return Err(CliError::ResolutionFailed { count: failures });
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use esm_importmap::test_utils::fixture_registry;
    use tempfile::TempDir;

    const STALE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <script type="importmap">
    {
      "imports": {
        "react": "https://esm.sh/react@19.1.0/es2024/react.mjs",
        "app": "/src/app.js"
      },
      "scopes": {
        "https://esm.sh/": {
          "left-pad": "https://esm.sh/left-pad@1.3.0/es2024/left-pad.mjs"
        }
      }
    }
  </script>
</head>
<body></body>
</html>
"#;

    #[tokio::test]
    async fn test_tidy_drops_stale_scopes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.html");
        std::fs::write(&path, STALE).unwrap();
        let fetcher =
            Arc::new(MetadataFetcher::new(Arc::new(fixture_registry())).without_disk_cache());

        tidy_document(&path, &EsmConfig::default_config(), &fetcher, false)
            .await
            .unwrap();

        let (_, im) = utils::Document::read_existing(&path).unwrap();
        assert_eq!(im.imports["app"], "/src/app.js");
        assert_eq!(im.imports["react"], "https://esm.sh/react@19.1.0/es2024/react.mjs");
        assert!(im.imports.contains_key("react/"));
        assert!(im.scopes.is_empty());
    }

    #[tokio::test]
    async fn test_tidy_requires_an_import_map() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.html");
        std::fs::write(&path, "<html><head></head><body></body></html>").unwrap();
        let fetcher =
            Arc::new(MetadataFetcher::new(Arc::new(fixture_registry())).without_disk_cache());

        let err = tidy_document(&path, &EsmConfig::default_config(), &fetcher, false)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::NoImportMap(_)));
    }
}
