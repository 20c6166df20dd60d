//! Info command implementation.

use crate::cli::InfoArgs;
use crate::commands::utils;
use crate::config::EsmConfig;
use crate::error::{CliError, Result};
use crate::ui;
use esm_importmap::resolver::parse_package_specifier;
use esm_importmap::{DEFAULT_CDN_ORIGIN, Import, ImportMeta, MetadataFetcher, RegistryKind, Target};
use owo_colors::OwoColorize;
use std::sync::Arc;

/// Execute the info command: print the `?meta` document of a module.
pub async fn execute(args: InfoArgs, config: &EsmConfig) -> Result<()> {
    let fetcher = utils::build_fetcher(config)?;
    let meta = fetch_info(&args.package, args.subpath.as_deref(), config, &fetcher).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&meta)?);
    } else {
        print_summary(&meta, config);
    }
    Ok(())
}

/// Fetch the metadata of `package` (optionally a `subpath` of it).
pub async fn fetch_info(
    package: &str,
    subpath: Option<&str>,
    config: &EsmConfig,
    fetcher: &Arc<MetadataFetcher>,
) -> Result<ImportMeta> {
    let spec = parse_package_specifier(package)?
        .ok_or_else(|| CliError::InvalidArgument(format!("empty package name: '{package}'")))?;
    let import = Import {
        name: spec.name,
        version: spec.version,
        sub_path: subpath.unwrap_or_default().trim_matches('/').to_string(),
        registry: RegistryKind::from_prefix(spec.registry_prefix),
        ..Import::default()
    };

    let spinner = ui::Spinner::new(&format!("Fetching {}...", import.specifier(true)));
    let result = fetcher
        .fetch_import_meta(cdn_origin(config), &import, Some(target(config)))
        .await;
    match result {
        Ok(meta) => {
            spinner.clear();
            Ok(meta)
        }
        Err(err) => {
            spinner.fail(&format!("Failed to fetch {}", import.specifier(true)));
            Err(err.into())
        }
    }
}

fn cdn_origin(config: &EsmConfig) -> &str {
    config.cdn.as_deref().unwrap_or(DEFAULT_CDN_ORIGIN)
}

fn target(config: &EsmConfig) -> Target {
    config.target.unwrap_or(Target::LATEST)
}

fn print_summary(meta: &ImportMeta, config: &EsmConfig) {
    let color = ui::colors_enabled();
    let heading = meta.import.specifier(true);
    if color {
        println!("{}", heading.bold());
    } else {
        println!("{heading}");
    }

    let url = format!(
        "{}/{}/{}/{}.mjs",
        cdn_origin(config),
        meta.esm_specifier(),
        target(config),
        if meta.import.sub_path.is_empty() {
            meta.import.name.rsplit('/').next().unwrap_or(&meta.import.name)
        } else {
            meta.import.sub_path.as_str()
        }
    );
    println!("  url:       {url}");
    if !meta.integrity.is_empty() {
        println!("  integrity: {}", meta.integrity);
    }
    if !meta.exports.is_empty() {
        println!("  exports:   {}", meta.exports.join(", "));
    }
    for (label, paths) in [("imports", &meta.imports), ("peers", &meta.peer_imports)] {
        if paths.is_empty() {
            continue;
        }
        println!("  {label}:");
        for path in paths {
            if color {
                println!("    {}", path.dimmed());
            } else {
                println!("    {path}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esm_importmap::test_utils::fixture_registry;

    fn fetcher() -> Arc<MetadataFetcher> {
        Arc::new(MetadataFetcher::new(Arc::new(fixture_registry())).without_disk_cache())
    }

    #[tokio::test]
    async fn test_fetch_info_resolves_version() {
        let meta = fetch_info("react-dom@19", Some("/client"), &EsmConfig::default_config(), &fetcher())
            .await
            .unwrap();
        assert_eq!(meta.import.name, "react-dom");
        assert_eq!(meta.import.version, "19.1.0");
        assert_eq!(meta.import.sub_path, "client");
        assert_eq!(meta.esm_specifier(), "*react-dom@19.1.0");
    }

    #[tokio::test]
    async fn test_fetch_info_rejects_bad_specifier() {
        let err = fetch_info("My Package@abc", None, &EsmConfig::default_config(), &fetcher())
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Resolve(esm_importmap::Error::InvalidSpecifier(_))));
    }

    #[tokio::test]
    async fn test_fetch_info_not_found() {
        let err = fetch_info("left-pad", None, &EsmConfig::default_config(), &fetcher())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CliError::Resolve(esm_importmap::Error::PackageNotFound { .. })
        ));
    }
}
