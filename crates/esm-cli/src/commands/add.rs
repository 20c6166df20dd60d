//! Add command implementation.

use crate::cli::AddArgs;
use crate::commands::{report_problems, utils};
use crate::config::EsmConfig;
use crate::error::{CliError, Result};
use crate::ui;
use esm_importmap::{AddPackagesOutcome, ImportMap, MetadataFetcher};
use std::path::Path;
use std::sync::Arc;

/// Execute the add command.
///
/// # Steps
///
/// 1. Locate the document (`--html` or the closest `index.html`)
/// 2. Read its import map, or start an empty one
/// 3. Resolve the packages and their dependencies
/// 4. Write the document back (or print the map with `--dry-run`)
///
/// # Errors
///
/// Returns [`CliError::ResolutionFailed`] when any package failed; the
/// packages that did resolve are still written.
pub async fn execute(args: AddArgs, config: &EsmConfig) -> Result<()> {
    let cwd = utils::get_cwd()?;
    let path = utils::document_path(config, &cwd);
    let fetcher = utils::build_fetcher(config)?;
    add_packages(&path, &args.packages, config, &fetcher, args.dry_run).await?;
    Ok(())
}

/// Add `packages` to the import map of the document at `path`.
pub async fn add_packages(
    path: &Path,
    packages: &[String],
    config: &EsmConfig,
    fetcher: &Arc<MetadataFetcher>,
    dry_run: bool,
) -> Result<AddPackagesOutcome> {
    let document = utils::Document::read(path)?;
    let mut import_map = document.import_map.clone().unwrap_or_default();
    config.apply_to(&mut import_map);

    let spinner = ui::Spinner::new(&format!(
        "Resolving {} package(s) from {}...",
        packages.len(),
        import_map.cdn_origin()
    ));
    let outcome = import_map.add_packages(fetcher, packages).await;
    spinner.clear();

    for pkg in &outcome.added {
        print_bindings(&import_map, &pkg.name);
    }
    let failures = report_problems(&outcome);

    if dry_run {
        println!("{}", import_map.format_json(0));
    } else if !outcome.added.is_empty() {
        document.write(&import_map)?;
        ui::success(&format!(
            "Added {} package(s) to {}",
            outcome.added.len(),
            path.display()
        ));
    }

    if failures > 0 {
        return Err(CliError::ResolutionFailed { count: failures });
    }
    Ok(outcome)
}

fn print_bindings(import_map: &ImportMap, key: &str) {
    if let Some(url) = import_map.imports.get(key) {
        ui::added(key, url);
    }
}
