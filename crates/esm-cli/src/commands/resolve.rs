//! Resolve command implementation.

use crate::cli::ResolveArgs;
use crate::commands::utils;
use crate::config::EsmConfig;
use crate::error::{CliError, Result};
use std::path::Path;

/// Execute the resolve command: print the URL `specifier` maps to.
pub async fn execute(args: ResolveArgs, config: &EsmConfig) -> Result<()> {
    let cwd = utils::get_cwd()?;
    let path = utils::document_path(config, &cwd);
    let url = resolve_in_document(&path, &args.specifier, args.referrer.as_deref())?;
    println!("{url}");
    Ok(())
}

/// Resolve `specifier` against the import map of the document at `path`.
pub fn resolve_in_document(path: &Path, specifier: &str, referrer: Option<&str>) -> Result<String> {
    let (_, import_map) = utils::Document::read_existing(path)?;
    let (url, matched) = import_map.resolve(specifier, referrer);
    if !matched {
        return Err(CliError::Custom(format!(
            "'{}' is not mapped by {}\n\nHint: Run 'esm add {}' first",
            specifier,
            path.display(),
            specifier
        )));
    }
    Ok(url)
}
