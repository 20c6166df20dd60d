//! Shared utilities for command implementations.
//!
//! - locating the HTML document that hosts the import map
//! - reading and writing that document
//! - building the metadata fetcher from configuration

use crate::config::{DEFAULT_HTML_FILE, EsmConfig};
use crate::error::{CliError, Result, ResultExt};
use esm_importmap::import_map::html;
use esm_importmap::{HttpRegistry, ImportMap, MetadataFetcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Resolve a path relative to a working directory.
pub fn resolve_path(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Get the current working directory.
pub fn get_cwd() -> Result<PathBuf> {
    std::env::current_dir().map_err(|e| {
        CliError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to get current directory: {}", e),
        ))
    })
}

/// Find `name` in `start_dir` or the closest ancestor containing it.
pub fn lookup_closest_file(start_dir: &Path, name: &str) -> Option<PathBuf> {
    let mut current = start_dir;

    loop {
        let candidate = current.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

/// The document hosting the import map.
///
/// Priority: `html` from config or `--html`, then the closest `index.html`,
/// then `index.html` in `cwd` (which `add` creates).
pub fn document_path(config: &EsmConfig, cwd: &Path) -> PathBuf {
    if let Some(html) = &config.html {
        return resolve_path(html, cwd);
    }
    lookup_closest_file(cwd, DEFAULT_HTML_FILE).unwrap_or_else(|| cwd.join(DEFAULT_HTML_FILE))
}

/// An HTML document and the import map inside it.
#[derive(Debug)]
pub struct Document {
    pub path: PathBuf,
    /// File contents, `None` when the file does not exist yet.
    pub html: Option<String>,
    /// The parsed map, `None` when the document has none.
    pub import_map: Option<ImportMap>,
}

impl Document {
    /// Read `path`; a missing file yields an empty document.
    pub fn read(path: &Path) -> Result<Self> {
        let html = match fs::read_to_string(path) {
            Ok(html) => Some(html),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => return Err(err).with_path(path),
        };
        let import_map = match &html {
            Some(html) => html::extract_import_map(html)
                .with_hint(format!("Fix the import map in {}", path.display()))?,
            None => None,
        };
        debug!(path = %path.display(), exists = html.is_some(), has_import_map = import_map.is_some(), "read document");
        Ok(Self {
            path: path.to_path_buf(),
            html,
            import_map,
        })
    }

    /// Read `path`, failing when it has no import map.
    pub fn read_existing(path: &Path) -> Result<(Self, ImportMap)> {
        let mut document = Self::read(path)?;
        if document.html.is_none() {
            return Err(CliError::FileNotFound(path.to_path_buf()));
        }
        let import_map = document
            .import_map
            .take()
            .ok_or_else(|| CliError::NoImportMap(path.to_path_buf()))?;
        Ok((document, import_map))
    }

    /// The document text with `import_map` in place.
    pub fn render(&self, import_map: &ImportMap) -> String {
        match &self.html {
            Some(html) => html::write_import_map(html, import_map),
            None => html::new_document(import_map),
        }
    }

    /// Write the document back with `import_map` in place.
    pub fn write(&self, import_map: &ImportMap) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_path(parent)?;
        }
        fs::write(&self.path, self.render(import_map))
            .context(format!("Failed to write {}", self.path.display()))
    }
}

/// Build the shared metadata fetcher for this configuration.
pub fn build_fetcher(config: &EsmConfig) -> Result<Arc<MetadataFetcher>> {
    let registry = HttpRegistry::new().with_hint("Could not set up the HTTP client")?;
    let fetcher = MetadataFetcher::new(Arc::new(registry));
    let fetcher = match &config.cache_dir {
        Some(dir) => fetcher.with_cache_dir(dir),
        None => fetcher.without_disk_cache(),
    };
    Ok(Arc::new(fetcher))
}
