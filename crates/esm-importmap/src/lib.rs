#![cfg_attr(docsrs, feature(doc_cfg))]

//! # esm-importmap
//!
//! Import map dependency resolver for esm.sh-style CDNs.
//!
//! This crate maintains a browser `<script type="importmap">` for "no-build"
//! web development. Given package specifiers (npm, GitHub, JSR or pkg.pr.new),
//! it walks the dependency graph through the CDN's `package.json` endpoint,
//! deduplicates compatible versions and writes a minimal, deterministic import
//! map, falling back to scoped bindings when a version conflict cannot be
//! flattened.
//!
//! ## Features
//!
//! - **Specifier parsing**: `npm:`, `jsr:`, `github:`, git URLs, pkg.pr.new
//! - **Cached metadata fetching**: in-memory + on-disk caches with per-URL
//!   request collapsing
//! - **Graph resolution**: global vs. scoped placement, peer conflict warnings
//! - **Canonical serialization**: stable JSON suitable for diffing
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use esm_importmap::{HttpRegistry, ImportMap, MetadataFetcher};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Arc::new(MetadataFetcher::new(Arc::new(HttpRegistry::new()?)));
//! let mut import_map = ImportMap::default();
//! let outcome = import_map.add_packages(&fetcher, ["react@18", "react-dom@18"]).await;
//! for warning in &outcome.warnings {
//!     eprintln!("warn: {warning}");
//! }
//! println!("{}", import_map.format_json(0));
//!
//! let (url, matched) = import_map.resolve("react-dom/client", None);
//! assert!(matched, "{url}");
//! # Ok(()) }
//! ```

pub mod config;
pub mod fetch;
pub mod import_map;
pub mod meta;
pub mod npm;
pub mod registry;
pub mod resolver;
pub mod specifier;

// Test utilities (available in test builds and when test-utils feature is enabled)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export primary APIs
pub use config::{DEFAULT_CDN_ORIGIN, ImportMapConfig, Target};
pub use fetch::{MetadataFetcher, PackageInfo};
pub use import_map::ImportMap;
pub use meta::{Import, ImportMeta, parse_esm_path};
pub use registry::{HttpRegistry, Registry, RegistryResponse};
pub use resolver::{AddPackagesOutcome, Dependency, PackageSpecifier};
pub use specifier::{PackageRef, RegistryKind, parse_dependency_version};

/// Error types for import map resolution.
///
/// Every variant is reported per specifier: a failing branch never aborts
/// its siblings.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad package name/version grammar or a malformed jsr/git specifier.
    #[error("invalid package name or version: {0}")]
    InvalidSpecifier(String),

    /// A dependency form the CDN cannot serve (`file:`, non-GitHub git, foreign http).
    #[error("unsupported {0} dependency")]
    UnsupportedDependency(&'static str),

    /// The registry answered 404.
    #[error("package not found: {name}@{version}")]
    PackageNotFound { name: String, version: String },

    /// Any other non-200 registry answer, surfaced verbatim.
    #[error("unexpected http status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// Transport failure talking to the CDN.
    #[error("http error: {0}")]
    Http(String),

    /// The CDN answered 200 with a body that is not a manifest.
    #[error("could not decode {url}: {message}")]
    Decode { url: String, message: String },

    /// A CDN URL or path that does not name a package.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The import map JSON (or the HTML hosting it) could not be read.
    #[error("invalid import map: {0}")]
    InvalidImportMap(String),

    /// A background fetch task panicked or was cancelled.
    #[error("resolution task failed: {0}")]
    Task(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err.to_string())
    }
}

/// Result type alias for import map operations.
pub type Result<T> = std::result::Result<T, Error>;
