//! Command-line interface definition.
//!
//! # Command Structure
//!
//! - `esm add <package>...` - resolve packages into the import map
//! - `esm tidy` - re-resolve the import map from its direct bindings
//! - `esm resolve <specifier>` - print the URL a specifier maps to
//! - `esm info <package>` - print the CDN metadata of a module

mod commands;
pub mod enums;
mod validation;

use clap::{Args, Parser};
use std::path::PathBuf;

pub use commands::{AddArgs, Command, InfoArgs, ResolveArgs, TidyArgs};
pub use enums::*;
pub use validation::parse_cdn_origin;

/// esm - import maps for no-build web development
#[derive(Parser, Debug)]
#[command(
    name = "esm",
    version,
    about = "Manage browser import maps backed by esm.sh",
    long_about = "esm keeps the <script type=\"importmap\"> of your index.html in sync with\n\
                  the packages you use. Dependencies are resolved through the CDN and\n\
                  flattened into a minimal map, with scopes only where versions conflict."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    ///
    /// Shows cache hits, registry requests and placement decisions.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(flatten)]
    pub config_args: ConfigArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Flags that override `esm.config.json` and `ESM_*` variables.
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigArgs {
    /// Path to a config file (default: ./esm.config.json when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// CDN origin to resolve against
    ///
    /// Written into the import map's "config" block when it differs from
    /// https://esm.sh.
    #[arg(long, global = true, value_name = "URL", value_parser = parse_cdn_origin)]
    pub cdn: Option<String>,

    /// ECMAScript build target requested from the CDN
    #[arg(long, global = true, value_enum)]
    pub target: Option<EsTarget>,

    /// HTML document hosting the import map
    ///
    /// Defaults to the closest index.html, searching upwards from the
    /// working directory.
    #[arg(long, global = true, value_name = "PATH")]
    pub html: Option<PathBuf>,

    /// Do not read or write the on-disk metadata cache
    #[arg(long, global = true)]
    pub no_cache: bool,
}
