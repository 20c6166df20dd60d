//! esm CLI - manage the import map of a no-build web project.
//!
//! The binary is a thin front end over [`esm_importmap`]: it finds the
//! project's `index.html`, reads the `<script type="importmap">` out of it,
//! runs the resolver and writes the result back.
//!
//! # Architecture
//!
//! - [`cli`] - argument definitions (clap derive)
//! - [`commands`] - `add`, `tidy`, `resolve` and `info`
//! - [`config`] - `esm.config.json` / `ESM_*` / flag layering via figment
//! - [`error`] - error types with actionable hints
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - spinners and status messages
//!
//! # Example
//!
//! ```rust,no_run
//! use esm_cli::{error::Result, logger};
//!
//! fn main() -> Result<()> {
//!     logger::init_logger(false, false, false);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, ConfigError, Result, ResultExt};
