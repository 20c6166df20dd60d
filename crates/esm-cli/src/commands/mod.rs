//! Command implementations for the esm CLI.
//!
//! - [`add`] - resolve packages into the import map
//! - [`tidy`] - rebuild the import map from its direct bindings
//! - [`resolve`] - print the URL a specifier maps to
//! - [`info`] - print the CDN metadata of a module
//!
//! Each command provides an `execute` function taking its parsed arguments
//! and the loaded configuration.

pub mod add;
pub mod info;
pub mod resolve;
pub mod tidy;
pub mod utils;

pub use add::execute as add_execute;
pub use info::execute as info_execute;
pub use resolve::execute as resolve_execute;
pub use tidy::execute as tidy_execute;

use crate::ui;
use esm_importmap::AddPackagesOutcome;

/// Print warnings and errors of a resolution run; returns the error count.
pub(crate) fn report_problems(outcome: &AddPackagesOutcome) -> usize {
    for warning in &outcome.warnings {
        ui::warning(warning);
    }
    for error in &outcome.errors {
        ui::error(&error.to_string());
    }
    outcome.errors.len()
}
