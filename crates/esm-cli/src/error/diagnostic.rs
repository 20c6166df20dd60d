//! Miette diagnostic conversion for CLI errors.

use crate::error::CliError;
use esm_importmap::Error as ResolveError;
use miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Resolve(e) => resolve_error_to_miette(e),
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        _ => miette::miette!("{}", err),
    }
}

/// Convert a resolver error to a miette Report with a next step.
pub fn resolve_error_to_miette(err: ResolveError) -> Report {
    match err {
        ResolveError::PackageNotFound { name, version } => miette::miette!(
            "Package not found: {}@{}\n\nHint: Check the name and version on https://www.npmjs.com/package/{}",
            name,
            version,
            name
        ),
        ResolveError::Http(e) => miette::miette!(
            "Network error: {}\n\nHint: Check your connection or the --cdn origin",
            e
        ),
        ResolveError::InvalidImportMap(message) => miette::miette!(
            "Invalid import map: {}\n\nHint: Fix the JSON inside <script type=\"importmap\">",
            message
        ),
        _ => miette::miette!("{}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_gets_registry_hint() {
        let report = cli_error_to_miette(CliError::Resolve(ResolveError::PackageNotFound {
            name: "left-pad".into(),
            version: "9.9.9".into(),
        }));
        let msg = report.to_string();
        assert!(msg.contains("left-pad@9.9.9"));
        assert!(msg.contains("npmjs.com/package/left-pad"));
    }

    #[test]
    fn test_other_errors_keep_their_message() {
        let report = cli_error_to_miette(CliError::InvalidArgument("empty".into()));
        assert_eq!(report.to_string(), "Invalid argument: empty");
    }
}
