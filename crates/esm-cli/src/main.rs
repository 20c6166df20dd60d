//! esm CLI - import maps for no-build web development.
//!
//! Parses arguments, sets up logging, loads layered configuration and
//! dispatches to the selected command.

use clap::Parser;
use esm_cli::config::EsmConfig;
use esm_cli::{cli, commands, error, logger, ui};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    let config = EsmConfig::load(&args.config_args).map_err(error::cli_error_to_miette)?;

    let result = match args.command {
        cli::Command::Add(add_args) => commands::add_execute(add_args, &config).await,
        cli::Command::Tidy(tidy_args) => commands::tidy_execute(tidy_args, &config).await,
        cli::Command::Resolve(resolve_args) => commands::resolve_execute(resolve_args, &config).await,
        cli::Command::Info(info_args) => commands::info_execute(info_args, &config).await,
    };

    result.map_err(error::cli_error_to_miette)
}
