//! Depscan CLI - module dependency scanning for explicit builds.
//!
//! Parses arguments, sets up logging and dispatches to the command
//! implementations.

use clap::Parser;
use depscan_cli::{cli, commands, error, logger, ui};
use miette::Result;

fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init(args.quiet, args.no_color);

    let result = match args.command {
        cli::Command::Scan(scan_args) => commands::scan_execute(scan_args),
        cli::Command::Prescan(prescan_args) => commands::prescan_execute(prescan_args),
        cli::Command::Batch(batch_args) => commands::batch_execute(batch_args),
    };

    result.map_err(error::cli_error_to_miette)
}
