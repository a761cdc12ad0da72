//! Command-line interface definition.
//!
//! - `depscan scan` - Resolve the full graph of a main module
//! - `depscan prescan` - List the main module's imports
//! - `depscan batch` - Scan many modules, each as its own root

mod commands;

use clap::Parser;

pub use commands::{BatchArgs, Command, MainModuleArgs, PrescanArgs, ScanArgs, ScanOptions};

/// Depscan - module dependency scanner for explicit NeXTCode builds
#[derive(Parser, Debug)]
#[command(
    name = "depscan",
    version,
    about = "Scan NeXTCode module dependencies for explicit builds",
    long_about = "Depscan discovers every module a NeXTCode module depends on, checks the\n\
                  graph for cycles and prints per-module build command lines that need no\n\
                  implicit module search."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}
