//! Depscan CLI - command-line front end for the `depscan` scanner.
//!
//! # Architecture
//!
//! - [`cli`] - Argument definitions (clap derive)
//! - [`commands`] - `scan`, `prescan` and `batch` implementations
//! - [`error`] - CLI error type and miette rendering
//! - [`logger`] - `tracing` subscriber setup
//! - [`ui`] - Status lines on stderr
//!
//! Graphs are written as JSON to `--output` or stdout. Everything else goes
//! to stderr so the JSON can be piped.
//!
//! # Example
//!
//! ```rust,no_run
//! use depscan_cli::{error::Result, logger};
//!
//! fn main() -> Result<()> {
//!     logger::init_logger(false, false, false);
//!     // dispatch a command...
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result, ResultExt};
