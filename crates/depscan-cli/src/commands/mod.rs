//! Command implementations.
//!
//! - [`scan`] - Full graph of one main module
//! - [`prescan`] - Imports of one main module
//! - [`batch`] - Many independent roots
//!
//! Each module exposes an `execute` function taking its parsed arguments.

pub mod batch;
pub mod prescan;
pub mod scan;
pub(crate) mod utils;

pub use batch::execute as batch_execute;
pub use prescan::execute as prescan_execute;
pub use scan::execute as scan_execute;
