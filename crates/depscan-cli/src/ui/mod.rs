//! Status lines on stderr.
//!
//! ```no_run
//! use depscan_cli::ui;
//!
//! ui::init(false, false);
//! ui::success("Scanned 12 modules");
//! ```

mod format;
mod messages;

use std::sync::atomic::{AtomicBool, Ordering};

pub use format::{format_duration, print_scan_summary};
pub use messages::{error, info, success, warning};

static QUIET: AtomicBool = AtomicBool::new(false);

/// Applies the global `--quiet` and `--no-color` flags.
pub fn init(quiet: bool, no_color: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
    if no_color || !crate::logger::should_use_colors() {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }
}

/// Whether non-error output is suppressed.
pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}
