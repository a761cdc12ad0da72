//! Prefixed one-line messages.

use console::style;

use super::is_quiet;

pub fn success(message: &str) {
    if !is_quiet() {
        eprintln!("{} {}", style("✓").green().bold(), message);
    }
}

pub fn info(message: &str) {
    if !is_quiet() {
        eprintln!("{} {}", style("ℹ").blue().bold(), message);
    }
}

pub fn warning(message: &str) {
    if !is_quiet() {
        eprintln!("{} {}", style("⚠").yellow().bold(), style(message).yellow());
    }
}

/// Printed even in quiet mode.
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), style(message).red());
}
