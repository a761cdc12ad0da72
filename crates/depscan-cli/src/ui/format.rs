//! Formatting helpers for scan summaries.

use std::time::Duration;

use depscan::{DependencyGraph, DiagnosticCollector, DiagnosticSeverity};

use super::messages;

/// Formats a duration as `850ms` or `1.42s`.
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{millis}ms")
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// Prints one success line for `graph` plus a warning count when there were
/// warnings.
pub fn print_scan_summary(
    graph: &DependencyGraph,
    diagnostics: &DiagnosticCollector,
    elapsed: Duration,
) {
    messages::success(&format!(
        "Scanned {} modules for '{}' in {}",
        graph.modules.len(),
        graph.main_module_name,
        format_duration(elapsed)
    ));
    let warnings = diagnostics
        .diagnostics()
        .iter()
        .filter(|diagnostic| diagnostic.severity == DiagnosticSeverity::Warning)
        .count();
    if warnings > 0 {
        messages::warning(&format!("{warnings} warning(s) reported"));
    }
}
