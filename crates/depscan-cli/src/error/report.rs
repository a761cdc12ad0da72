//! Miette rendering of CLI errors.

use depscan::ScanError;
use miette::Report;

use crate::error::CliError;

/// Converts a [`CliError`] into a report with a hint where one helps.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Scan(err) => scan_error_to_miette(err),
        CliError::Config(err) => miette::miette!(
            "Configuration error: {}\n\nHint: Check depscan.toml and DEPSCAN_* environment variables",
            err
        ),
        CliError::FileNotFound(path) => miette::miette!(
            "File not found: {}\n\nHint: Paths are resolved against the current directory",
            path.display()
        ),
        CliError::BatchFailed { failed, total } => miette::miette!(
            "{} of {} batch entries failed\n\nHint: Run with --verbose to see each failure",
            failed,
            total
        ),
        other => miette::miette!("{}", other),
    }
}

fn scan_error_to_miette(err: ScanError) -> Report {
    match err {
        ScanError::ModuleNotFound { name, importer } => miette::miette!(
            "Unable to resolve module dependency '{}'\nImported by: {}\n\nHint: Check that the module index lists it",
            name,
            importer
        ),
        ScanError::CycleDetected { chain } => miette::miette!(
            "Module dependency cycle detected:\n{}\n\nHint: Break the cycle by removing one of the imports",
            chain
        ),
        ScanError::WorkerPoolExhausted { size } => miette::miette!(
            "All {} scanning workers are busy\n\nHint: Raise --jobs or use --serial",
            size
        ),
        other => miette::miette!("{}", other),
    }
}
