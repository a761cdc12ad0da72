//! `depscan scan`.

use std::time::Instant;

use crate::cli::ScanArgs;
use crate::commands::utils;
use crate::error::Result;
use crate::ui;

/// Resolves, finalizes and prints the graph of one main module.
///
/// The scanning cache is saved even when the scan fails, so that records
/// already found are reused by the next run.
pub fn execute(args: ScanArgs) -> Result<()> {
    let config = utils::load_config(&args.options)?;
    let input = utils::main_module_input(&args.main)?;
    let (tool, diagnostics) = utils::build_tool(&args.options, config)?;

    let started = Instant::now();
    let result = tool.perform_module_scan(&input);
    utils::save_cache(&tool, &args.options)?;
    let graph = result?;

    utils::write_output(args.output.as_deref(), &graph.to_json()?)?;
    ui::print_scan_summary(&graph, &diagnostics, started.elapsed());
    Ok(())
}
