//! `depscan batch`.

use std::path::Path;
use std::time::Instant;

use depscan::BatchScanInput;

use crate::cli::BatchArgs;
use crate::commands::utils;
use crate::error::{CliError, Result, ResultExt};
use crate::ui;

/// Scans every entry of the batch file and writes each graph to the entry's
/// output path.
///
/// Failed entries are reported and counted; the command fails at the end if
/// any entry failed.
pub fn execute(args: BatchArgs) -> Result<()> {
    let config = utils::load_config(&args.options)?;
    let text = std::fs::read_to_string(&args.batch).with_path(&args.batch)?;
    let entries = BatchScanInput::parse_list(&text)?;
    let (tool, _diagnostics) = utils::build_tool(&args.options, config)?;

    let base = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => utils::get_cwd()?,
    };

    let started = Instant::now();
    let results = tool.perform_batch_module_scan(&entries);
    utils::save_cache(&tool, &args.options)?;

    let mut failed = 0;
    for (entry, result) in entries.iter().zip(results) {
        let name = entry
            .nextcode_module_name
            .as_deref()
            .or(entry.clang_module_name.as_deref())
            .unwrap_or("<unnamed>");
        match result {
            Ok(graph) => {
                let path = utils::resolve_path(Path::new(&entry.output), &base);
                utils::write_output(Some(&path), &graph.to_json()?)?;
                tracing::debug!(module = name, path = %path.display(), "Wrote batch entry");
            }
            Err(err) => {
                failed += 1;
                ui::error(&format!("{name}: {err}"));
            }
        }
    }

    let total = entries.len();
    if failed > 0 {
        return Err(CliError::BatchFailed { failed, total });
    }
    ui::success(&format!(
        "Scanned {total} batch entries in {}",
        ui::format_duration(started.elapsed())
    ));
    Ok(())
}
