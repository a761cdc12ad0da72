//! `depscan prescan`.

use std::sync::Arc;

use depscan::{DependencyScanTool, DiagnosticCollector, ModuleIndex};
use serde_json::Map;

use crate::cli::PrescanArgs;
use crate::commands::utils;
use crate::error::Result;
use crate::ui;

/// Prints the import names of the main module, implicit imports included.
///
/// Nothing is resolved, so no module index is needed.
pub fn execute(args: PrescanArgs) -> Result<()> {
    let config = utils::load_config_with(args.config.as_deref(), Map::new())?;
    let input = utils::main_module_input(&args.main)?;

    let tool = DependencyScanTool::new(
        config,
        Arc::new(ModuleIndex::new()),
        Arc::new(DiagnosticCollector::new()),
    );
    let imports = tool.perform_module_prescan(&input)?;

    utils::write_output(args.output.as_deref(), &imports.to_json()?)?;
    ui::success(&format!(
        "Found {} imports of '{}'",
        imports.imports.len(),
        input.name
    ));
    Ok(())
}
