//! Shared helpers for depscan integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use depscan::{DependencyScanTool, DiagnosticCollector, MainModuleInput, ModuleIndex, SourceImport};
use depscan_config::ScanConfig;

/// A small SDK: an interface importing a Clang framework with a private
/// module, a binary module and a bridging header.
pub const SDK_INDEX: &str = r#"{
  "nextcode": {
    "NeXTCode": { "kind": "interface", "path": "/sdk/NeXTCode.codeinterface" },
    "Foo": { "kind": "interface", "path": "/sdk/Foo.codeinterface", "imports": ["NeXTCode", "Bar"] },
    "Util": { "kind": "binary", "path": "/sdk/Util.codemodule", "imports": ["NeXTCode"] }
  },
  "clang": {
    "Bar": { "moduleMap": "/sdk/Bar/module.modulemap", "dependencies": ["Bar_Private"] },
    "Bar_Private": { "moduleMap": "/sdk/Bar/module.private.modulemap" },
    "Shims": { "moduleMap": "/sdk/Shims/module.modulemap", "isSystem": true }
  },
  "headers": {
    "/src/App/App-Bridging.h": { "files": ["/src/App/Support.h"], "modules": ["Shims"] }
  }
}"#;

/// Writes `text` as `modules.json` under `dir` and returns its path.
pub fn write_index(dir: &Path, text: &str) -> PathBuf {
    let path = dir.join("modules.json");
    std::fs::write(&path, text).unwrap();
    path
}

/// Configuration used by the integration tests.
pub fn test_config() -> ScanConfig {
    ScanConfig {
        module_output_path: "/build/modules".to_string(),
        ..Default::default()
    }
}

pub fn tool_for(
    index: ModuleIndex,
    config: ScanConfig,
) -> (DependencyScanTool, Arc<DiagnosticCollector>) {
    let diagnostics = Arc::new(DiagnosticCollector::new());
    let tool = DependencyScanTool::new(config, Arc::new(index), diagnostics.clone());
    (tool, diagnostics)
}

pub fn app(imports: &[&str]) -> MainModuleInput {
    imports.iter().fold(
        MainModuleInput::new("App").source_file("/src/App/main.nc"),
        |input, import| input.import(SourceImport::new(*import)),
    )
}
