//! Fixtures for scanner tests.
//!
//! [`Fixture`] describes a module universe through a [`ModuleIndex`] and
//! builds a [`DependencyScanTool`] over it:
//!
//! ```ignore
//! use depscan::test_utils::{Fixture, main_module};
//!
//! let fixture = Fixture::new()
//!     .interface("Foo", &["Bar"])
//!     .clang("Bar", &[]);
//! let (graph, diagnostics) = fixture.scan(&main_module("App", &["Foo"]));
//!
//! assert!(graph.unwrap().module("clang:Bar").is_some());
//! assert!(!diagnostics.has_errors());
//! ```

use std::sync::Arc;

use depscan_config::ScanConfig;

use crate::Result;
use crate::diagnostics::DiagnosticCollector;
use crate::index::{ClangModuleEntry, HeaderEntry, ModuleIndex, NeXTCodeModuleEntry};
use crate::main_module::{MainModuleInput, SourceImport};
use crate::output::DependencyGraph;
use crate::scan::DependencyScanTool;

/// A module index plus the configuration to scan it with.
///
/// The implicit standard library import is off so that graphs contain only
/// what a test declares.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub index: ModuleIndex,
    pub config: ScanConfig,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    pub fn new() -> Self {
        let mut config = ScanConfig::default();
        config.language.implicit_stdlib_import = false;
        config.module_output_path = "/build/modules".to_string();
        Self {
            index: ModuleIndex::new(),
            config,
        }
    }

    /// Adds a textual interface module at `/sdk/<name>.codeinterface`.
    pub fn interface(self, name: &str, imports: &[&str]) -> Self {
        let entry = NeXTCodeModuleEntry::interface(format!("/sdk/{name}.codeinterface"))
            .imports(imports.iter().copied());
        self.nextcode_entry(name, entry)
    }

    /// Adds a binary module at `/sdk/<name>.codemodule`.
    pub fn binary(self, name: &str, imports: &[&str]) -> Self {
        let entry = NeXTCodeModuleEntry::binary(format!("/sdk/{name}.codemodule"))
            .imports(imports.iter().copied());
        self.nextcode_entry(name, entry)
    }

    pub fn placeholder(self, name: &str) -> Self {
        self.nextcode_entry(
            name,
            NeXTCodeModuleEntry::placeholder(format!("/placeholders/{name}.codemodule")),
        )
    }

    /// Adds a Clang module with its module map at `/sdk/<name>/module.modulemap`.
    pub fn clang(self, name: &str, dependencies: &[&str]) -> Self {
        let entry = ClangModuleEntry::new(format!("/sdk/{name}/module.modulemap"))
            .dependencies(dependencies.iter().copied());
        self.clang_entry(name, entry)
    }

    pub fn system_clang(self, name: &str, dependencies: &[&str]) -> Self {
        let entry = ClangModuleEntry::new(format!("/sdk/{name}/module.modulemap"))
            .dependencies(dependencies.iter().copied())
            .system();
        self.clang_entry(name, entry)
    }

    /// Adds a header that imports `modules`.
    pub fn header(mut self, path: &str, modules: &[&str]) -> Self {
        self.index.add_header(
            path,
            HeaderEntry {
                modules: modules.iter().map(|name| name.to_string()).collect(),
                ..Default::default()
            },
        );
        self
    }

    pub fn nextcode_entry(mut self, name: &str, entry: NeXTCodeModuleEntry) -> Self {
        self.index.add_nextcode_module(name, entry);
        self
    }

    pub fn clang_entry(mut self, name: &str, entry: ClangModuleEntry) -> Self {
        self.index.add_clang_module(name, entry);
        self
    }

    /// Scans with `jobs` workers.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.config.parallel = jobs > 1;
        self.config.jobs = Some(jobs);
        self
    }

    pub fn configure(mut self, f: impl FnOnce(&mut ScanConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn tool(&self) -> (DependencyScanTool, Arc<DiagnosticCollector>) {
        let diagnostics = Arc::new(DiagnosticCollector::new());
        let tool = DependencyScanTool::new(
            self.config.clone(),
            Arc::new(self.index.clone()),
            diagnostics.clone(),
        );
        (tool, diagnostics)
    }

    /// Runs a full scan with a fresh tool.
    pub fn scan(
        &self,
        input: &MainModuleInput,
    ) -> (Result<DependencyGraph>, Arc<DiagnosticCollector>) {
        let (tool, diagnostics) = self.tool();
        (tool.perform_module_scan(input), diagnostics)
    }
}

/// A main module with one source file importing `imports`.
pub fn main_module(name: &str, imports: &[&str]) -> MainModuleInput {
    imports.iter().fold(
        MainModuleInput::new(name).source_file(format!("/src/{name}/main.nc")),
        |input, import| input.import(SourceImport::new(*import)),
    )
}
