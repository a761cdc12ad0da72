#![cfg_attr(docsrs, feature(doc_cfg))]

//! # depscan
//!
//! Module dependency scanning for explicitly built NeXTCode programs.
//!
//! Given a main module, the scanner discovers every module it transitively
//! depends on (textual interfaces, prebuilt binaries, placeholders, Clang
//! modules and the NeXTCode overlays of Clang modules), checks the graph for
//! cycles, and rewrites each module's build command line so that it can be
//! compiled without any implicit module search.
//!
//! ## Features
//!
//! - **Parallel lookups**: imports of a module are looked up concurrently on a
//!   fixed pool of scanning workers, with deterministic results
//! - **Shared cache**: one [`ScanningService`](depscan_graph::ScanningService)
//!   serves many scans, partitioned by scanning context
//! - **Explicit builds**: per-module `-nextcode-module-file` / `-fmodule-file`
//!   references, VFS overlay pruning and implicit link libraries
//! - **Content addressing**: optional CAS filesystem roots and cache keys
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use depscan::{
//!     DependencyScanTool, DiagnosticCollector, MainModuleInput, ModuleIndex, SourceImport,
//! };
//! use depscan_config::ScanConfig;
//!
//! # fn main() -> depscan::Result<()> {
//! let index = ModuleIndex::load(std::path::Path::new("modules.json"))?;
//! let diagnostics = Arc::new(DiagnosticCollector::new());
//! let tool = DependencyScanTool::new(ScanConfig::default(), Arc::new(index), diagnostics);
//!
//! let input = MainModuleInput::new("App")
//!     .source_file("/src/main.nc")
//!     .import(SourceImport::new("Foo"));
//! let graph = tool.perform_module_scan(&input)?;
//! println!("{}", graph.to_json()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! 1. [`DependencyScanner::get_module_dependencies`] resolves the graph.
//! 2. [`diagnose_cycle`] rejects cyclic graphs.
//! 3. [`resolve_implicit_link_libraries`] annotates the main module.
//! 4. [`resolve_dependency_command_lines`] finalizes every record.
//! 5. [`build_dependency_graph`] produces the JSON description.

pub mod cas;
pub mod clang_bridge;
pub mod command_line;
pub mod diagnose;
pub mod diagnostics;
pub mod error;
pub mod finalize;
pub mod index;
pub mod link_libraries;
pub mod main_module;
pub mod oracle;
pub mod output;
pub mod scan;
pub mod scanner;
pub mod worker;

// Fixture builders (available in test builds and when test-utils feature is enabled)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cas::{ContentId, ContentStore, DependencyTracker, InMemoryCas};
pub use diagnose::{diagnose_cycle, diagnose_scanner_failure};
pub use diagnostics::{
    Diagnostic, DiagnosticCollector, DiagnosticKind, DiagnosticSeverity, DiagnosticSink,
};
pub use error::{Result, ScanError};
pub use finalize::resolve_dependency_command_lines;
pub use index::{
    ClangModuleEntry, HeaderEntry, ModuleIndex, NeXTCodeEntryKind, NeXTCodeModuleEntry,
};
pub use link_libraries::{implicit_link_libraries, resolve_implicit_link_libraries};
pub use main_module::{MainModuleInput, SourceImport, main_module_dependency_info};
pub use oracle::{
    ClangModuleDeps, ClangModuleGraph, ClangScanRequest, ClangScanningTool, ModuleLoader,
    OracleError, ScanningOracle, TranslationUnitDeps,
};
pub use output::{
    DependencyGraph, ImportSet, ModuleDetailsEntry, ModuleEntry, build_dependency_graph,
};
pub use scan::{BatchScanInput, DependencyScanTool};
pub use scanner::DependencyScanner;
pub use worker::{ScanningWorker, WorkerPool};
