//! Interfaces to the collaborators that actually look at the filesystem.
//!
//! The scanner never reads modules itself. A [`ScanningOracle`] hands every
//! worker its own [`ModuleLoader`] (NeXTCode modules) and
//! [`ClangScanningTool`] (Clang modules and headers). Instances are owned by
//! exactly one worker and are never shared between threads, so both traits
//! take `&mut self`.

use std::fmt;

use depscan_graph::{ClangModuleId, LinkLibrary, ModuleDependencyId, ModuleDependencyInfo};
use rustc_hash::FxHashSet;

/// Records produced by one lookup. The first entry is the module that was
/// asked for; the rest are modules discovered along the way.
pub type ModuleDependencyVector = Vec<(ModuleDependencyId, ModuleDependencyInfo)>;

/// Error reported by an oracle.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// Nothing by that name exists. Callers treat this as an empty result.
    #[error("module '{0}' not found")]
    ModuleNotFound(String),

    #[error("{0}")]
    Failed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Discovers NeXTCode modules (interfaces, binaries, placeholders).
pub trait ModuleLoader: Send + fmt::Debug {
    /// Looks `name` up on the search paths.
    ///
    /// Returns an empty vector when no NeXTCode module by that name exists.
    /// `testable` asks for a module built with testing enabled, which only a
    /// binary module can provide.
    fn scan_module(
        &mut self,
        name: &str,
        testable: bool,
    ) -> Result<ModuleDependencyVector, OracleError>;

    fn can_import_module(&self, name: &str) -> bool;
}

/// Arguments shared by both Clang queries.
#[derive(Debug, Clone, Copy)]
pub struct ClangScanRequest<'a> {
    /// Clang driver arguments of the scanning invocation.
    pub command_line: &'a [String],
    pub working_directory: &'a str,
    /// Modules this scan already knows; the tool may leave them out.
    pub already_seen: &'a FxHashSet<ClangModuleId>,
    /// Where explicitly built PCMs will go.
    pub module_output_path: &'a str,
}

/// One Clang module as reported by the scanning tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClangModuleDeps {
    pub id: ClangModuleId,
    pub module_map_file: String,
    pub file_deps: Vec<String>,
    pub clang_module_deps: Vec<ClangModuleId>,
    /// `-cc1` arguments needed to build the module.
    pub build_arguments: Vec<String>,
    pub link_libraries: Vec<LinkLibrary>,
    pub is_system: bool,
    pub cas_fs_root_id: Option<String>,
    pub include_tree_id: Option<String>,
}

/// Result of scanning a module by name. The requested module comes first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClangModuleGraph {
    pub modules: Vec<ClangModuleDeps>,
}

/// Result of scanning a header as its own translation unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationUnitDeps {
    pub file_deps: Vec<String>,
    /// Modules the header imports directly.
    pub clang_module_deps: Vec<ClangModuleId>,
    /// Modules not in the request's `already_seen` set.
    pub modules: Vec<ClangModuleDeps>,
    /// Arguments a later compile of the header needs.
    pub command_line: Vec<String>,
    pub cas_fs_root_id: Option<String>,
    pub include_tree_id: Option<String>,
}

/// The external Clang dependency scanner.
///
/// A module query returns the full closure of Clang modules not already in
/// `already_seen`. The scanner relies on this and never re-queues Clang
/// records.
pub trait ClangScanningTool: Send + fmt::Debug {
    fn module_dependencies(
        &mut self,
        name: &str,
        request: ClangScanRequest<'_>,
    ) -> Result<ClangModuleGraph, OracleError>;

    fn translation_unit_dependencies(
        &mut self,
        header: &str,
        request: ClangScanRequest<'_>,
    ) -> Result<TranslationUnitDeps, OracleError>;
}

/// Creates the per-worker loader instances.
pub trait ScanningOracle: Send + Sync + fmt::Debug {
    fn module_loader(&self) -> Box<dyn ModuleLoader>;

    fn clang_tool(&self) -> Box<dyn ClangScanningTool>;
}
