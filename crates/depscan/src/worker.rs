//! Scanning workers and the pool that lends them out.
//!
//! A [`ScanningWorker`] owns one NeXTCode module loader and one Clang
//! scanning tool. The [`WorkerPool`] holds a fixed number of workers; a fan-out
//! task checks one out, uses it, and the [`WorkerGuard`] puts it back when
//! dropped. Workers only read the [`DependenciesCache`]; all recording happens
//! on the orchestrating thread.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use depscan_config::ScanConfig;
use depscan_graph::{DependenciesCache, ModuleDependencyKind, ModuleDetails};
use parking_lot::{Mutex, MutexGuard};

use crate::clang_bridge::bridge_clang_modules;
use crate::command_line::{extra_pcm_args, interface_build_command_line};
use crate::oracle::{
    ClangScanRequest, ClangScanningTool, ModuleDependencyVector, ModuleLoader, OracleError,
    ScanningOracle,
};
use crate::{Result, ScanError};

/// Settings every worker shares.
#[derive(Debug)]
pub struct WorkerSettings {
    pub config: Arc<ScanConfig>,
    /// Driver arguments handed to the Clang scanning tool.
    pub clang_command_line: Vec<String>,
    pub working_directory: String,
}

impl WorkerSettings {
    pub fn new(config: Arc<ScanConfig>) -> Self {
        let target = config
            .target
            .clang_target
            .clone()
            .unwrap_or_else(|| config.target.triple.clone());
        let mut clang_command_line = vec!["-target".to_string(), target];
        for overlay in &config.search.vfs_overlays {
            clang_command_line.push("-ivfsoverlay".into());
            clang_command_line.push(overlay.clone());
        }
        clang_command_line.extend(config.search.clang_args.iter().cloned());

        let working_directory = config.search.working_directory.clone().unwrap_or_else(|| {
            std::env::current_dir()
                .map(|dir| dir.display().to_string())
                .unwrap_or_else(|_| ".".to_string())
        });

        Self {
            config,
            clang_command_line,
            working_directory,
        }
    }
}

/// Dependencies of a bridging header or binary module header import.
#[derive(Debug, Default)]
pub struct HeaderDependencies {
    pub file_deps: Vec<String>,
    /// Clang modules the header imports directly.
    pub module_names: Vec<String>,
    /// Newly discovered Clang modules.
    pub modules: ModuleDependencyVector,
    pub command_line: Vec<String>,
    pub cas_fs_root_id: Option<String>,
    pub include_tree: Option<String>,
}

#[derive(Debug)]
pub struct ScanningWorker {
    module_loader: Box<dyn ModuleLoader>,
    clang_tool: Box<dyn ClangScanningTool>,
    settings: Arc<WorkerSettings>,
}

impl ScanningWorker {
    pub fn new(oracle: &dyn ScanningOracle, settings: Arc<WorkerSettings>) -> Self {
        Self {
            module_loader: oracle.module_loader(),
            clang_tool: oracle.clang_tool(),
            settings,
        }
    }

    /// NeXTCode loader first, then Clang. An empty vector means neither
    /// found anything.
    pub fn scan_filesystem_for_module_dependency(
        &mut self,
        name: &str,
        cache: &DependenciesCache,
        testable: bool,
    ) -> Result<ModuleDependencyVector> {
        let found = self.scan_filesystem_for_nextcode_module_dependency(name, cache, testable)?;
        if !found.is_empty() {
            return Ok(found);
        }
        self.scan_filesystem_for_clang_module_dependency(name, cache)
    }

    pub fn scan_filesystem_for_nextcode_module_dependency(
        &mut self,
        name: &str,
        cache: &DependenciesCache,
        testable: bool,
    ) -> Result<ModuleDependencyVector> {
        let mut found = match self.module_loader.scan_module(name, testable) {
            Ok(found) => found,
            Err(OracleError::ModuleNotFound(_)) => return Ok(Vec::new()),
            Err(err) => return Err(ScanError::tooling(name, err.to_string())),
        };
        for (id, info) in &mut found {
            if id.kind != ModuleDependencyKind::Interface {
                continue;
            }
            let config = &self.settings.config;
            if let ModuleDetails::Interface(details) = info.details_mut()? {
                if details.module_output_path.is_empty() {
                    details.module_output_path = format!(
                        "{}/{}-{}.codemodule",
                        cache.module_output_path().trim_end_matches('/'),
                        id.name,
                        cache.context_hash()
                    );
                }
                if details.context_hash.is_empty() {
                    details.context_hash = cache.context_hash().to_string();
                }
                if details.textual.build_command_line.is_empty() {
                    details.textual.build_command_line = interface_build_command_line(
                        &id.name,
                        &details.interface_file,
                        &details.module_output_path,
                        config,
                    );
                }
                if details.textual.extra_pcm_args.is_empty() {
                    details.textual.extra_pcm_args = extra_pcm_args(config);
                }
            }
        }
        tracing::trace!(module = name, found = found.len(), "NeXTCode lookup");
        Ok(found)
    }

    /// A "not found" answer from the Clang tool is an empty result, not an
    /// error.
    pub fn scan_filesystem_for_clang_module_dependency(
        &mut self,
        name: &str,
        cache: &DependenciesCache,
    ) -> Result<ModuleDependencyVector> {
        let request = Self::request(&self.settings, cache);
        let graph = match self.clang_tool.module_dependencies(name, request) {
            Ok(graph) => graph,
            Err(OracleError::ModuleNotFound(_)) => return Ok(Vec::new()),
            Err(err) => return Err(ScanError::tooling(name, err.to_string())),
        };
        tracing::trace!(module = name, found = graph.modules.len(), "Clang lookup");
        Ok(bridge_clang_modules(
            graph.modules,
            cache.module_output_path(),
            &self.settings.config,
        ))
    }

    pub fn scan_header_dependencies(
        &mut self,
        header: &str,
        cache: &DependenciesCache,
    ) -> Result<HeaderDependencies> {
        let request = Self::request(&self.settings, cache);
        let unit = self
            .clang_tool
            .translation_unit_dependencies(header, request)
            .map_err(|err| ScanError::tooling(header, err.to_string()))?;

        Ok(HeaderDependencies {
            file_deps: unit.file_deps,
            module_names: unit
                .clang_module_deps
                .into_iter()
                .map(|id| id.name)
                .collect(),
            modules: bridge_clang_modules(
                unit.modules,
                cache.module_output_path(),
                &self.settings.config,
            ),
            command_line: unit.command_line,
            cas_fs_root_id: unit.cas_fs_root_id,
            include_tree: unit.include_tree_id,
        })
    }

    pub fn can_import_module(&self, name: &str) -> bool {
        self.module_loader.can_import_module(name)
    }

    /// Borrows only the settings so the Clang tool stays mutably borrowable.
    fn request<'a>(
        settings: &'a WorkerSettings,
        cache: &'a DependenciesCache,
    ) -> ClangScanRequest<'a> {
        ClangScanRequest {
            command_line: &settings.clang_command_line,
            working_directory: &settings.working_directory,
            already_seen: cache.seen_clang_modules(),
            module_output_path: cache.module_output_path(),
        }
    }
}

/// Fixed-size set of workers.
///
/// Each worker lives in its own slot. The idle queue holds the indices of
/// slots nobody has checked out.
#[derive(Debug)]
pub struct WorkerPool {
    slots: Vec<Mutex<ScanningWorker>>,
    idle: Mutex<VecDeque<usize>>,
}

impl WorkerPool {
    pub fn new(oracle: &dyn ScanningOracle, settings: Arc<WorkerSettings>, size: usize) -> Self {
        let size = size.max(1);
        let slots = (0..size)
            .map(|_| Mutex::new(ScanningWorker::new(oracle, Arc::clone(&settings))))
            .collect();
        Self {
            slots,
            idle: Mutex::new((0..size).collect()),
        }
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Takes a worker. Fails when more tasks run at once than the pool has
    /// workers, which the scanner's thread pool sizing rules out.
    pub fn checkout(&self) -> Result<WorkerGuard<'_>> {
        let slot = self
            .idle
            .lock()
            .pop_back()
            .ok_or(ScanError::WorkerPoolExhausted { size: self.size() })?;
        Ok(WorkerGuard {
            pool: self,
            slot,
            worker: self.slots[slot].lock(),
        })
    }

    /// Runs `f` with a checked-out worker.
    pub fn with_worker<R>(&self, f: impl FnOnce(&mut ScanningWorker) -> Result<R>) -> Result<R> {
        let mut guard = self.checkout()?;
        f(&mut guard)
    }
}

/// A checked-out worker; its slot goes back to the idle queue on drop.
#[derive(Debug)]
pub struct WorkerGuard<'a> {
    pool: &'a WorkerPool,
    slot: usize,
    worker: MutexGuard<'a, ScanningWorker>,
}

impl Deref for WorkerGuard<'_> {
    type Target = ScanningWorker;

    fn deref(&self) -> &ScanningWorker {
        &self.worker
    }
}

impl DerefMut for WorkerGuard<'_> {
    fn deref_mut(&mut self) -> &mut ScanningWorker {
        &mut self.worker
    }
}

impl Drop for WorkerGuard<'_> {
    fn drop(&mut self) {
        self.pool.idle.lock().push_front(self.slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ModuleIndex;

    fn pool(size: usize) -> WorkerPool {
        let oracle = ModuleIndex::default();
        let settings = Arc::new(WorkerSettings::new(Arc::new(ScanConfig::default())));
        WorkerPool::new(&oracle, settings, size)
    }

    #[test]
    fn guard_returns_worker_on_drop() {
        let pool = pool(2);
        {
            let _a = pool.checkout().unwrap();
            assert_eq!(pool.idle_count(), 1);
        }
        assert_eq!(pool.idle_count(), 2);
    }

    #[test]
    fn exhausted_pool_is_an_error() {
        let pool = pool(1);
        let _held = pool.checkout().unwrap();
        let err = pool.checkout().unwrap_err();
        assert!(matches!(err, ScanError::WorkerPoolExhausted { size: 1 }));
    }

    #[test]
    fn with_worker_releases_on_error() {
        let pool = pool(1);
        let result: Result<()> = pool.with_worker(|_| Err(ScanError::InvalidInput("boom".into())));
        assert!(result.is_err());
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn settings_forward_clang_target_and_overlays() {
        let mut config = ScanConfig::default();
        config.target.clang_target = Some("arm64-apple-macos14".into());
        config.search.vfs_overlays = vec!["/o.yaml".into()];
        config.search.clang_args = vec!["-DFOO".into()];
        config.search.working_directory = Some("/work".into());

        let settings = WorkerSettings::new(Arc::new(config));
        assert_eq!(
            settings.clang_command_line,
            vec!["-target", "arm64-apple-macos14", "-ivfsoverlay", "/o.yaml", "-DFOO"]
        );
        assert_eq!(settings.working_directory, "/work");
    }

    /// Clang query seen by [`RecordingTool`]: what was asked, the names in
    /// `already_seen` and the output path.
    type Query = (String, Vec<String>, String);

    #[derive(Debug, Clone, Default)]
    struct RecordingTool {
        queries: Arc<Mutex<Vec<Query>>>,
    }

    impl RecordingTool {
        fn record(&self, subject: &str, request: ClangScanRequest<'_>) {
            let mut seen: Vec<String> =
                request.already_seen.iter().map(|id| id.name.clone()).collect();
            seen.sort();
            self.queries.lock().push((
                subject.to_string(),
                seen,
                request.module_output_path.to_string(),
            ));
        }
    }

    impl ClangScanningTool for RecordingTool {
        fn module_dependencies(
            &mut self,
            name: &str,
            request: ClangScanRequest<'_>,
        ) -> std::result::Result<crate::oracle::ClangModuleGraph, OracleError> {
            self.record(name, request);
            Err(OracleError::ModuleNotFound(name.to_string()))
        }

        fn translation_unit_dependencies(
            &mut self,
            header: &str,
            request: ClangScanRequest<'_>,
        ) -> std::result::Result<crate::oracle::TranslationUnitDeps, OracleError> {
            self.record(header, request);
            Ok(Default::default())
        }
    }

    #[derive(Debug)]
    struct NoModules;

    impl ModuleLoader for NoModules {
        fn scan_module(
            &mut self,
            name: &str,
            _testable: bool,
        ) -> std::result::Result<ModuleDependencyVector, OracleError> {
            Err(OracleError::ModuleNotFound(name.to_string()))
        }

        fn can_import_module(&self, _name: &str) -> bool {
            false
        }
    }

    #[derive(Debug)]
    struct RecordingOracle {
        tool: RecordingTool,
    }

    impl ScanningOracle for RecordingOracle {
        fn module_loader(&self) -> Box<dyn ModuleLoader> {
            Box::new(NoModules)
        }

        fn clang_tool(&self) -> Box<dyn ClangScanningTool> {
            Box::new(self.tool.clone())
        }
    }

    #[test]
    fn clang_queries_carry_cache_state_across_checkouts() {
        let tool = RecordingTool::default();
        let oracle = RecordingOracle { tool: tool.clone() };
        let settings = Arc::new(WorkerSettings::new(Arc::new(ScanConfig::default())));
        let pool = WorkerPool::new(&oracle, settings, 1);

        let mut cache = DependenciesCache::new(
            Arc::new(depscan_graph::ScanningService::new()),
            "App",
            "/build/modules",
            "ctx",
        );
        cache.add_seen_clang_module(depscan_graph::ClangModuleId::new("Seen", "ctx"));

        let found = pool
            .with_worker(|worker| worker.scan_filesystem_for_clang_module_dependency("Bar", &cache))
            .unwrap();
        assert!(found.is_empty());
        assert_eq!(pool.idle_count(), 1);

        let header = pool
            .with_worker(|worker| worker.scan_header_dependencies("/src/App/Bridging.h", &cache))
            .unwrap();
        assert!(header.module_names.is_empty());
        assert_eq!(pool.idle_count(), 1);

        let queries = tool.queries.lock().clone();
        assert_eq!(
            queries,
            vec![
                ("Bar".to_string(), vec!["Seen".to_string()], "/build/modules".to_string()),
                (
                    "/src/App/Bridging.h".to_string(),
                    vec!["Seen".to_string()],
                    "/build/modules".to_string()
                ),
            ]
        );
    }
}
