//! The dependency scanner: work-list resolution of a module graph.
//!
//! [`DependencyScanner::get_module_dependencies`] grows an ordered set of
//! module ids from a root. Each id is resolved once. Resolving a module means:
//!
//! 1. look up every import (fanned out over the thread pool, one task per
//!    distinct name);
//! 2. scan its bridging header or header import, if any;
//! 3. collect the Clang modules reachable from its direct Clang dependencies;
//! 4. look for a NeXTCode overlay of each of those Clang modules.
//!
//! Fan-out tasks only read the [`DependenciesCache`]. Their results are
//! folded in on the calling thread in import order, so the recorded graph and
//! the diagnostics do not depend on thread scheduling.

mod cross_import;
mod headers;
mod imports;
mod overlays;

use std::sync::Arc;

use depscan_config::ScanConfig;
use depscan_graph::{
    CROSS_IMPORT_DUMMY_MODULE, DependenciesCache, ModuleDependencyId, ModuleDependencyInfo,
    ModuleDependencyKind,
};
use indexmap::IndexSet;
use rayon::prelude::*;

use crate::diagnostics::DiagnosticSink;
use crate::oracle::ScanningOracle;
use crate::worker::{ScanningWorker, WorkerPool, WorkerSettings};
use crate::{Result, ScanError};

/// Resolves module dependency graphs with a fixed pool of workers.
#[derive(Debug)]
pub struct DependencyScanner {
    config: Arc<ScanConfig>,
    workers: WorkerPool,
    thread_pool: rayon::ThreadPool,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl DependencyScanner {
    /// Creates a scanner with `config.worker_count()` workers and as many
    /// threads.
    pub fn new(
        config: Arc<ScanConfig>,
        oracle: &dyn ScanningOracle,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Result<Self> {
        let size = config.worker_count();
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|index| format!("depscan-scan-{index}"))
            .build()
            .map_err(|err| ScanError::tooling("<thread pool>", err.to_string()))?;
        let settings = Arc::new(WorkerSettings::new(Arc::clone(&config)));
        let workers = WorkerPool::new(oracle, settings, size);
        tracing::debug!(workers = size, "Created dependency scanner");

        Ok(Self {
            config,
            workers,
            thread_pool,
            diagnostics,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> &Arc<dyn DiagnosticSink> {
        &self.diagnostics
    }

    pub fn worker_count(&self) -> usize {
        self.workers.size()
    }

    /// Resolves the full graph reachable from `root` and returns every module
    /// in discovery order, `root` first.
    ///
    /// When `root` is a source module and cross-import overlays are enabled,
    /// overlays declared between modules of the graph are discovered and
    /// appended afterwards.
    pub fn get_module_dependencies(
        &self,
        root: &ModuleDependencyId,
        cache: &mut DependenciesCache,
    ) -> Result<Vec<ModuleDependencyId>> {
        let mut all_modules = self.resolve_worklist(root, cache)?;

        if self.config.language.cross_import_overlays
            && root.kind == ModuleDependencyKind::Source
            && root.name != CROSS_IMPORT_DUMMY_MODULE
        {
            let modules: Vec<ModuleDependencyId> = all_modules.iter().cloned().collect();
            let discovered =
                self.discover_cross_import_overlay_dependencies(root, &modules, cache)?;
            all_modules.extend(discovered);
        }

        tracing::debug!(root = %root, modules = all_modules.len(), "Resolved module graph");
        Ok(all_modules.into_iter().collect())
    }

    fn resolve_worklist(
        &self,
        root: &ModuleDependencyId,
        cache: &mut DependenciesCache,
    ) -> Result<IndexSet<ModuleDependencyId>> {
        let mut all_modules: IndexSet<ModuleDependencyId> = IndexSet::new();
        all_modules.insert(root.clone());

        let mut index = 0;
        while let Some(id) = all_modules.get_index(index).cloned() {
            index += 1;
            let discovered = self.resolve_direct_module_dependencies(&id, cache)?;
            // Clang records arrive resolved; queuing them only walks their
            // recorded edges.
            let (clang, nextcode): (Vec<_>, Vec<_>) = discovered
                .into_iter()
                .partition(|dep| dep.kind == ModuleDependencyKind::Clang);
            all_modules.extend(nextcode);
            all_modules.extend(clang);
        }
        Ok(all_modules)
    }

    /// Resolves the direct and overlay dependencies of `id` and returns their
    /// union.
    ///
    /// Resolved records other than source modules are answered from the
    /// cache.
    pub fn resolve_direct_module_dependencies(
        &self,
        id: &ModuleDependencyId,
        cache: &mut DependenciesCache,
    ) -> Result<Vec<ModuleDependencyId>> {
        let info = cache.find_known_dependency(id)?;
        if info.is_resolved() && id.kind != ModuleDependencyKind::Source {
            return Ok(info.all_dependencies());
        }
        let _span = tracing::debug_span!("resolve", module = %id).entered();

        let mut direct: IndexSet<ModuleDependencyId> = IndexSet::new();
        self.resolve_import_dependencies(id, &info, cache, &mut direct)?;
        self.resolve_header_dependencies(id, cache, &mut direct)?;

        let mut clang_closure: IndexSet<String> = IndexSet::new();
        for dependency in &direct {
            if dependency.kind == ModuleDependencyKind::Clang {
                collect_imported_clang_modules(&dependency.name, cache, &mut clang_closure)?;
            }
        }

        let mut overlays: IndexSet<ModuleDependencyId> = IndexSet::new();
        self.resolve_nextcode_overlay_dependencies(id, &clang_closure, cache, &mut overlays)?;
        direct.extend(overlays.iter().cloned());

        cache.resolve_dependency_imports(id, direct.iter().cloned().collect())?;
        if !overlays.is_empty() {
            cache.set_overlay_dependencies(id, overlays.iter().cloned().collect())?;
        }
        tracing::debug!(
            direct = direct.len(),
            overlays = overlays.len(),
            "Resolved direct dependencies"
        );

        Ok(direct.into_iter().collect())
    }

    /// Looks a Clang module up by name, scanning for it when it is not cached.
    pub fn get_named_clang_module_dependency_info(
        &self,
        name: &str,
        cache: &mut DependenciesCache,
    ) -> Result<Option<Arc<ModuleDependencyInfo>>> {
        if let Some(info) = cache.find_dependency(name, Some(ModuleDependencyKind::Clang))? {
            return Ok(Some(info));
        }
        let found = self.workers.with_worker(|worker| {
            worker.scan_filesystem_for_clang_module_dependency(name, cache)
        })?;
        if found.is_empty() {
            return Ok(None);
        }
        cache.record_dependencies(found)?;
        Ok(cache.find_dependency(name, Some(ModuleDependencyKind::Clang))?)
    }

    /// Looks a NeXTCode module up by name, scanning for it when it is not
    /// cached.
    pub fn get_named_nextcode_module_dependency_info(
        &self,
        name: &str,
        cache: &mut DependenciesCache,
    ) -> Result<Option<Arc<ModuleDependencyInfo>>> {
        for kind in ModuleDependencyKind::NEXTCODE {
            if let Some(info) = cache.find_dependency(name, Some(kind))? {
                return Ok(Some(info));
            }
        }
        let found = self.workers.with_worker(|worker| {
            worker.scan_filesystem_for_nextcode_module_dependency(name, cache, false)
        })?;
        let Some(kind) = found.first().map(|(id, _)| id.kind) else {
            return Ok(None);
        };
        cache.record_dependencies(found)?;
        Ok(cache.find_dependency(name, Some(kind))?)
    }

    /// Asks a worker's module loader whether `name` could be imported.
    pub fn can_import_module(&self, name: &str) -> Result<bool> {
        self.workers
            .with_worker(|worker| Ok(worker.can_import_module(name)))
    }

    /// Runs `task` once per item on the thread pool, each run with its own
    /// checked-out worker. Results come back in item order.
    fn fan_out<T, R, F>(&self, items: &[T], task: F) -> Vec<Result<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&mut ScanningWorker, &T) -> Result<R> + Sync,
    {
        if items.is_empty() {
            return Vec::new();
        }
        tracing::trace!(tasks = items.len(), "Fanning out lookups");
        self.thread_pool.install(|| {
            items
                .par_iter()
                .map(|item| self.workers.with_worker(|worker| task(worker, item)))
                .collect()
        })
    }
}

/// Adds `name` and every Clang module reachable from it to `closure`, in
/// preorder.
fn collect_imported_clang_modules(
    name: &str,
    cache: &DependenciesCache,
    closure: &mut IndexSet<String>,
) -> Result<()> {
    let mut stack = vec![name.to_string()];
    while let Some(name) = stack.pop() {
        if closure.contains(&name) {
            continue;
        }
        let info = cache.find_known_dependency(&ModuleDependencyId::clang(name.clone()))?;
        closure.insert(name);
        for dependency in info.all_dependencies().into_iter().rev() {
            if dependency.kind == ModuleDependencyKind::Clang && !closure.contains(&dependency.name)
            {
                stack.push(dependency.name);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use depscan_graph::ScanningService;

    use super::*;
    use crate::index::{ClangModuleEntry, ModuleIndex};

    #[test]
    fn clang_closure_is_preorder() {
        let index = ModuleIndex::new()
            .add_clang_module(
                "Top",
                ClangModuleEntry::new("/sdk/Top.modulemap").dependencies(["Left", "Right"]),
            )
            .add_clang_module(
                "Left",
                ClangModuleEntry::new("/sdk/Left.modulemap").dependencies(["Leaf"]),
            )
            .add_clang_module("Right", ClangModuleEntry::new("/sdk/Right.modulemap"))
            .add_clang_module("Leaf", ClangModuleEntry::new("/sdk/Leaf.modulemap"))
            .clone();

        let config = Arc::new(ScanConfig::default());
        let diagnostics = Arc::new(crate::DiagnosticCollector::new());
        let scanner = DependencyScanner::new(Arc::clone(&config), &index, diagnostics).unwrap();
        let service = Arc::new(ScanningService::new());
        service.configure_for_context_hash("ctx");
        let mut cache = DependenciesCache::new(service, "App", "/out", "ctx");

        scanner
            .get_named_clang_module_dependency_info("Top", &mut cache)
            .unwrap()
            .unwrap();
        let mut closure = IndexSet::new();
        collect_imported_clang_modules("Top", &cache, &mut closure).unwrap();

        let order: Vec<&str> = closure.iter().map(String::as_str).collect();
        assert_eq!(order, ["Top", "Left", "Leaf", "Right"]);
    }
}
