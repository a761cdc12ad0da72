//! Turns the resolved graph into explicit build instructions.
//!
//! Modules are visited dependencies-first. Each buildable module gets its
//! command line extended with one reference per module in its transitive
//! closure. With CAS enabled its inputs are snapshotted and a cache key is
//! derived from the final arguments. Unused VFS overlays are then pruned and
//! the record is finalized.

use std::collections::BTreeSet;
use std::sync::Arc;

use depscan_config::ScanConfig;
use depscan_graph::{
    DependenciesCache, ModuleDependencyId, ModuleDependencyInfo, ModuleDependencyKind,
    ModuleDetails, TransitiveClosure, transitive_closure,
};
use rustc_hash::FxHashSet;

use crate::cas::{ContentId, ContentStore, DependencyTracker};
use crate::command_line::{prune_vfs_overlays, referenced_vfs_overlays, remap_command_line, xcc};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::{Result, ScanError};

/// Finalizes every module of `topological_order`.
///
/// `topological_order` lists dependents before their dependencies, as
/// returned by [`depscan_graph::topological_sort`]. Already finalized records
/// are left alone, so a shared service can be finalized by several scans.
pub fn resolve_dependency_command_lines(
    config: &ScanConfig,
    cas: Option<&dyn ContentStore>,
    sink: &dyn DiagnosticSink,
    cache: &mut DependenciesCache,
    topological_order: &[ModuleDependencyId],
) -> Result<()> {
    let closures = transitive_closure(topological_order, |id| cache.all_dependencies(id))?;
    let empty = BTreeSet::new();

    for id in topological_order.iter().rev() {
        // Placeholders carry no command line and stay resolved.
        if id.kind == ModuleDependencyKind::Placeholder {
            continue;
        }
        let info = cache.find_known_dependency(id)?;
        if info.is_finalized() {
            continue;
        }
        let closure = closures.get(id).unwrap_or(&empty);
        let finalizer = Finalizer {
            config,
            cas,
            cache: &*cache,
            closures: &closures,
        };
        let finalized = finalizer.finalize(id, &info, closure).inspect_err(|err| {
            if let ScanError::Cas(reason) = err {
                sink.diagnose(Diagnostic::error(DiagnosticKind::CasFailure {
                    module: id.name.clone(),
                    reason: reason.clone(),
                }));
            }
        })?;
        cache.update_dependency(id, finalized)?;
    }
    tracing::debug!(modules = topological_order.len(), "Finalized command lines");
    Ok(())
}

/// Everything one module's finalization reads.
struct Finalizer<'a> {
    config: &'a ScanConfig,
    cas: Option<&'a dyn ContentStore>,
    cache: &'a DependenciesCache,
    closures: &'a TransitiveClosure,
}

impl Finalizer<'_> {
    fn finalize(
        &self,
        id: &ModuleDependencyId,
        info: &ModuleDependencyInfo,
        closure: &BTreeSet<ModuleDependencyId>,
    ) -> Result<ModuleDependencyInfo> {
        let mut updated = info.clone();
        let mut command_line = info.command_line().to_vec();
        let mut root_ids: Vec<String> =
            info.cas_fs_root_id().map(str::to_string).into_iter().collect();
        let mut include_trees: Vec<String> =
            info.clang_include_tree().map(str::to_string).into_iter().collect();

        if let Some(cas) = self.cas {
            if id.kind == ModuleDependencyKind::Source
                && info.clang_include_tree().is_none()
                && !info.header_input_source_files().is_empty()
            {
                let tree = cas.create_tree(info.header_input_source_files())?;
                root_ids.push(tree.to_string());
            }
        }

        let mut clang_dependencies: Vec<Arc<ModuleDependencyInfo>> = Vec::new();
        for dependency in closure {
            let dependency_info = self.cache.find_known_dependency(dependency)?;
            let name = &dependency.name;
            match dependency_info.details() {
                ModuleDetails::Interface(details) => {
                    let path = dependency_info
                        .module_cache_key()
                        .unwrap_or(&details.module_output_path);
                    command_line.push(format!("-nextcode-module-file={name}={path}"));
                    if updated.is_textual_module() {
                        for (macro_name, macro_dependency) in &details.textual.macro_dependencies {
                            updated.add_macro_dependency(macro_name, macro_dependency.clone())?;
                        }
                    }
                }
                ModuleDetails::Binary(details) => {
                    let path = dependency_info
                        .module_cache_key()
                        .unwrap_or(&details.compiled_module_path);
                    command_line.push(format!("-nextcode-module-file={name}={path}"));
                    for header_module in &details.header_module_dependencies {
                        let header_id = ModuleDependencyId::clang(header_module.as_str());
                        if let Some(clang) = self.cache.find_dependency_by_id(&header_id)? {
                            if let Some(clang) = clang.as_clang() {
                                let module_map =
                                    self.config.cas.remap_path(&clang.module_map_file);
                                command_line
                                    .extend(xcc([format!("-fmodule-map-file={module_map}")]));
                            }
                        }
                    }
                }
                ModuleDetails::Placeholder(details) => {
                    command_line.push(format!(
                        "-nextcode-module-file={name}={}",
                        details.compiled_module_path
                    ));
                }
                ModuleDetails::Clang(details) => {
                    if id.kind != ModuleDependencyKind::Clang {
                        let pcm = &details.mapped_pcm_path;
                        command_line.extend(xcc([format!("-fmodule-file={name}={pcm}")]));
                    }
                    if let Some(key) = dependency_info.module_cache_key() {
                        command_line.extend(xcc([
                            "-fmodule-file-cache-key",
                            details.mapped_pcm_path.as_str(),
                            key,
                        ]));
                    }
                    root_ids.extend(details.cas_fs_root_id.iter().cloned());
                    include_trees.extend(details.include_tree.iter().cloned());
                    clang_dependencies.push(Arc::clone(&dependency_info));
                }
                ModuleDetails::Source(_) => {}
            }
        }

        if let Some(cas) = self.cas {
            self.snapshot_inputs(cas, id, &mut updated, &mut root_ids)?;
            if matches!(
                id.kind,
                ModuleDependencyKind::Interface | ModuleDependencyKind::Source
            ) {
                for root in dedup(root_ids) {
                    command_line.extend(["-cas-fs".to_string(), root]);
                }
                for tree in dedup(include_trees) {
                    command_line.extend(["-clang-include-tree-root".to_string(), tree]);
                }
            }
            if id.kind == ModuleDependencyKind::Source {
                self.add_bridging_header_cache_keys(&mut updated)?;
            }
        }

        if id.kind != ModuleDependencyKind::Clang {
            let mut used: FxHashSet<&str> = FxHashSet::default();
            for clang in &clang_dependencies {
                referenced_vfs_overlays(clang.command_line(), &mut used);
            }
            command_line = prune_vfs_overlays(&command_line, &used);
        }

        if matches!(
            id.kind,
            ModuleDependencyKind::Interface
                | ModuleDependencyKind::Source
                | ModuleDependencyKind::Clang
        ) {
            updated.update_command_line(remap_command_line(&command_line, &self.config.cas))?;
        }

        if let Some(cas) = self.cas {
            self.compute_cache_key(cas, &mut updated)?;
        }

        updated.set_finalized()?;
        Ok(updated)
    }

    /// Snapshots the files a textual module was resolved from and makes the
    /// tree its CAS filesystem root.
    fn snapshot_inputs(
        &self,
        cas: &dyn ContentStore,
        id: &ModuleDependencyId,
        updated: &mut ModuleDependencyInfo,
        root_ids: &mut Vec<String>,
    ) -> Result<()> {
        let mut tracker = DependencyTracker::new();
        match updated.details() {
            ModuleDetails::Source(details) => {
                tracker.add_files(self.config.search.search_path_files.iter().cloned());
                tracker.add_files(details.source_files.iter().cloned());
                tracker.add_files(updated.auxiliary_files().iter().cloned());
                tracker.add_files(
                    details
                        .textual
                        .macro_dependencies
                        .values()
                        .map(|dependency| dependency.library_path.clone()),
                );
            }
            ModuleDetails::Interface(details) => {
                tracker.add_files(self.config.search.search_path_files.iter().cloned());
                tracker.add_file(details.interface_file.clone());
                tracker.add_files(updated.auxiliary_files().iter().cloned());
            }
            _ => return Ok(()),
        }

        let root = tracker.create_tree(cas)?;
        tracing::trace!(module = %id, root = %root, "Snapshotted module inputs");
        updated.update_cas_fs_root_id(root.as_hex())?;
        root_ids.push(root.to_string());
        Ok(())
    }

    /// Adds cache keys of the Clang modules a source module's bridging header
    /// depends on to the header's own command line.
    fn add_bridging_header_cache_keys(&self, updated: &mut ModuleDependencyInfo) -> Result<()> {
        let mut header_modules: BTreeSet<ModuleDependencyId> = BTreeSet::new();
        for name in updated.header_dependencies() {
            let id = ModuleDependencyId::clang(name.as_str());
            if let Some(closure) = self.closures.get(&id) {
                header_modules.extend(closure.iter().cloned());
            }
            header_modules.insert(id);
        }

        let mut arguments = Vec::new();
        for id in &header_modules {
            let Some(info) = self.cache.find_dependency_by_id(id)? else {
                continue;
            };
            if let (Some(clang), Some(key)) = (info.as_clang(), info.module_cache_key()) {
                arguments.extend(xcc([
                    "-fmodule-file-cache-key",
                    clang.mapped_pcm_path.as_str(),
                    key,
                ]));
            }
        }

        if let ModuleDetails::Source(details) = updated.details_mut()? {
            details.bridging_header_command_line.extend(arguments);
        }
        Ok(())
    }

    fn compute_cache_key(
        &self,
        cas: &dyn ContentStore,
        updated: &mut ModuleDependencyInfo,
    ) -> Result<()> {
        let key = match updated.details() {
            ModuleDetails::Interface(details) => {
                let input = self.config.cas.remap_path(&details.interface_file);
                let key = cas.compute_cache_key(tail(updated.command_line()), &input)?;
                let value = updated
                    .cas_fs_root_id()
                    .map(ContentId::from_hex)
                    .unwrap_or_else(|| key.clone());
                cas.action_cache_put(&key, &value)?;
                key
            }
            ModuleDetails::Clang(details) => {
                let input = self.config.cas.remap_path(&details.module_map_file);
                let key = cas.compute_cache_key(tail(updated.command_line()), &input)?;
                let value = details
                    .cas_fs_root_id
                    .clone()
                    .map(ContentId::from_hex)
                    .unwrap_or_else(|| key.clone());
                cas.action_cache_put(&key, &value)?;
                key
            }
            ModuleDetails::Binary(details) => {
                let key = cas.file_content_id(&details.compiled_module_path)?;
                cas.action_cache_put(&key, &key)?;
                key
            }
            _ => return Ok(()),
        };
        updated.update_module_cache_key(key.as_hex())?;
        Ok(())
    }
}

/// Arguments after the leading `-frontend`.
fn tail(command_line: &[String]) -> &[String] {
    command_line.get(1..).unwrap_or_default()
}

fn dedup(values: Vec<String>) -> Vec<String> {
    let mut seen = FxHashSet::default();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}
