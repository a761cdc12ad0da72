use depscan_graph::{DependenciesCache, ModuleDependencyId, ModuleDependencyInfo, ModuleDetails};
use indexmap::IndexSet;

use super::DependencyScanner;
use crate::Result;
use crate::command_line::xcc;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::worker::HeaderDependencies;

impl DependencyScanner {
    /// Folds the Clang modules imported by the bridging header (or a binary
    /// module's header import) of `id` into `direct`.
    ///
    /// The header is scanned once; later resolutions reuse what was stored on
    /// the record. A failed header scan is reported as a warning and adds
    /// nothing.
    pub(super) fn resolve_header_dependencies(
        &self,
        id: &ModuleDependencyId,
        cache: &mut DependenciesCache,
        direct: &mut IndexSet<ModuleDependencyId>,
    ) -> Result<()> {
        let info = cache.find_known_dependency(id)?;
        let Some(header) = info.bridging_header().map(str::to_string) else {
            return Ok(());
        };

        let module_names = if info.header_dependencies_scanned() {
            info.header_dependencies().to_vec()
        } else {
            let shared: &DependenciesCache = cache;
            let scanned = self
                .workers
                .with_worker(|worker| worker.scan_header_dependencies(&header, shared));
            match scanned {
                Ok(dependencies) => {
                    store_header_dependencies(id, info.as_ref().clone(), dependencies, cache)?
                }
                Err(err) => {
                    tracing::warn!(header = %header, error = %err, "Header scan failed");
                    self.diagnostics
                        .diagnose(Diagnostic::warning(DiagnosticKind::HeaderScanFailed {
                            header,
                            reason: err.to_string(),
                        }));
                    return Ok(());
                }
            }
        };

        for name in module_names {
            let dependency = ModuleDependencyId::clang(name);
            if cache.has_dependency_id(&dependency)? {
                direct.insert(dependency);
            } else {
                tracing::debug!(module = %dependency.name, "Header module was not reported");
            }
        }
        Ok(())
    }
}

/// Records newly found Clang modules and attaches the header's results to
/// the record of `id`. Returns the header's direct Clang imports.
fn store_header_dependencies(
    id: &ModuleDependencyId,
    mut info: ModuleDependencyInfo,
    dependencies: HeaderDependencies,
    cache: &mut DependenciesCache,
) -> Result<Vec<String>> {
    let HeaderDependencies {
        file_deps,
        module_names,
        modules,
        command_line,
        cas_fs_root_id,
        include_tree,
    } = dependencies;

    cache.record_dependencies(modules)?;
    info.set_header_dependencies(file_deps, module_names.clone())?;

    match info.details_mut()? {
        ModuleDetails::Source(details) => {
            details.bridging_header_command_line = xcc(command_line);
            details.textual.bridging_header_include_tree = include_tree;
            if details.textual.cas_fs_root_id.is_none() {
                details.textual.cas_fs_root_id = cas_fs_root_id;
            }
        }
        ModuleDetails::Interface(details) => {
            details.textual.bridging_header_include_tree = include_tree;
            if details.textual.cas_fs_root_id.is_none() {
                details.textual.cas_fs_root_id = cas_fs_root_id;
            }
        }
        _ => {}
    }

    cache.update_dependency(id, info)?;
    Ok(module_names)
}
