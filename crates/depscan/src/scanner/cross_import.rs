use depscan_graph::{
    CROSS_IMPORT_DUMMY_MODULE, DependenciesCache, ModuleDependencyId, ModuleDependencyInfo,
    SourceDetails,
};
use indexmap::IndexSet;
use rustc_hash::FxHashSet;

use super::DependencyScanner;
use crate::Result;
use crate::diagnostics::{Diagnostic, DiagnosticKind};

impl DependencyScanner {
    /// Finds overlays declared between pairs of modules that both appear in
    /// `all_modules` and resolves them into the graph of `main`.
    ///
    /// The overlays are imported by a synthetic source module whose graph is
    /// resolved like any other. Its direct dependencies are then added to
    /// `main`, whose command line is told about every declaration file so a
    /// build does not search for them again. Returns the newly discovered
    /// modules.
    pub(super) fn discover_cross_import_overlay_dependencies(
        &self,
        main: &ModuleDependencyId,
        all_modules: &[ModuleDependencyId],
        cache: &mut DependenciesCache,
    ) -> Result<Vec<ModuleDependencyId>> {
        let dependencies = all_modules.get(1..).unwrap_or_default();
        let present: FxHashSet<&str> = dependencies.iter().map(|id| id.name.as_str()).collect();

        let mut overlay_files: IndexSet<(String, String)> = IndexSet::new();
        let mut new_overlays: IndexSet<String> = IndexSet::new();
        for dependency in dependencies {
            let info = cache.find_known_dependency(dependency)?;
            let Some(declarations) = info.cross_import_overlays().filter(|map| !map.is_empty())
            else {
                continue;
            };
            for (secondary, declaration) in declarations {
                overlay_files.insert((dependency.name.clone(), declaration.file.clone()));
                if secondary == &dependency.name || !present.contains(secondary.as_str()) {
                    continue;
                }
                for overlay in &declaration.overlays {
                    if overlay != &main.name && !present.contains(overlay.as_str()) {
                        new_overlays.insert(overlay.clone());
                    }
                }
            }
        }

        if new_overlays.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(overlays = ?new_overlays, "Resolving cross-import overlays");

        let dummy = ModuleDependencyId::source(CROSS_IMPORT_DUMMY_MODULE);
        let mut dummy_info = ModuleDependencyInfo::new(SourceDetails::default());
        for overlay in &new_overlays {
            dummy_info.add_module_import(overlay, None);
        }
        if cache.has_dependency_id(&dummy)? {
            cache.update_dependency(&dummy, dummy_info)?;
        } else {
            cache.record_dependency(CROSS_IMPORT_DUMMY_MODULE, dummy_info)?;
        }
        let discovered = self.resolve_worklist(&dummy, cache)?;

        let main_info = cache.find_known_dependency(main)?;
        let mut direct = main_info.direct_dependencies().to_vec();
        for dependency in cache.only_direct_dependencies(&dummy)? {
            if !direct.contains(&dependency) {
                direct.push(dependency);
            }
        }

        let mut updated = main_info.as_ref().clone();
        updated.resolve_direct_dependencies(direct)?;
        let mut command_line = updated.command_line().to_vec();
        command_line.push("-disable-cross-import-overlay-search".into());
        for (module, file) in &overlay_files {
            command_line.push("-nextcode-module-cross-import".into());
            command_line.push(module.clone());
            command_line.push(file.clone());
            updated.add_auxiliary_file(file.as_str())?;
        }
        updated.update_command_line(command_line)?;
        cache.update_dependency(main, updated)?;

        self.diagnostics
            .diagnose(Diagnostic::remark(DiagnosticKind::CrossImportOverlaysFound {
                module: main.name.clone(),
                overlays: new_overlays.into_iter().collect(),
            }));

        Ok(discovered.into_iter().filter(|id| id != &dummy).collect())
    }
}
