//! Diagnosis of fatal scan failures: unresolved imports and cycles.

use depscan_graph::{
    DependenciesCache, ImportStatement, ModuleDependencyId, ModuleDependencyKind, ModuleDetails,
    find_cycle, find_path,
};

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::{Result, ScanError};

/// Reports an import of `importer` that nothing resolved, together with the
/// chain of imports leading to it from the main module. Returns the error
/// that ends the scan.
pub fn diagnose_scanner_failure(
    sink: &dyn DiagnosticSink,
    import: &ImportStatement,
    importer: &ModuleDependencyId,
    cache: &DependenciesCache,
) -> Result<ScanError> {
    let name = import.identifier.clone();
    sink.diagnose(
        Diagnostic::error(DiagnosticKind::ModuleNotFound { name: name.clone() })
            .at(import.first_location().cloned()),
    );

    let main = ModuleDependencyId::source(cache.main_module_name());
    let path = find_path(&main, |id| id == importer, |id| import_edges(id, cache))?
        .map(|chain| chain.path)
        .filter(|path| !path.is_empty())
        .unwrap_or_else(|| vec![importer.clone()]);

    for module in path.iter().rev() {
        let Some(info) = cache.find_dependency_by_id(module)? else {
            continue;
        };
        let kind = match info.details() {
            ModuleDetails::Source(_) => DiagnosticKind::ImportedByMainModule {
                main_module: module.name.clone(),
            },
            ModuleDetails::Interface(details) => imported_by(module, &details.interface_file),
            ModuleDetails::Binary(details) => imported_by(module, &details.compiled_module_path),
            ModuleDetails::Placeholder(details) => {
                imported_by(module, &details.compiled_module_path)
            }
            ModuleDetails::Clang(details) => imported_by(module, &details.module_map_file),
        };
        sink.diagnose(Diagnostic::note(kind));
    }

    for location in import.locations.iter().skip(1) {
        sink.diagnose(
            Diagnostic::note(DiagnosticKind::UnresolvedImportLocation { name: name.clone() })
                .at(Some(location.clone())),
        );
    }

    Ok(ScanError::ModuleNotFound {
        name,
        importer: importer.clone(),
    })
}

fn imported_by(module: &ModuleDependencyId, path: &str) -> DiagnosticKind {
    DiagnosticKind::ImportedByModule {
        module: module.name.clone(),
        kind: module.kind,
        path: path.to_string(),
    }
}

/// Modules `id` imports by name, as far as the cache knows them. An import
/// of a module's own name refers to its underlying Clang module.
fn import_edges(
    id: &ModuleDependencyId,
    cache: &DependenciesCache,
) -> depscan_graph::Result<Vec<ModuleDependencyId>> {
    let Some(info) = cache.find_dependency_by_id(id)? else {
        return Ok(Vec::new());
    };
    let mut edges = Vec::new();
    for name in info.import_names() {
        let clang_only = id.kind == ModuleDependencyKind::Clang
            || (name == id.name && id.kind.is_nextcode());
        let kind = clang_only.then_some(ModuleDependencyKind::Clang);
        if let Some(found) = cache.find_dependency(name, kind)? {
            edges.push(ModuleDependencyId::new(name, found.kind()));
        }
    }
    Ok(edges)
}

/// Fails with [`ScanError::CycleDetected`] when the graph reachable from
/// `root` contains a cycle.
///
/// When the cycle passes through an overlay edge, a note shows the Clang
/// path that pulled the overlay in.
pub fn diagnose_cycle(
    sink: &dyn DiagnosticSink,
    root: &ModuleDependencyId,
    cache: &DependenciesCache,
) -> Result<()> {
    let Some(cycle) = find_cycle(root, |id| cache.all_dependencies(id))? else {
        return Ok(());
    };
    let chain = cycle.format();
    sink.diagnose(Diagnostic::error(DiagnosticKind::DependencyCycle {
        chain: chain.clone(),
    }));

    for (this, next) in cycle.chain.edges() {
        if !is_nextcode_edge_end(this) || !is_nextcode_edge_end(next) {
            continue;
        }
        if !cache.only_overlay_dependencies(this)?.contains(next) {
            continue;
        }
        let underlying = ModuleDependencyId::clang(next.name.clone());
        let clang_path = find_path(this, |id| id == &underlying, |id| cache.all_dependencies(id))?;
        if let Some(clang_path) = clang_path {
            sink.diagnose(Diagnostic::note(DiagnosticKind::OverlayCycleVia {
                module: this.name.clone(),
                overlay: next.name.clone(),
                clang_path: clang_path.format_chain(),
            }));
        }
    }

    Err(ScanError::CycleDetected { chain })
}

fn is_nextcode_edge_end(id: &ModuleDependencyId) -> bool {
    matches!(
        id.kind,
        ModuleDependencyKind::Interface | ModuleDependencyKind::Binary | ModuleDependencyKind::Source
    )
}
