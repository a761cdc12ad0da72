use depscan_graph::{
    DependenciesCache, ImportStatement, ModuleDependencyId, ModuleDependencyInfo,
    ModuleDependencyKind,
};
use indexmap::IndexSet;
use rustc_hash::FxHashMap;

use super::DependencyScanner;
use crate::diagnose::diagnose_scanner_failure;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::oracle::ModuleDependencyVector;
use crate::{Result, ScanError};

/// One distinct import name of the module being resolved.
#[derive(Debug)]
struct ImportRequest<'a> {
    statement: &'a ImportStatement,
    optional: bool,
    /// An import of the module's own name, which only a Clang module can
    /// satisfy.
    underlying: bool,
    cached: bool,
}

impl ImportRequest<'_> {
    fn name(&self) -> &str {
        &self.statement.identifier
    }

    fn lookup_kind(&self) -> Option<ModuleDependencyKind> {
        self.underlying.then_some(ModuleDependencyKind::Clang)
    }
}

impl DependencyScanner {
    /// Resolves every import of `id` into `direct`, in import order.
    ///
    /// A required import that nothing resolves fails the scan after its
    /// import path has been diagnosed.
    pub(super) fn resolve_import_dependencies(
        &self,
        id: &ModuleDependencyId,
        info: &ModuleDependencyInfo,
        cache: &mut DependenciesCache,
        direct: &mut IndexSet<ModuleDependencyId>,
    ) -> Result<()> {
        let mut requests: Vec<ImportRequest<'_>> = Vec::new();
        let mut seen: IndexSet<&str> = IndexSet::new();
        let statements = info
            .imports()
            .iter()
            .map(|statement| (statement, false))
            .chain(info.optional_imports().iter().map(|statement| (statement, true)));
        for (statement, optional) in statements {
            if !seen.insert(statement.identifier.as_str()) {
                continue;
            }
            let underlying = statement.identifier == id.name;
            let kind = underlying.then_some(ModuleDependencyKind::Clang);
            requests.push(ImportRequest {
                statement,
                optional,
                underlying,
                cached: cache.has_dependency(&statement.identifier, kind)?,
            });
        }

        let pending: Vec<&ImportRequest<'_>> =
            requests.iter().filter(|request| !request.cached).collect();
        let shared: &DependenciesCache = cache;
        let results = self.fan_out(&pending, |worker, request| {
            let name = request.name();
            tracing::trace!(module = name, "Looking up import");
            if request.underlying {
                worker.scan_filesystem_for_clang_module_dependency(name, shared)
            } else {
                let testable = info.is_testable_import(name);
                worker.scan_filesystem_for_module_dependency(name, shared, testable)
            }
        });
        let mut fresh: FxHashMap<&str, Result<ModuleDependencyVector>> = pending
            .iter()
            .map(|request| request.name())
            .zip(results)
            .collect();

        let mut unresolved: Vec<&ImportRequest<'_>> = Vec::new();
        for request in &requests {
            let name = request.name();
            if request.cached {
                if let Some(found) = cache.find_dependency(name, request.lookup_kind())? {
                    direct.insert(ModuleDependencyId::new(name, found.kind()));
                }
                continue;
            }

            match fresh.remove(name) {
                Some(Ok(found)) if !found.is_empty() => {
                    let kind = found[0].0.kind;
                    cache.record_dependencies(found)?;
                    direct.insert(ModuleDependencyId::new(name, kind));
                }
                Some(Err(err)) if request.optional => {
                    self.diagnostics.diagnose(Diagnostic::warning(
                        DiagnosticKind::OptionalImportDropped {
                            name: name.to_string(),
                            reason: err.to_string(),
                        },
                    ));
                }
                Some(Err(err)) => {
                    let location = request.statement.first_location().cloned();
                    self.diagnostics
                        .diagnose(tooling_failure(name, &err).at(location));
                    return Err(err);
                }
                _ if request.optional => {
                    tracing::trace!(module = name, "Dropping unresolved optional import");
                }
                _ => unresolved.push(request),
            }
        }

        // A lookup can register modules other than the one asked for, e.g. a
        // framework's private module map.
        let mut failure: Option<ScanError> = None;
        for request in unresolved {
            let name = request.name();
            if cache.has_dependency(name, Some(ModuleDependencyKind::Clang))? {
                direct.insert(ModuleDependencyId::clang(name));
                continue;
            }
            let err = diagnose_scanner_failure(
                self.diagnostics.as_ref(),
                request.statement,
                id,
                cache,
            )?;
            failure.get_or_insert(err);
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn tooling_failure(name: &str, err: &ScanError) -> Diagnostic {
    let reason = match err {
        ScanError::Tooling { message, .. } => message.clone(),
        other => other.to_string(),
    };
    Diagnostic::error(DiagnosticKind::ToolingFailure {
        module: name.to_string(),
        reason,
    })
}
