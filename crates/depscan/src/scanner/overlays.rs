use depscan_graph::{DependenciesCache, ModuleDependencyId, ModuleDependencyKind};
use indexmap::IndexSet;
use rustc_hash::FxHashMap;

use super::DependencyScanner;
use crate::Result;
use crate::clang_bridge::is_cxx_std_module;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::oracle::ModuleDependencyVector;

/// NeXTCode overlay of the split C++ standard library modules.
pub(crate) const CXX_STDLIB_OVERLAY: &str = "CxxStdlib";

/// Kinds an overlay can be recorded as, in probe order.
const OVERLAY_KINDS: [ModuleDependencyKind; 3] = [
    ModuleDependencyKind::Interface,
    ModuleDependencyKind::Binary,
    ModuleDependencyKind::Placeholder,
];

fn find_overlay(cache: &DependenciesCache, name: &str) -> Result<Option<ModuleDependencyId>> {
    for kind in OVERLAY_KINDS {
        if cache.has_dependency(name, Some(kind))? {
            return Ok(Some(ModuleDependencyId::new(name, kind)));
        }
    }
    Ok(None)
}

impl DependencyScanner {
    /// Looks for a NeXTCode module named after each Clang module in
    /// `clang_closure` and collects the ones found into `overlays`.
    pub(super) fn resolve_nextcode_overlay_dependencies(
        &self,
        id: &ModuleDependencyId,
        clang_closure: &IndexSet<String>,
        cache: &mut DependenciesCache,
        overlays: &mut IndexSet<ModuleDependencyId>,
    ) -> Result<()> {
        let candidates: Vec<&str> = clang_closure
            .iter()
            .map(String::as_str)
            .filter(|name| *name != id.name)
            .collect();

        let mut pending = Vec::new();
        for name in &candidates {
            if find_overlay(cache, name)?.is_none() {
                pending.push(*name);
            }
        }
        let shared: &DependenciesCache = cache;
        let results = self.fan_out(&pending, |worker, name| {
            worker.scan_filesystem_for_nextcode_module_dependency(name, shared, false)
        });
        let mut fresh: FxHashMap<&str, Result<ModuleDependencyVector>> =
            pending.iter().copied().zip(results).collect();

        for name in candidates {
            let found = fresh.remove(name);
            self.add_overlay(name, found, cache, overlays)?;
        }

        if self.needs_cxx_stdlib_overlay(id, clang_closure, cache, overlays)? {
            let found = if find_overlay(cache, CXX_STDLIB_OVERLAY)?.is_some() {
                None
            } else {
                let shared: &DependenciesCache = cache;
                Some(self.workers.with_worker(|worker| {
                    worker.scan_filesystem_for_nextcode_module_dependency(
                        CXX_STDLIB_OVERLAY,
                        shared,
                        false,
                    )
                }))
            };
            self.add_overlay(CXX_STDLIB_OVERLAY, found, cache, overlays)?;
        }
        Ok(())
    }

    /// Adds the overlay `name` from the cache, or from a fresh lookup result
    /// when one was made.
    fn add_overlay(
        &self,
        name: &str,
        fresh: Option<Result<ModuleDependencyVector>>,
        cache: &mut DependenciesCache,
        overlays: &mut IndexSet<ModuleDependencyId>,
    ) -> Result<()> {
        match fresh {
            None => {
                if let Some(overlay) = find_overlay(cache, name)? {
                    overlays.insert(overlay);
                }
            }
            Some(Ok(found)) => {
                let Some(kind) = found.first().map(|(id, _)| id.kind) else {
                    return Ok(());
                };
                cache.record_dependencies(found)?;
                tracing::trace!(module = name, %kind, "Found overlay");
                overlays.insert(ModuleDependencyId::new(name, kind));
            }
            Some(Err(err)) => {
                tracing::warn!(module = name, error = %err, "Overlay lookup failed");
                self.diagnostics
                    .diagnose(Diagnostic::warning(DiagnosticKind::ToolingFailure {
                        module: name.to_string(),
                        reason: err.to_string(),
                    }));
            }
        }
        Ok(())
    }

    /// The C++ standard library is split into many Clang modules but has a
    /// single NeXTCode overlay.
    fn needs_cxx_stdlib_overlay(
        &self,
        id: &ModuleDependencyId,
        clang_closure: &IndexSet<String>,
        cache: &DependenciesCache,
        overlays: &IndexSet<ModuleDependencyId>,
    ) -> Result<bool> {
        if !self.config.language.cxx_interop || id.name == CXX_STDLIB_OVERLAY {
            return Ok(false);
        }
        for name in clang_closure {
            let info = cache.find_known_dependency(&ModuleDependencyId::clang(name.as_str()))?;
            let is_system = info.as_clang().is_some_and(|clang| clang.is_system);
            if is_cxx_std_module(name, is_system)
                && !overlays.contains(&ModuleDependencyId::interface(name.as_str()))
                && !overlays.contains(&ModuleDependencyId::binary(name.as_str()))
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
