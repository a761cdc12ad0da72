//! Per-scan view over the [`ScanningService`].
//!
//! A [`DependenciesCache`] belongs to exactly one scan. It pins the scan's
//! context hash, hides source modules that belong to other scans, and keeps
//! references to every record this scan has touched. Writes happen only on
//! the orchestrating thread between parallel phases, so the cache itself has
//! no locking; it is shared with worker tasks as `&DependenciesCache`.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    ClangModuleId, Error, ModuleDependencyId, ModuleDependencyInfo, ModuleDependencyKind, Result,
    ScanningService,
};

/// Name of the synthetic source module used to resolve cross-import overlays.
pub const CROSS_IMPORT_DUMMY_MODULE: &str = "DummyMainModuleForResolvingCrossImportOverlays";

#[derive(Debug)]
pub struct DependenciesCache {
    service: Arc<ScanningService>,
    main_module_name: String,
    module_output_path: String,
    context_hash: String,
    seen_clang_modules: FxHashSet<ClangModuleId>,
    references: FxHashMap<ModuleDependencyId, Arc<ModuleDependencyInfo>>,
}

impl DependenciesCache {
    /// Creates a session cache and configures its context on the service.
    pub fn new(
        service: Arc<ScanningService>,
        main_module_name: impl Into<String>,
        module_output_path: impl Into<String>,
        context_hash: impl Into<String>,
    ) -> Self {
        let context_hash = context_hash.into();
        service.configure_for_context_hash(&context_hash);
        Self {
            service,
            main_module_name: main_module_name.into(),
            module_output_path: module_output_path.into(),
            context_hash,
            seen_clang_modules: FxHashSet::default(),
            references: FxHashMap::default(),
        }
    }

    pub fn service(&self) -> &Arc<ScanningService> {
        &self.service
    }

    pub fn main_module_name(&self) -> &str {
        &self.main_module_name
    }

    pub fn module_output_path(&self) -> &str {
        &self.module_output_path
    }

    pub fn context_hash(&self) -> &str {
        &self.context_hash
    }

    /// Clang modules already reported by the Clang scanner in this scan.
    pub fn seen_clang_modules(&self) -> &FxHashSet<ClangModuleId> {
        &self.seen_clang_modules
    }

    pub fn add_seen_clang_module(&mut self, id: ClangModuleId) {
        self.seen_clang_modules.insert(id);
    }

    fn is_visible(&self, name: &str, kind: ModuleDependencyKind) -> bool {
        kind != ModuleDependencyKind::Source
            || name == self.main_module_name
            || name == CROSS_IMPORT_DUMMY_MODULE
    }

    fn find_kind(
        &self,
        name: &str,
        kind: ModuleDependencyKind,
    ) -> Result<Option<Arc<ModuleDependencyInfo>>> {
        if !self.is_visible(name, kind) {
            return Ok(None);
        }
        let id = ModuleDependencyId::new(name, kind);
        if let Some(info) = self.references.get(&id) {
            return Ok(Some(info.clone()));
        }
        self.service.find_dependency(name, Some(kind), &self.context_hash)
    }

    /// Looks a module up by name, probing every kind when `kind` is `None`.
    ///
    /// Source modules are only visible under this scan's main module name or
    /// the cross-import dummy name.
    pub fn find_dependency(
        &self,
        name: &str,
        kind: Option<ModuleDependencyKind>,
    ) -> Result<Option<Arc<ModuleDependencyInfo>>> {
        match kind {
            Some(kind) => self.find_kind(name, kind),
            None => {
                for kind in ModuleDependencyKind::ALL {
                    if let Some(info) = self.find_kind(name, kind)? {
                        return Ok(Some(info));
                    }
                }
                Ok(None)
            }
        }
    }

    pub fn find_dependency_by_id(
        &self,
        id: &ModuleDependencyId,
    ) -> Result<Option<Arc<ModuleDependencyInfo>>> {
        self.find_kind(&id.name, id.kind)
    }

    /// Like [`find_dependency_by_id`](Self::find_dependency_by_id) but a
    /// missing record is an error.
    pub fn find_known_dependency(
        &self,
        id: &ModuleDependencyId,
    ) -> Result<Arc<ModuleDependencyInfo>> {
        self.find_dependency_by_id(id)?
            .ok_or_else(|| Error::NotRecorded(id.clone()))
    }

    pub fn has_dependency(&self, name: &str, kind: Option<ModuleDependencyKind>) -> Result<bool> {
        Ok(self.find_dependency(name, kind)?.is_some())
    }

    pub fn has_dependency_id(&self, id: &ModuleDependencyId) -> Result<bool> {
        Ok(self.find_dependency_by_id(id)?.is_some())
    }

    pub fn record_dependency(&mut self, name: &str, info: ModuleDependencyInfo) -> Result<()> {
        let kind = info.kind();
        if kind == ModuleDependencyKind::Clang {
            if let Some(clang) = info.as_clang() {
                self.seen_clang_modules
                    .insert(ClangModuleId::new(name, clang.context_hash.clone()));
            }
        }
        let recorded = self
            .service
            .record_dependency(name, info, &self.context_hash)?;
        self.references
            .insert(ModuleDependencyId::new(name, kind), recorded);
        Ok(())
    }

    /// Records a batch of discoveries, skipping any id already known.
    ///
    /// Two parallel lookups can discover the same transitive module; the first
    /// recording wins.
    pub fn record_dependencies(
        &mut self,
        dependencies: Vec<(ModuleDependencyId, ModuleDependencyInfo)>,
    ) -> Result<()> {
        for (id, info) in dependencies {
            if self.has_dependency_id(&id)? {
                continue;
            }
            self.record_dependency(&id.name, info)?;
        }
        Ok(())
    }

    pub fn update_dependency(
        &mut self,
        id: &ModuleDependencyId,
        info: ModuleDependencyInfo,
    ) -> Result<()> {
        let updated = self
            .service
            .update_dependency(id, info, &self.context_hash)?;
        self.references.insert(id.clone(), updated);
        Ok(())
    }

    /// Copy the record, resolve its direct dependencies, write it back.
    pub fn resolve_dependency_imports(
        &mut self,
        id: &ModuleDependencyId,
        dependencies: Vec<ModuleDependencyId>,
    ) -> Result<()> {
        let mut info = self.find_known_dependency(id)?.as_ref().clone();
        info.resolve_direct_dependencies(dependencies)?;
        self.update_dependency(id, info)
    }

    /// Copy the record, set its overlay dependencies, write it back.
    pub fn set_overlay_dependencies(
        &mut self,
        id: &ModuleDependencyId,
        dependencies: Vec<ModuleDependencyId>,
    ) -> Result<()> {
        let mut info = self.find_known_dependency(id)?.as_ref().clone();
        info.set_overlay_dependencies(dependencies)?;
        self.update_dependency(id, info)
    }

    /// Traversal edges of `id`: direct dependencies followed by overlay
    /// dependencies, without duplicates.
    pub fn all_dependencies(&self, id: &ModuleDependencyId) -> Result<Vec<ModuleDependencyId>> {
        Ok(self.find_known_dependency(id)?.all_dependencies())
    }

    pub fn only_direct_dependencies(
        &self,
        id: &ModuleDependencyId,
    ) -> Result<Vec<ModuleDependencyId>> {
        Ok(self.find_known_dependency(id)?.direct_dependencies().to_vec())
    }

    pub fn only_overlay_dependencies(
        &self,
        id: &ModuleDependencyId,
    ) -> Result<Vec<ModuleDependencyId>> {
        Ok(self
            .find_known_dependency(id)?
            .overlay_dependencies()
            .to_vec())
    }

    /// Modules this scan has recorded or updated.
    pub fn referenced_modules(&self) -> impl Iterator<Item = &ModuleDependencyId> {
        self.references.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClangDetails, InterfaceDetails, SourceDetails};

    fn cache(main: &str) -> DependenciesCache {
        DependenciesCache::new(Arc::new(ScanningService::new()), main, "/out", "ctx")
    }

    #[test]
    fn foreign_source_modules_are_hidden() {
        let service = Arc::new(ScanningService::new());
        let mut first = DependenciesCache::new(service.clone(), "App", "/out", "ctx");
        first
            .record_dependency("App", ModuleDependencyInfo::new(SourceDetails::default()))
            .unwrap();

        let second = DependenciesCache::new(service, "Other", "/out", "ctx");
        assert!(second.find_dependency("App", None).unwrap().is_none());
        assert!(first.find_dependency("App", None).unwrap().is_some());
    }

    #[test]
    fn cross_import_dummy_is_visible() {
        let mut cache = cache("App");
        cache
            .record_dependency(
                CROSS_IMPORT_DUMMY_MODULE,
                ModuleDependencyInfo::new(SourceDetails::default()),
            )
            .unwrap();
        assert!(
            cache
                .has_dependency(CROSS_IMPORT_DUMMY_MODULE, Some(ModuleDependencyKind::Source))
                .unwrap()
        );
    }

    #[test]
    fn bulk_recording_skips_known_modules() {
        let mut cache = cache("App");
        let clang = |path: &str| {
            ModuleDependencyInfo::builder(ClangDetails {
                module_map_file: path.into(),
                context_hash: "h".into(),
                ..Default::default()
            })
            .resolved(Vec::new())
            .build()
        };
        cache
            .record_dependencies(vec![(ModuleDependencyId::clang("C"), clang("/first"))])
            .unwrap();
        cache
            .record_dependencies(vec![
                (ModuleDependencyId::clang("C"), clang("/second")),
                (ModuleDependencyId::clang("D"), clang("/d")),
            ])
            .unwrap();

        let c = cache
            .find_known_dependency(&ModuleDependencyId::clang("C"))
            .unwrap();
        assert_eq!(c.as_clang().unwrap().module_map_file, "/first");
        assert_eq!(cache.seen_clang_modules().len(), 2);
    }

    #[test]
    fn copy_modify_write_resolution() {
        let mut cache = cache("App");
        let id = ModuleDependencyId::interface("Foo");
        cache
            .record_dependency("Foo", ModuleDependencyInfo::new(InterfaceDetails::default()))
            .unwrap();
        let before = cache.find_known_dependency(&id).unwrap();

        cache
            .resolve_dependency_imports(&id, vec![ModuleDependencyId::clang("Foo")])
            .unwrap();
        cache
            .set_overlay_dependencies(&id, vec![ModuleDependencyId::interface("Bar")])
            .unwrap();

        assert!(!before.is_resolved());
        assert_eq!(
            cache.all_dependencies(&id).unwrap(),
            vec![
                ModuleDependencyId::clang("Foo"),
                ModuleDependencyId::interface("Bar")
            ]
        );
        assert_eq!(cache.only_direct_dependencies(&id).unwrap().len(), 1);
        assert_eq!(cache.only_overlay_dependencies(&id).unwrap().len(), 1);
    }

    #[test]
    fn unknown_module_edges_are_an_error() {
        let cache = cache("App");
        assert!(matches!(
            cache.all_dependencies(&ModuleDependencyId::interface("Nope")),
            Err(Error::NotRecorded(_))
        ));
    }
}
