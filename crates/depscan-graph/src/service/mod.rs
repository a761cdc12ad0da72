//! Process-wide store of dependency records.
//!
//! Records are partitioned by scanning context hash so that scans with
//! different targets or compiler flags never observe each other's entries.
//! Each context owns one concurrent map per [`ModuleDependencyKind`].
//!
//! Entries are immutable [`Arc`] values. Recording inserts once; updating
//! replaces the slot with a new value, so a reader holding an older `Arc`
//! never sees it change.

mod serialization;

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxBuildHasher;

use crate::{Error, ModuleDependencyId, ModuleDependencyInfo, ModuleDependencyKind, Result};

type KindMap = DashMap<String, Arc<ModuleDependencyInfo>, FxBuildHasher>;

/// Records of one scanning context.
#[derive(Debug, Default)]
struct ContextBucket {
    by_kind: [KindMap; 5],
    /// Recording order, used to report modules deterministically.
    recorded: Mutex<Vec<ModuleDependencyId>>,
}

impl ContextBucket {
    fn map(&self, kind: ModuleDependencyKind) -> &KindMap {
        &self.by_kind[kind.index()]
    }
}

/// Global cache shared by every scan in a session.
#[derive(Debug, Default)]
pub struct ScanningService {
    contexts: RwLock<IndexMap<String, Arc<ContextBucket>>>,
}

impl ScanningService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the bucket for `context_hash` if it does not exist yet.
    pub fn configure_for_context_hash(&self, context_hash: &str) {
        if self.contexts.read().contains_key(context_hash) {
            return;
        }
        self.contexts
            .write()
            .entry(context_hash.to_string())
            .or_default();
    }

    /// Context hashes in the order they were configured.
    pub fn all_context_hashes(&self) -> Vec<String> {
        self.contexts.read().keys().cloned().collect()
    }

    fn bucket(&self, context_hash: &str) -> Result<Arc<ContextBucket>> {
        self.contexts
            .read()
            .get(context_hash)
            .cloned()
            .ok_or_else(|| Error::UnknownContextHash(context_hash.to_string()))
    }

    /// Looks a module up by name.
    ///
    /// With no `kind`, kinds are probed in [`ModuleDependencyKind::ALL`] order
    /// and the first hit is returned. A missing module is `Ok(None)`.
    pub fn find_dependency(
        &self,
        name: &str,
        kind: Option<ModuleDependencyKind>,
        context_hash: &str,
    ) -> Result<Option<Arc<ModuleDependencyInfo>>> {
        let bucket = self.bucket(context_hash)?;
        let found = match kind {
            Some(kind) => bucket.map(kind).get(name).map(|entry| entry.value().clone()),
            None => ModuleDependencyKind::ALL
                .iter()
                .find_map(|kind| bucket.map(*kind).get(name).map(|entry| entry.value().clone())),
        };
        Ok(found)
    }

    pub fn has_dependency(
        &self,
        name: &str,
        kind: Option<ModuleDependencyKind>,
        context_hash: &str,
    ) -> Result<bool> {
        Ok(self.find_dependency(name, kind, context_hash)?.is_some())
    }

    /// Inserts a new record. Fails if `(name, kind)` is already present.
    pub fn record_dependency(
        &self,
        name: &str,
        info: ModuleDependencyInfo,
        context_hash: &str,
    ) -> Result<Arc<ModuleDependencyInfo>> {
        let bucket = self.bucket(context_hash)?;
        let kind = info.kind();
        match bucket.map(kind).entry(name.to_string()) {
            Entry::Occupied(_) => Err(Error::AlreadyRecorded(ModuleDependencyId::new(name, kind))),
            Entry::Vacant(slot) => {
                let info = Arc::new(info);
                slot.insert(info.clone());
                bucket.recorded.lock().push(ModuleDependencyId::new(name, kind));
                Ok(info)
            }
        }
    }

    /// Replaces an existing record with a new version.
    pub fn update_dependency(
        &self,
        id: &ModuleDependencyId,
        info: ModuleDependencyInfo,
        context_hash: &str,
    ) -> Result<Arc<ModuleDependencyInfo>> {
        if info.kind() != id.kind {
            return Err(Error::KindMismatch {
                id: id.clone(),
                found: info.kind(),
            });
        }
        let bucket = self.bucket(context_hash)?;
        let mut slot = bucket
            .map(id.kind)
            .get_mut(&id.name)
            .ok_or_else(|| Error::NotRecorded(id.clone()))?;
        let info = Arc::new(info);
        *slot = info.clone();
        Ok(info)
    }

    /// Every module recorded for `context_hash`, in recording order.
    pub fn all_modules(&self, context_hash: &str) -> Result<Vec<ModuleDependencyId>> {
        Ok(self.bucket(context_hash)?.recorded.lock().clone())
    }

    pub fn module_count(&self, context_hash: &str) -> Result<usize> {
        Ok(self.bucket(context_hash)?.recorded.lock().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClangDetails, InterfaceDetails};

    const HASH: &str = "ctx";

    fn interface() -> ModuleDependencyInfo {
        ModuleDependencyInfo::new(InterfaceDetails::default())
    }

    #[test]
    fn record_then_find_returns_same_record() {
        let service = ScanningService::new();
        service.configure_for_context_hash(HASH);

        let recorded = service.record_dependency("Foo", interface(), HASH).unwrap();
        let found = service.find_dependency("Foo", None, HASH).unwrap().unwrap();

        assert!(Arc::ptr_eq(&recorded, &found));
    }

    #[test]
    fn recording_twice_fails() {
        let service = ScanningService::new();
        service.configure_for_context_hash(HASH);
        service.record_dependency("Foo", interface(), HASH).unwrap();

        let err = service.record_dependency("Foo", interface(), HASH).unwrap_err();
        assert!(matches!(err, Error::AlreadyRecorded(id) if id == ModuleDependencyId::interface("Foo")));
    }

    #[test]
    fn same_name_may_exist_as_several_kinds() {
        let service = ScanningService::new();
        service.configure_for_context_hash(HASH);
        service.record_dependency("Foo", interface(), HASH).unwrap();
        service
            .record_dependency("Foo", ModuleDependencyInfo::new(ClangDetails::default()), HASH)
            .unwrap();

        let probed = service.find_dependency("Foo", None, HASH).unwrap().unwrap();
        assert_eq!(probed.kind(), ModuleDependencyKind::Interface);
        assert!(
            service
                .has_dependency("Foo", Some(ModuleDependencyKind::Clang), HASH)
                .unwrap()
        );
    }

    #[test]
    fn update_requires_existing_entry() {
        let service = ScanningService::new();
        service.configure_for_context_hash(HASH);

        let err = service
            .update_dependency(&ModuleDependencyId::interface("Foo"), interface(), HASH)
            .unwrap_err();
        assert!(matches!(err, Error::NotRecorded(_)));
    }

    #[test]
    fn update_replaces_slot_without_touching_old_reference() {
        let service = ScanningService::new();
        service.configure_for_context_hash(HASH);
        let old = service.record_dependency("Foo", interface(), HASH).unwrap();

        let mut next = (*old).clone();
        next.resolve_direct_dependencies(vec![ModuleDependencyId::clang("Foo")])
            .unwrap();
        service
            .update_dependency(&ModuleDependencyId::interface("Foo"), next, HASH)
            .unwrap();

        assert!(!old.is_resolved());
        let current = service
            .find_dependency("Foo", Some(ModuleDependencyKind::Interface), HASH)
            .unwrap()
            .unwrap();
        assert!(current.is_resolved());
    }

    #[test]
    fn contexts_are_isolated() {
        let service = ScanningService::new();
        service.configure_for_context_hash("a");
        service.configure_for_context_hash("b");
        service.configure_for_context_hash("a");
        service.record_dependency("Foo", interface(), "a").unwrap();

        assert!(service.find_dependency("Foo", None, "b").unwrap().is_none());
        assert_eq!(service.all_context_hashes(), vec!["a", "b"]);
    }

    #[test]
    fn unconfigured_context_is_an_error() {
        let service = ScanningService::new();
        let err = service.find_dependency("Foo", None, "missing").unwrap_err();
        assert!(matches!(err, Error::UnknownContextHash(_)));
    }

    #[test]
    fn concurrent_configuration_and_recording() {
        let service = Arc::new(ScanningService::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                std::thread::spawn(move || {
                    service.configure_for_context_hash(HASH);
                    service
                        .record_dependency(&format!("M{i}"), interface(), HASH)
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(service.module_count(HASH).unwrap(), 8);
        assert_eq!(service.all_context_hashes().len(), 1);
    }
}
