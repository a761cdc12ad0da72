use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use super::{ContextBucket, ScanningService};
use crate::{Error, ModuleDependencyId, ModuleDependencyInfo, Result};

/// Bumped whenever the record layout changes.
const FORMAT_VERSION: u32 = 2;

#[derive(Serialize, Deserialize)]
struct SerializedContext {
    context_hash: String,
    modules: Vec<(ModuleDependencyId, ModuleDependencyInfo)>,
}

#[derive(Serialize, Deserialize)]
struct SerializedService {
    version: u32,
    contexts: Vec<SerializedContext>,
}

impl ScanningService {
    fn snapshot(&self) -> Vec<SerializedContext> {
        let contexts = self.contexts.read();
        contexts
            .iter()
            .map(|(context_hash, bucket)| {
                let modules = bucket
                    .recorded
                    .lock()
                    .iter()
                    .filter_map(|id| {
                        bucket
                            .map(id.kind)
                            .get(&id.name)
                            .map(|entry| (id.clone(), entry.value().as_ref().clone()))
                    })
                    .collect();
                SerializedContext {
                    context_hash: context_hash.clone(),
                    modules,
                }
            })
            .collect()
    }

    /// Serialize every context to bytes.
    ///
    /// Contexts and modules are written in the order they were configured and
    /// recorded, so equal services produce equal bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let serialized = SerializedService {
            version: FORMAT_VERSION,
            contexts: self.snapshot(),
        };

        bincode::serde::encode_to_vec(&serialized, bincode::config::standard())
            .map_err(|e| Error::Serialization(format!("failed to serialize scanning cache: {e}")))
    }

    /// Rebuild a service from [`ScanningService::to_bytes`] output.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (serialized, _): (SerializedService, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard()).map_err(|e| {
                Error::Serialization(format!("failed to deserialize scanning cache: {e}"))
            })?;

        if serialized.version != FORMAT_VERSION {
            return Err(Error::Serialization(format!(
                "incompatible scanning cache format version: expected {}, got {}",
                FORMAT_VERSION, serialized.version
            )));
        }

        let mut contexts = indexmap::IndexMap::new();
        for context in serialized.contexts {
            let bucket = ContextBucket::default();
            let mut recorded = Vec::with_capacity(context.modules.len());
            for (id, info) in context.modules {
                if info.kind() != id.kind {
                    return Err(Error::KindMismatch {
                        id,
                        found: info.kind(),
                    });
                }
                bucket.map(id.kind).insert(id.name.clone(), Arc::new(info));
                recorded.push(id);
            }
            let bucket = ContextBucket {
                by_kind: bucket.by_kind,
                recorded: Mutex::new(recorded),
            };
            contexts.insert(context.context_hash, Arc::new(bucket));
        }

        Ok(Self {
            contexts: RwLock::new(contexts),
        })
    }

    /// Human-readable dump of every context, for debugging.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.snapshot()).map_err(|e| {
            Error::Serialization(format!("failed to serialize scanning cache to JSON: {e}"))
        })
    }

    /// Write the cache to `path`.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Load a cache previously written with [`ScanningService::save`].
    pub fn load(path: &std::path::Path) -> Result<Self> {
        Self::from_bytes(&std::fs::read(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClangDetails, InterfaceDetails, ModuleDependencyKind};

    fn populated() -> ScanningService {
        let service = ScanningService::new();
        service.configure_for_context_hash("ctx");
        service
            .record_dependency(
                "Foo",
                ModuleDependencyInfo::builder(InterfaceDetails {
                    interface_file: "/sdk/Foo.codeinterface".into(),
                    ..Default::default()
                })
                .import("Bar")
                .build(),
                "ctx",
            )
            .unwrap();
        service
            .record_dependency(
                "Bar",
                ModuleDependencyInfo::builder(ClangDetails {
                    module_map_file: "/sdk/Bar/module.modulemap".into(),
                    ..Default::default()
                })
                .resolved(Vec::new())
                .build(),
                "ctx",
            )
            .unwrap();
        service
    }

    #[test]
    fn bytes_round_trip_preserves_records_and_order() {
        let service = populated();
        let restored = ScanningService::from_bytes(&service.to_bytes().unwrap()).unwrap();

        assert_eq!(
            restored.all_modules("ctx").unwrap(),
            vec![
                ModuleDependencyId::interface("Foo"),
                ModuleDependencyId::clang("Bar")
            ]
        );
        let bar = restored
            .find_dependency("Bar", Some(ModuleDependencyKind::Clang), "ctx")
            .unwrap()
            .unwrap();
        assert!(bar.is_resolved());
        assert_eq!(restored.to_bytes().unwrap(), service.to_bytes().unwrap());
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let bytes = bincode::serde::encode_to_vec(
            &SerializedService {
                version: FORMAT_VERSION + 1,
                contexts: Vec::new(),
            },
            bincode::config::standard(),
        )
        .unwrap();

        let err = ScanningService::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("incompatible"));
    }

    #[test]
    fn save_and_load_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.cache");
        populated().save(&path).unwrap();

        let loaded = ScanningService::load(&path).unwrap();
        assert_eq!(loaded.module_count("ctx").unwrap(), 2);
    }
}
