//! A module index: a JSON description of which modules exist and what they
//! import, served through the oracle traits.
//!
//! The index stands in for a real search-path walk and Clang scanner. It
//! backs the `depscan` CLI and the test fixtures.
//!
//! ```json
//! {
//!   "nextcode": {
//!     "Foo": { "kind": "interface", "path": "/sdk/Foo.codeinterface", "imports": ["Bar"] }
//!   },
//!   "clang": {
//!     "Bar": { "moduleMap": "/sdk/Bar/module.modulemap", "dependencies": ["Bar_Private"] },
//!     "Bar_Private": { "moduleMap": "/sdk/Bar/module.private.modulemap" }
//!   },
//!   "headers": {
//!     "/src/Bridging.h": { "modules": ["Bar"] }
//!   }
//! }
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

use depscan_config::hash_inputs;
use depscan_graph::{
    BinaryDetails, ClangModuleId, CrossImportMap, InterfaceDetails, LinkLibrary, MacroDependency,
    ModuleDependencyId, ModuleDependencyInfo, PlaceholderDetails, TextualDetails,
};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::oracle::{
    ClangModuleDeps, ClangModuleGraph, ClangScanRequest, ClangScanningTool, ModuleDependencyVector,
    ModuleLoader, OracleError, ScanningOracle, TranslationUnitDeps,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeXTCodeEntryKind {
    #[default]
    Interface,
    Binary,
    Placeholder,
}

/// A NeXTCode module on the search paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NeXTCodeModuleEntry {
    pub kind: NeXTCodeEntryKind,
    /// Interface file, compiled module or placeholder module path.
    pub path: String,
    /// Binary module next to an interface; served for testable imports.
    pub compiled_module_path: Option<String>,
    /// Import paths; `Foo.Private` style paths are allowed.
    pub imports: Vec<String>,
    pub optional_imports: Vec<String>,
    pub header_import: Option<String>,
    pub is_framework: bool,
    pub is_static: bool,
    pub link_libraries: Vec<LinkLibrary>,
    pub cross_import_overlays: CrossImportMap,
    pub macro_dependencies: BTreeMap<String, MacroDependency>,
}

impl NeXTCodeModuleEntry {
    pub fn interface(path: impl Into<String>) -> Self {
        Self {
            kind: NeXTCodeEntryKind::Interface,
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn binary(path: impl Into<String>) -> Self {
        Self {
            kind: NeXTCodeEntryKind::Binary,
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn placeholder(path: impl Into<String>) -> Self {
        Self {
            kind: NeXTCodeEntryKind::Placeholder,
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.imports.extend(imports.into_iter().map(Into::into));
        self
    }

    pub fn optional_imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optional_imports.extend(imports.into_iter().map(Into::into));
        self
    }

    fn to_record(&self, name: &str, testable: bool) -> (ModuleDependencyId, ModuleDependencyInfo) {
        let (id, mut info) = match self.kind {
            NeXTCodeEntryKind::Interface => match (&self.compiled_module_path, testable) {
                (Some(compiled), true) => self.binary_record(name, compiled),
                _ => self.interface_record(name),
            },
            NeXTCodeEntryKind::Binary => self.binary_record(name, &self.path),
            NeXTCodeEntryKind::Placeholder => {
                let details = PlaceholderDetails {
                    compiled_module_path: self.path.clone(),
                    module_doc_path: sibling(&self.path, "codedoc"),
                    source_info_path: sibling(&self.path, "codesourceinfo"),
                };
                (
                    ModuleDependencyId::placeholder(name),
                    ModuleDependencyInfo::new(details),
                )
            }
        };

        for import in &self.imports {
            let path: Vec<&str> = import.split('.').collect();
            info.add_module_import_path(&path, None);
        }
        for import in &self.optional_imports {
            info.add_optional_module_import(import);
        }
        (id, info)
    }

    fn interface_record(&self, name: &str) -> (ModuleDependencyId, ModuleDependencyInfo) {
        let details = InterfaceDetails {
            interface_file: self.path.clone(),
            compiled_module_candidates: self.compiled_module_path.iter().cloned().collect(),
            is_framework: self.is_framework,
            is_static: self.is_static,
            cross_import_overlays: self.cross_import_overlays.clone(),
            textual: TextualDetails {
                macro_dependencies: self.macro_dependencies.clone(),
                ..Default::default()
            },
            ..Default::default()
        };
        let info = self
            .link_libraries
            .iter()
            .cloned()
            .fold(ModuleDependencyInfo::builder(details), |b, l| b.link_library(l))
            .build();
        (ModuleDependencyId::interface(name), info)
    }

    fn binary_record(&self, name: &str, path: &str) -> (ModuleDependencyId, ModuleDependencyInfo) {
        let details = BinaryDetails {
            compiled_module_path: path.to_string(),
            module_doc_path: sibling(path, "codedoc"),
            source_info_path: sibling(path, "codesourceinfo"),
            header_import: self.header_import.clone(),
            is_framework: self.is_framework,
            is_static: self.is_static,
            cross_import_overlays: self.cross_import_overlays.clone(),
            ..Default::default()
        };
        let info = self
            .link_libraries
            .iter()
            .cloned()
            .fold(ModuleDependencyInfo::builder(details), |b, l| b.link_library(l))
            .build();
        (ModuleDependencyId::binary(name), info)
    }
}

fn sibling(path: &str, extension: &str) -> String {
    Path::new(path)
        .with_extension(extension)
        .to_string_lossy()
        .into_owned()
}

/// A Clang module reachable through a module map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClangModuleEntry {
    pub module_map: String,
    /// Clang modules this one imports.
    pub dependencies: Vec<String>,
    /// Headers that make up the module.
    pub files: Vec<String>,
    pub is_system: bool,
    /// Overlays the module's build actually reads.
    pub vfs_overlays: Vec<String>,
    pub link_libraries: Vec<LinkLibrary>,
    pub include_tree: Option<String>,
}

impl ClangModuleEntry {
    pub fn new(module_map: impl Into<String>) -> Self {
        Self {
            module_map: module_map.into(),
            ..Default::default()
        }
    }

    pub fn dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }
}

/// A header scanned as its own translation unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeaderEntry {
    /// Files the header includes.
    pub files: Vec<String>,
    /// Clang modules the header imports.
    pub modules: Vec<String>,
    pub include_tree: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct IndexData {
    nextcode: BTreeMap<String, NeXTCodeModuleEntry>,
    clang: BTreeMap<String, ClangModuleEntry>,
    headers: BTreeMap<String, HeaderEntry>,
}

/// File-backed module oracle. Cheap to clone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleIndex {
    data: Arc<IndexData>,
}

impl ModuleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn add_nextcode_module(
        &mut self,
        name: impl Into<String>,
        entry: NeXTCodeModuleEntry,
    ) -> &mut Self {
        Arc::make_mut(&mut self.data)
            .nextcode
            .insert(name.into(), entry);
        self
    }

    pub fn add_clang_module(
        &mut self,
        name: impl Into<String>,
        entry: ClangModuleEntry,
    ) -> &mut Self {
        Arc::make_mut(&mut self.data)
            .clang
            .insert(name.into(), entry);
        self
    }

    pub fn add_header(&mut self, path: impl Into<String>, entry: HeaderEntry) -> &mut Self {
        Arc::make_mut(&mut self.data)
            .headers
            .insert(path.into(), entry);
        self
    }

    pub fn nextcode_module(&self, name: &str) -> Option<&NeXTCodeModuleEntry> {
        self.data.nextcode.get(name)
    }

    pub fn clang_module(&self, name: &str) -> Option<&ClangModuleEntry> {
        self.data.clang.get(name)
    }

    pub fn module_count(&self) -> usize {
        self.data.nextcode.len() + self.data.clang.len()
    }
}

impl ScanningOracle for ModuleIndex {
    fn module_loader(&self) -> Box<dyn ModuleLoader> {
        Box::new(IndexScanner {
            data: Arc::clone(&self.data),
        })
    }

    fn clang_tool(&self) -> Box<dyn ClangScanningTool> {
        Box::new(IndexScanner {
            data: Arc::clone(&self.data),
        })
    }
}

/// Per-worker view of a [`ModuleIndex`].
#[derive(Debug)]
struct IndexScanner {
    data: Arc<IndexData>,
}

impl IndexScanner {
    /// Breadth-first walk over Clang imports starting at `roots`, leaving out
    /// modules in `already_seen` (other than the roots themselves).
    fn collect_clang_modules(
        &self,
        roots: &[String],
        context_hash: &str,
        already_seen: &FxHashSet<ClangModuleId>,
    ) -> std::result::Result<Vec<ClangModuleDeps>, OracleError> {
        let mut queue: VecDeque<(String, Option<String>)> =
            roots.iter().map(|root| (root.clone(), None)).collect();
        let mut visited: FxHashSet<String> = FxHashSet::default();
        let mut modules = Vec::new();

        while let Some((name, importer)) = queue.pop_front() {
            if !visited.insert(name.clone()) {
                continue;
            }
            let id = ClangModuleId::new(name.clone(), context_hash);
            if importer.is_some() && already_seen.contains(&id) {
                continue;
            }
            let Some(entry) = self.data.clang.get(&name) else {
                return Err(match importer {
                    Some(importer) => OracleError::Failed(format!(
                        "module '{name}' imported by '{importer}' not found"
                    )),
                    None => OracleError::ModuleNotFound(name),
                });
            };

            let mut build_arguments = vec![
                "-fmodules".to_string(),
                "-fno-implicit-modules".to_string(),
                "-emit-module".to_string(),
                format!("-fmodule-name={name}"),
            ];
            for overlay in &entry.vfs_overlays {
                build_arguments.push("-ivfsoverlay".into());
                build_arguments.push(overlay.clone());
            }

            modules.push(ClangModuleDeps {
                id,
                module_map_file: entry.module_map.clone(),
                file_deps: entry.files.clone(),
                clang_module_deps: entry
                    .dependencies
                    .iter()
                    .map(|dep| ClangModuleId::new(dep.clone(), context_hash))
                    .collect(),
                build_arguments,
                link_libraries: entry.link_libraries.clone(),
                is_system: entry.is_system,
                cas_fs_root_id: None,
                include_tree_id: entry.include_tree.clone(),
            });
            for dependency in &entry.dependencies {
                queue.push_back((dependency.clone(), Some(name.clone())));
            }
        }

        Ok(modules)
    }
}

impl ModuleLoader for IndexScanner {
    fn scan_module(
        &mut self,
        name: &str,
        testable: bool,
    ) -> std::result::Result<ModuleDependencyVector, OracleError> {
        Ok(self
            .data
            .nextcode
            .get(name)
            .map(|entry| vec![entry.to_record(name, testable)])
            .unwrap_or_default())
    }

    fn can_import_module(&self, name: &str) -> bool {
        self.data.nextcode.contains_key(name) || self.data.clang.contains_key(name)
    }
}

impl ClangScanningTool for IndexScanner {
    fn module_dependencies(
        &mut self,
        name: &str,
        request: ClangScanRequest<'_>,
    ) -> std::result::Result<ClangModuleGraph, OracleError> {
        let context_hash = hash_inputs(request.command_line);
        let modules =
            self.collect_clang_modules(&[name.to_string()], &context_hash, request.already_seen)?;
        Ok(ClangModuleGraph { modules })
    }

    fn translation_unit_dependencies(
        &mut self,
        header: &str,
        request: ClangScanRequest<'_>,
    ) -> std::result::Result<TranslationUnitDeps, OracleError> {
        let entry = self
            .data
            .headers
            .get(header)
            .ok_or_else(|| OracleError::Failed(format!("cannot open header '{header}'")))?;
        let context_hash = hash_inputs(request.command_line);

        let roots: Vec<String> = entry
            .modules
            .iter()
            .filter(|name| {
                !request
                    .already_seen
                    .contains(&ClangModuleId::new(name.as_str(), context_hash.as_str()))
            })
            .cloned()
            .collect();
        let modules = self.collect_clang_modules(&roots, &context_hash, request.already_seen)?;

        let mut file_deps = vec![header.to_string()];
        file_deps.extend(entry.files.iter().cloned());

        Ok(TranslationUnitDeps {
            file_deps,
            clang_module_deps: entry
                .modules
                .iter()
                .map(|name| ClangModuleId::new(name.as_str(), context_hash.as_str()))
                .collect(),
            modules,
            command_line: request.command_line.to_vec(),
            cas_fs_root_id: None,
            include_tree_id: entry.include_tree.clone(),
        })
    }
}
