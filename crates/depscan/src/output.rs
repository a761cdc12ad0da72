//! JSON description of a resolved graph, as consumed by build systems.
//!
//! ```json
//! {
//!   "mainModuleName": "App",
//!   "modules": [
//!     {
//!       "moduleName": "nextcodeTextual:App",
//!       "modulePath": "App.codemodule",
//!       "sourceFiles": ["/src/main.nc"],
//!       "directDependencies": ["clang:Bar", "nextcodeTextual:Foo"],
//!       "linkLibraries": [],
//!       "details": { "nextcode": { "commandLine": ["-frontend", "..."] } }
//!     }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use depscan_graph::{DependenciesCache, ModuleDependencyId, ModuleDetails};
use serde::{Deserialize, Serialize};

use crate::Result;

/// A resolved graph. Modules are listed in discovery order, main module
/// first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraph {
    pub main_module_name: String,
    pub modules: Vec<ModuleEntry>,
}

impl DependencyGraph {
    pub fn module(&self, encoded_name: &str) -> Option<&ModuleEntry> {
        self.modules
            .iter()
            .find(|module| module.module_name == encoded_name)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleEntry {
    /// Kind-prefixed name, e.g. `clang:Bar`.
    pub module_name: String,
    pub module_path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_files: Vec<String>,
    pub direct_dependencies: Vec<String>,
    #[serde(default)]
    pub link_libraries: Vec<LinkLibraryEntry>,
    pub details: ModuleDetailsEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkLibraryEntry {
    pub link_name: String,
    pub is_framework: bool,
    pub should_force_load: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleDetailsEntry {
    #[serde(rename = "nextcode")]
    Textual(TextualEntry),
    #[serde(rename = "nextcodePrebuiltExternal")]
    Binary(BinaryEntry),
    #[serde(rename = "nextcodePlaceholder")]
    Placeholder(PlaceholderEntry),
    #[serde(rename = "clang")]
    Clang(ClangEntry),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgingHeaderEntry {
    pub path: String,
    pub source_files: Vec<String>,
    pub module_dependencies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroDependencyEntry {
    pub library_path: String,
    pub executable_path: String,
}

/// Interface and source modules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextualEntry {
    /// Absent for the main module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_interface_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compiled_module_candidates: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridging_header: Option<BridgingHeaderEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nextcode_overlay_dependencies: Vec<String>,
    pub command_line: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bridging_header_build_command: Vec<String>,
    #[serde(default)]
    pub extra_pcm_args: Vec<String>,
    pub context_hash: String,
    #[serde(default)]
    pub is_framework: bool,
    #[serde(default)]
    pub is_static: bool,
    #[serde(rename = "casFSRootID", default, skip_serializing_if = "Option::is_none")]
    pub cas_fs_root_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridging_header_include_tree: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub macro_dependencies: BTreeMap<String, MacroDependencyEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_cache_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryEntry {
    pub compiled_module_path: String,
    pub module_doc_path: String,
    pub module_source_info_path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nextcode_overlay_dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_dependency: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub header_module_dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub header_dependencies_source_files: Vec<String>,
    #[serde(default)]
    pub is_framework: bool,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_cache_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderEntry {
    pub compiled_module_path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub module_doc_path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub module_source_info_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClangEntry {
    pub module_map_path: String,
    pub context_hash: String,
    pub command_line: Vec<String>,
    #[serde(rename = "capturedPCMArgs", default)]
    pub captured_pcm_args: Vec<String>,
    #[serde(rename = "casFSRootID", default, skip_serializing_if = "Option::is_none")]
    pub cas_fs_root_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clang_include_tree: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_cache_key: Option<String>,
}

/// Modules a prescan found the main module importing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSet {
    pub imports: Vec<String>,
}

impl ImportSet {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Describes `modules`, which must all be recorded in `cache`.
pub fn build_dependency_graph(
    cache: &DependenciesCache,
    modules: &[ModuleDependencyId],
) -> Result<DependencyGraph> {
    let entries = modules
        .iter()
        .map(|id| module_entry(cache, id))
        .collect::<Result<Vec<_>>>()?;
    Ok(DependencyGraph {
        main_module_name: cache.main_module_name().to_string(),
        modules: entries,
    })
}

fn module_entry(cache: &DependenciesCache, id: &ModuleDependencyId) -> Result<ModuleEntry> {
    let info = cache.find_known_dependency(id)?;

    let mut direct = info.direct_dependencies().to_vec();
    direct.sort();
    let direct_dependencies = encode(&direct);
    let overlays = encode(info.overlay_dependencies());

    let link_libraries = info
        .link_libraries()
        .iter()
        .map(|library| LinkLibraryEntry {
            link_name: library.name.clone(),
            is_framework: library.is_framework(),
            should_force_load: library.force_load,
        })
        .collect();

    let cache_key = info.module_cache_key().map(str::to_string);
    let (module_path, source_files, details) = match info.details() {
        ModuleDetails::Interface(details) => {
            let textual = &details.textual;
            let entry = TextualEntry {
                module_interface_path: Some(details.interface_file.clone()),
                compiled_module_candidates: details.compiled_module_candidates.clone(),
                bridging_header: bridging_header_entry(textual),
                nextcode_overlay_dependencies: overlays,
                command_line: textual.build_command_line.clone(),
                bridging_header_build_command: Vec::new(),
                extra_pcm_args: textual.extra_pcm_args.clone(),
                context_hash: details.context_hash.clone(),
                is_framework: details.is_framework,
                is_static: details.is_static,
                cas_fs_root_id: textual.cas_fs_root_id.clone(),
                bridging_header_include_tree: textual.bridging_header_include_tree.clone(),
                macro_dependencies: macro_entries(textual),
                module_cache_key: cache_key,
            };
            (
                details.module_output_path.clone(),
                Vec::new(),
                ModuleDetailsEntry::Textual(entry),
            )
        }
        ModuleDetails::Source(details) => {
            let textual = &details.textual;
            let entry = TextualEntry {
                bridging_header: bridging_header_entry(textual),
                nextcode_overlay_dependencies: overlays,
                command_line: textual.build_command_line.clone(),
                bridging_header_build_command: details.bridging_header_command_line.clone(),
                extra_pcm_args: textual.extra_pcm_args.clone(),
                context_hash: cache.context_hash().to_string(),
                cas_fs_root_id: textual.cas_fs_root_id.clone(),
                bridging_header_include_tree: textual.bridging_header_include_tree.clone(),
                macro_dependencies: macro_entries(textual),
                module_cache_key: cache_key,
                ..Default::default()
            };
            (
                format!("{}.codemodule", id.name),
                details.source_files.clone(),
                ModuleDetailsEntry::Textual(entry),
            )
        }
        ModuleDetails::Binary(details) => {
            let entry = BinaryEntry {
                compiled_module_path: details.compiled_module_path.clone(),
                module_doc_path: details.module_doc_path.clone(),
                module_source_info_path: details.source_info_path.clone(),
                nextcode_overlay_dependencies: overlays,
                header_dependency: details.header_import.clone(),
                header_module_dependencies: details.header_module_dependencies.clone(),
                header_dependencies_source_files: details.header_source_files.clone(),
                is_framework: details.is_framework,
                is_static: details.is_static,
                module_cache_key: cache_key,
            };
            (
                details.compiled_module_path.clone(),
                Vec::new(),
                ModuleDetailsEntry::Binary(entry),
            )
        }
        ModuleDetails::Placeholder(details) => {
            let entry = PlaceholderEntry {
                compiled_module_path: details.compiled_module_path.clone(),
                module_doc_path: details.module_doc_path.clone(),
                module_source_info_path: details.source_info_path.clone(),
            };
            (
                details.compiled_module_path.clone(),
                Vec::new(),
                ModuleDetailsEntry::Placeholder(entry),
            )
        }
        ModuleDetails::Clang(details) => {
            let entry = ClangEntry {
                module_map_path: details.module_map_file.clone(),
                context_hash: details.context_hash.clone(),
                command_line: details.build_command_line.clone(),
                captured_pcm_args: details.captured_pcm_args.clone(),
                cas_fs_root_id: details.cas_fs_root_id.clone(),
                clang_include_tree: details.include_tree.clone(),
                module_cache_key: cache_key,
            };
            (
                details.pcm_output_path.clone(),
                details.file_dependencies.clone(),
                ModuleDetailsEntry::Clang(entry),
            )
        }
    };

    Ok(ModuleEntry {
        module_name: id.encoded_name(),
        module_path,
        source_files,
        direct_dependencies,
        link_libraries,
        details,
    })
}

fn encode(ids: &[ModuleDependencyId]) -> Vec<String> {
    ids.iter().map(ModuleDependencyId::encoded_name).collect()
}

fn bridging_header_entry(textual: &depscan_graph::TextualDetails) -> Option<BridgingHeaderEntry> {
    textual
        .bridging_header
        .as_ref()
        .map(|path| BridgingHeaderEntry {
            path: path.clone(),
            source_files: textual.bridging_source_files.clone(),
            module_dependencies: textual.bridging_module_dependencies.clone(),
        })
}

fn macro_entries(
    textual: &depscan_graph::TextualDetails,
) -> BTreeMap<String, MacroDependencyEntry> {
    textual
        .macro_dependencies
        .iter()
        .map(|(name, dependency)| {
            (
                name.clone(),
                MacroDependencyEntry {
                    library_path: dependency.library_path.clone(),
                    executable_path: dependency.executable_path.clone(),
                },
            )
        })
        .collect()
}
