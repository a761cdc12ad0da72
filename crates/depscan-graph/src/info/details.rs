//! Per-kind payloads carried by a [`ModuleDependencyInfo`](super::ModuleDependencyInfo).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ModuleDependencyKind;

/// A compiler plugin providing macros to a textual module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroDependency {
    pub library_path: String,
    pub executable_path: String,
}

/// A `.codecrossimport` declaration: importing both the declaring module and
/// `secondary` pulls in the listed overlay modules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossImportDeclaration {
    /// File that declares the overlays.
    pub file: String,
    pub overlays: Vec<String>,
}

/// Secondary module name to the overlays it enables.
pub type CrossImportMap = BTreeMap<String, CrossImportDeclaration>;

/// State shared by modules built from text (interfaces and the source module).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextualDetails {
    pub build_command_line: Vec<String>,
    /// Arguments a Clang dependency must be built with to be importable here.
    pub extra_pcm_args: Vec<String>,
    pub bridging_header: Option<String>,
    pub bridging_source_files: Vec<String>,
    pub bridging_module_dependencies: Vec<String>,
    pub macro_dependencies: BTreeMap<String, MacroDependency>,
    pub cas_fs_root_id: Option<String>,
    pub bridging_header_include_tree: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDetails {
    /// Where the explicit build writes the compiled module.
    pub module_output_path: String,
    pub interface_file: String,
    pub compiled_module_candidates: Vec<String>,
    pub context_hash: String,
    pub is_framework: bool,
    pub is_static: bool,
    pub textual: TextualDetails,
    pub cross_import_overlays: CrossImportMap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDetails {
    pub source_files: Vec<String>,
    pub testable_imports: BTreeSet<String>,
    pub bridging_header_command_line: Vec<String>,
    pub textual: TextualDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryDetails {
    pub compiled_module_path: String,
    pub module_doc_path: String,
    pub source_info_path: String,
    /// Header the binary module was built against, if any.
    pub header_import: Option<String>,
    pub header_source_files: Vec<String>,
    pub header_module_dependencies: Vec<String>,
    pub is_framework: bool,
    pub is_static: bool,
    pub cross_import_overlays: CrossImportMap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClangDetails {
    pub pcm_output_path: String,
    /// PCM path after prefix remapping; what dependents reference.
    pub mapped_pcm_path: String,
    pub module_map_file: String,
    pub context_hash: String,
    pub build_command_line: Vec<String>,
    pub file_dependencies: Vec<String>,
    pub captured_pcm_args: Vec<String>,
    pub cas_fs_root_id: Option<String>,
    pub include_tree: Option<String>,
    pub is_system: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderDetails {
    pub compiled_module_path: String,
    pub module_doc_path: String,
    pub source_info_path: String,
}

/// Kind-specific part of a dependency record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleDetails {
    Interface(InterfaceDetails),
    Source(SourceDetails),
    Binary(BinaryDetails),
    Clang(ClangDetails),
    Placeholder(PlaceholderDetails),
}

impl ModuleDetails {
    pub fn kind(&self) -> ModuleDependencyKind {
        match self {
            ModuleDetails::Interface(_) => ModuleDependencyKind::Interface,
            ModuleDetails::Source(_) => ModuleDependencyKind::Source,
            ModuleDetails::Binary(_) => ModuleDependencyKind::Binary,
            ModuleDetails::Clang(_) => ModuleDependencyKind::Clang,
            ModuleDetails::Placeholder(_) => ModuleDependencyKind::Placeholder,
        }
    }

    pub fn textual(&self) -> Option<&TextualDetails> {
        match self {
            ModuleDetails::Interface(details) => Some(&details.textual),
            ModuleDetails::Source(details) => Some(&details.textual),
            _ => None,
        }
    }

    pub fn textual_mut(&mut self) -> Option<&mut TextualDetails> {
        match self {
            ModuleDetails::Interface(details) => Some(&mut details.textual),
            ModuleDetails::Source(details) => Some(&mut details.textual),
            _ => None,
        }
    }
}

impl From<InterfaceDetails> for ModuleDetails {
    fn from(details: InterfaceDetails) -> Self {
        ModuleDetails::Interface(details)
    }
}

impl From<SourceDetails> for ModuleDetails {
    fn from(details: SourceDetails) -> Self {
        ModuleDetails::Source(details)
    }
}

impl From<BinaryDetails> for ModuleDetails {
    fn from(details: BinaryDetails) -> Self {
        ModuleDetails::Binary(details)
    }
}

impl From<ClangDetails> for ModuleDetails {
    fn from(details: ClangDetails) -> Self {
        ModuleDetails::Clang(details)
    }
}

impl From<PlaceholderDetails> for ModuleDetails {
    fn from(details: PlaceholderDetails) -> Self {
        ModuleDetails::Placeholder(details)
    }
}
