//! Module dependency records.
//!
//! A [`ModuleDependencyInfo`] is a common base (imports, resolved edges, link
//! libraries, content-addressing metadata) plus a kind-specific
//! [`ModuleDetails`] payload. Records move through an explicit lifecycle:
//!
//! ```text
//! Unresolved ──resolve_direct_dependencies──▶ Resolved ──set_finalized──▶ Finalized
//! ```
//!
//! Every mutator checks the current [`ResolutionState`] and returns a typed
//! error when called out of order. A finalized record rejects all mutation.

mod details;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use details::{
    BinaryDetails, ClangDetails, CrossImportDeclaration, CrossImportMap, InterfaceDetails,
    MacroDependency, ModuleDetails, PlaceholderDetails, SourceDetails, TextualDetails,
};

use crate::{
    Error, ImportLocation, ImportStatement, LinkLibrary, ModuleDependencyId,
    ModuleDependencyKind, Result,
};

/// Lifecycle of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResolutionState {
    Unresolved,
    /// Direct imports are mapped to concrete ids.
    Resolved,
    /// Command line and cache key are final; ready for output.
    Finalized,
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResolutionState::Unresolved => "unresolved",
            ResolutionState::Resolved => "resolved",
            ResolutionState::Finalized => "finalized",
        })
    }
}

/// Dependency record for a single module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDependencyInfo {
    imports: Vec<ImportStatement>,
    optional_imports: Vec<ImportStatement>,
    link_libraries: Vec<LinkLibrary>,
    direct_dependencies: Vec<ModuleDependencyId>,
    overlay_dependencies: Vec<ModuleDependencyId>,
    module_cache_key: Option<String>,
    auxiliary_files: Vec<String>,
    /// Set once the bridging header or header import has been scanned, even
    /// when the scan found nothing.
    header_scanned: bool,
    state: ResolutionState,
    details: ModuleDetails,
}

impl ModuleDependencyInfo {
    pub fn new(details: impl Into<ModuleDetails>) -> Self {
        Self {
            imports: Vec::new(),
            optional_imports: Vec::new(),
            link_libraries: Vec::new(),
            direct_dependencies: Vec::new(),
            overlay_dependencies: Vec::new(),
            module_cache_key: None,
            auxiliary_files: Vec::new(),
            header_scanned: false,
            state: ResolutionState::Unresolved,
            details: details.into(),
        }
    }

    pub fn builder(details: impl Into<ModuleDetails>) -> ModuleDependencyInfoBuilder {
        ModuleDependencyInfoBuilder {
            info: Self::new(details),
        }
    }

    pub fn kind(&self) -> ModuleDependencyKind {
        self.details.kind()
    }

    pub fn state(&self) -> ResolutionState {
        self.state
    }

    pub fn is_resolved(&self) -> bool {
        self.state >= ResolutionState::Resolved
    }

    pub fn is_finalized(&self) -> bool {
        self.state == ResolutionState::Finalized
    }

    pub fn is_nextcode_module(&self) -> bool {
        self.kind().is_nextcode()
    }

    pub fn is_textual_module(&self) -> bool {
        self.kind().is_textual()
    }

    pub fn details(&self) -> &ModuleDetails {
        &self.details
    }

    /// Mutable access to the kind-specific payload. Fails once finalized.
    pub fn details_mut(&mut self) -> Result<&mut ModuleDetails> {
        self.ensure_mutable()?;
        Ok(&mut self.details)
    }

    pub fn as_interface(&self) -> Option<&InterfaceDetails> {
        match &self.details {
            ModuleDetails::Interface(details) => Some(details),
            _ => None,
        }
    }

    pub fn as_source(&self) -> Option<&SourceDetails> {
        match &self.details {
            ModuleDetails::Source(details) => Some(details),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&BinaryDetails> {
        match &self.details {
            ModuleDetails::Binary(details) => Some(details),
            _ => None,
        }
    }

    pub fn as_clang(&self) -> Option<&ClangDetails> {
        match &self.details {
            ModuleDetails::Clang(details) => Some(details),
            _ => None,
        }
    }

    pub fn as_placeholder(&self) -> Option<&PlaceholderDetails> {
        match &self.details {
            ModuleDetails::Placeholder(details) => Some(details),
            _ => None,
        }
    }

    pub fn textual(&self) -> Option<&TextualDetails> {
        self.details.textual()
    }

    // ---------------------------------------------------------------------
    // Imports
    // ---------------------------------------------------------------------

    pub fn imports(&self) -> &[ImportStatement] {
        &self.imports
    }

    pub fn optional_imports(&self) -> &[ImportStatement] {
        &self.optional_imports
    }

    pub fn import_names(&self) -> impl Iterator<Item = &str> {
        self.imports.iter().map(|import| import.identifier.as_str())
    }

    pub fn optional_import_names(&self) -> impl Iterator<Item = &str> {
        self.optional_imports
            .iter()
            .map(|import| import.identifier.as_str())
    }

    /// Adds a required import. A repeated name only gains the new location.
    pub fn add_module_import(&mut self, name: &str, location: Option<ImportLocation>) {
        add_import(&mut self.imports, name, location);
    }

    /// Adds a dotted import path such as `Foo.Private`.
    ///
    /// The top-level module becomes a required import. A `Private` submodule
    /// also adds `Foo_Private` as an optional import: the private submodule
    /// may live in a top-level module of that name.
    pub fn add_module_import_path(&mut self, path: &[&str], location: Option<ImportLocation>) {
        let Some(top_level) = path.first() else {
            return;
        };
        if path.get(1) == Some(&"Private") {
            self.add_optional_module_import(&format!("{top_level}_Private"));
        }
        self.add_module_import(top_level, location);
    }

    pub fn add_optional_module_import(&mut self, name: &str) {
        add_import(&mut self.optional_imports, name, None);
    }

    pub fn is_testable_import(&self, name: &str) -> bool {
        self.as_source()
            .is_some_and(|source| source.testable_imports.contains(name))
    }

    // ---------------------------------------------------------------------
    // Resolved edges
    // ---------------------------------------------------------------------

    /// Direct dependencies; empty until resolved.
    pub fn direct_dependencies(&self) -> &[ModuleDependencyId] {
        &self.direct_dependencies
    }

    pub fn overlay_dependencies(&self) -> &[ModuleDependencyId] {
        &self.overlay_dependencies
    }

    /// Direct edges followed by overlay edges, without duplicates.
    pub fn all_dependencies(&self) -> Vec<ModuleDependencyId> {
        let mut all = self.direct_dependencies.clone();
        for id in &self.overlay_dependencies {
            if !all.contains(id) {
                all.push(id.clone());
            }
        }
        all
    }

    /// Sets the resolved direct dependencies.
    ///
    /// Happens once per record. Source modules are the exception: new imports
    /// can surface while the main module is being scanned, so they may be
    /// resolved again.
    pub fn resolve_direct_dependencies(&mut self, ids: Vec<ModuleDependencyId>) -> Result<()> {
        self.ensure_mutable()?;
        if self.is_resolved() && self.kind() != ModuleDependencyKind::Source {
            return Err(Error::AlreadyResolved { kind: self.kind() });
        }
        self.direct_dependencies = dedup(ids);
        self.state = ResolutionState::Resolved;
        Ok(())
    }

    /// Records dependencies on NeXTCode overlays of underlying Clang modules.
    pub fn set_overlay_dependencies(&mut self, ids: Vec<ModuleDependencyId>) -> Result<()> {
        self.ensure_mutable()?;
        if !self.is_nextcode_module() {
            return Err(Error::InvalidState {
                kind: self.kind(),
                operation: "set overlay dependencies of",
            });
        }
        self.overlay_dependencies = dedup(ids);
        Ok(())
    }

    pub fn set_finalized(&mut self) -> Result<()> {
        match self.state {
            ResolutionState::Unresolved => Err(Error::NotResolved { kind: self.kind() }),
            ResolutionState::Finalized => Err(Error::AlreadyFinalized { kind: self.kind() }),
            ResolutionState::Resolved => {
                self.state = ResolutionState::Finalized;
                Ok(())
            }
        }
    }

    // ---------------------------------------------------------------------
    // Link libraries and content addressing
    // ---------------------------------------------------------------------

    pub fn link_libraries(&self) -> &[LinkLibrary] {
        &self.link_libraries
    }

    pub fn set_link_libraries(&mut self, libraries: Vec<LinkLibrary>) -> Result<()> {
        self.ensure_mutable()?;
        self.link_libraries = libraries;
        Ok(())
    }

    pub fn module_cache_key(&self) -> Option<&str> {
        self.module_cache_key.as_deref()
    }

    pub fn update_module_cache_key(&mut self, key: impl Into<String>) -> Result<()> {
        self.ensure_mutable()?;
        self.module_cache_key = Some(key.into());
        Ok(())
    }

    pub fn auxiliary_files(&self) -> &[String] {
        &self.auxiliary_files
    }

    pub fn add_auxiliary_file(&mut self, path: impl Into<String>) -> Result<()> {
        self.ensure_mutable()?;
        let path = path.into();
        if !self.auxiliary_files.contains(&path) {
            self.auxiliary_files.push(path);
        }
        Ok(())
    }

    pub fn cas_fs_root_id(&self) -> Option<&str> {
        match &self.details {
            ModuleDetails::Interface(details) => details.textual.cas_fs_root_id.as_deref(),
            ModuleDetails::Source(details) => details.textual.cas_fs_root_id.as_deref(),
            ModuleDetails::Clang(details) => details.cas_fs_root_id.as_deref(),
            _ => None,
        }
    }

    pub fn update_cas_fs_root_id(&mut self, root_id: impl Into<String>) -> Result<()> {
        self.ensure_mutable()?;
        let root_id = Some(root_id.into());
        match &mut self.details {
            ModuleDetails::Interface(details) => details.textual.cas_fs_root_id = root_id,
            ModuleDetails::Source(details) => details.textual.cas_fs_root_id = root_id,
            ModuleDetails::Clang(details) => details.cas_fs_root_id = root_id,
            _ => {
                return Err(Error::InvalidState {
                    kind: self.kind(),
                    operation: "set the CAS filesystem root of",
                });
            }
        }
        Ok(())
    }

    /// Include tree of a Clang module, or of a textual module's bridging header.
    pub fn clang_include_tree(&self) -> Option<&str> {
        match &self.details {
            ModuleDetails::Clang(details) => details.include_tree.as_deref(),
            ModuleDetails::Interface(details) => {
                details.textual.bridging_header_include_tree.as_deref()
            }
            ModuleDetails::Source(details) => {
                details.textual.bridging_header_include_tree.as_deref()
            }
            _ => None,
        }
    }

    // ---------------------------------------------------------------------
    // Command lines
    // ---------------------------------------------------------------------

    /// Build command line, empty for kinds that are never built.
    pub fn command_line(&self) -> &[String] {
        match &self.details {
            ModuleDetails::Interface(details) => &details.textual.build_command_line,
            ModuleDetails::Source(details) => &details.textual.build_command_line,
            ModuleDetails::Clang(details) => &details.build_command_line,
            _ => &[],
        }
    }

    pub fn update_command_line(&mut self, command_line: Vec<String>) -> Result<()> {
        self.ensure_mutable()?;
        match &mut self.details {
            ModuleDetails::Interface(details) => details.textual.build_command_line = command_line,
            ModuleDetails::Source(details) => details.textual.build_command_line = command_line,
            ModuleDetails::Clang(details) => details.build_command_line = command_line,
            _ => {
                return Err(Error::InvalidState {
                    kind: self.kind(),
                    operation: "update the command line of",
                });
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Bridging and header dependencies
    // ---------------------------------------------------------------------

    /// Bridging header of a textual module, or header import of a binary one.
    pub fn bridging_header(&self) -> Option<&str> {
        match &self.details {
            ModuleDetails::Interface(details) => details.textual.bridging_header.as_deref(),
            ModuleDetails::Source(details) => details.textual.bridging_header.as_deref(),
            ModuleDetails::Binary(details) => details
                .header_import
                .as_deref()
                .filter(|header| !header.is_empty()),
            _ => None,
        }
    }

    /// Clang module names the bridging header or header import depends on.
    pub fn header_dependencies(&self) -> &[String] {
        match &self.details {
            ModuleDetails::Interface(details) => &details.textual.bridging_module_dependencies,
            ModuleDetails::Source(details) => &details.textual.bridging_module_dependencies,
            ModuleDetails::Binary(details) => &details.header_module_dependencies,
            _ => &[],
        }
    }

    pub fn header_input_source_files(&self) -> &[String] {
        match &self.details {
            ModuleDetails::Interface(details) => &details.textual.bridging_source_files,
            ModuleDetails::Source(details) => &details.textual.bridging_source_files,
            ModuleDetails::Binary(details) => &details.header_source_files,
            _ => &[],
        }
    }

    /// Whether header dependencies were attached by a header scan.
    pub fn header_dependencies_scanned(&self) -> bool {
        self.header_scanned
    }

    pub fn set_header_dependencies(
        &mut self,
        source_files: Vec<String>,
        module_dependencies: Vec<String>,
    ) -> Result<()> {
        self.ensure_mutable()?;
        match &mut self.details {
            ModuleDetails::Interface(details) => {
                details.textual.bridging_source_files = source_files;
                details.textual.bridging_module_dependencies = module_dependencies;
            }
            ModuleDetails::Source(details) => {
                details.textual.bridging_source_files = source_files;
                details.textual.bridging_module_dependencies = module_dependencies;
            }
            ModuleDetails::Binary(details) => {
                details.header_source_files = source_files;
                details.header_module_dependencies = module_dependencies;
            }
            _ => {
                return Err(Error::InvalidState {
                    kind: self.kind(),
                    operation: "attach header dependencies to",
                });
            }
        }
        self.header_scanned = true;
        Ok(())
    }

    pub fn macro_dependencies(&self) -> Option<&BTreeMap<String, MacroDependency>> {
        self.textual().map(|textual| &textual.macro_dependencies)
    }

    pub fn add_macro_dependency(&mut self, name: &str, dependency: MacroDependency) -> Result<()> {
        self.ensure_mutable()?;
        let kind = self.kind();
        let textual = self.details.textual_mut().ok_or(Error::InvalidState {
            kind,
            operation: "add a macro dependency to",
        })?;
        textual
            .macro_dependencies
            .entry(name.to_string())
            .or_insert(dependency);
        Ok(())
    }

    pub fn cross_import_overlays(&self) -> Option<&CrossImportMap> {
        match &self.details {
            ModuleDetails::Interface(details) => Some(&details.cross_import_overlays),
            ModuleDetails::Binary(details) => Some(&details.cross_import_overlays),
            _ => None,
        }
    }

    pub fn is_static_library(&self) -> bool {
        match &self.details {
            ModuleDetails::Interface(details) => details.is_static,
            ModuleDetails::Binary(details) => details.is_static,
            _ => false,
        }
    }

    pub fn is_framework(&self) -> bool {
        match &self.details {
            ModuleDetails::Interface(details) => details.is_framework,
            ModuleDetails::Binary(details) => details.is_framework,
            _ => false,
        }
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.is_finalized() {
            return Err(Error::AlreadyFinalized { kind: self.kind() });
        }
        Ok(())
    }
}

fn add_import(imports: &mut Vec<ImportStatement>, name: &str, location: Option<ImportLocation>) {
    match imports.iter_mut().find(|import| import.identifier == name) {
        Some(existing) => {
            if let Some(location) = location {
                existing.add_location(location);
            }
        }
        None => {
            let mut statement = ImportStatement::new(name);
            if let Some(location) = location {
                statement.add_location(location);
            }
            imports.push(statement);
        }
    }
}

fn dedup(ids: Vec<ModuleDependencyId>) -> Vec<ModuleDependencyId> {
    let set: indexmap::IndexSet<ModuleDependencyId> = ids.into_iter().collect();
    set.into_iter().collect()
}

/// Builder for [`ModuleDependencyInfo`], used by loaders and fixtures.
#[derive(Debug, Clone)]
pub struct ModuleDependencyInfoBuilder {
    info: ModuleDependencyInfo,
}

impl ModuleDependencyInfoBuilder {
    pub fn import(mut self, name: &str) -> Self {
        self.info.add_module_import(name, None);
        self
    }

    pub fn import_at(mut self, name: &str, location: ImportLocation) -> Self {
        self.info.add_module_import(name, Some(location));
        self
    }

    pub fn optional_import(mut self, name: &str) -> Self {
        self.info.add_optional_module_import(name);
        self
    }

    pub fn link_library(mut self, library: LinkLibrary) -> Self {
        self.info.link_libraries.push(library);
        self
    }

    pub fn auxiliary_file(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        if !self.info.auxiliary_files.contains(&path) {
            self.info.auxiliary_files.push(path);
        }
        self
    }

    /// Marks the record as arriving already resolved, as Clang records do.
    pub fn resolved(mut self, direct_dependencies: Vec<ModuleDependencyId>) -> Self {
        self.info.direct_dependencies = dedup(direct_dependencies);
        self.info.state = ResolutionState::Resolved;
        self
    }

    pub fn build(self) -> ModuleDependencyInfo {
        self.info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interface() -> ModuleDependencyInfo {
        ModuleDependencyInfo::new(InterfaceDetails {
            interface_file: "/sdk/Foo.codeinterface".into(),
            ..Default::default()
        })
    }

    #[test]
    fn repeated_import_appends_location() {
        let mut info = interface();
        info.add_module_import("Bar", Some(ImportLocation::new("a.nc", 1, 1)));
        info.add_module_import("Bar", Some(ImportLocation::new("b.nc", 3, 1)));
        info.add_module_import("Bar", Some(ImportLocation::new("b.nc", 3, 1)));

        assert_eq!(info.imports().len(), 1);
        assert_eq!(info.imports()[0].locations.len(), 2);
    }

    #[test]
    fn private_import_path_adds_optional_import() {
        let mut info = interface();
        info.add_module_import_path(&["Bar", "Private"], None);

        assert_eq!(info.import_names().collect::<Vec<_>>(), vec!["Bar"]);
        assert_eq!(
            info.optional_import_names().collect::<Vec<_>>(),
            vec!["Bar_Private"]
        );
    }

    #[test]
    fn non_source_modules_resolve_once() {
        let mut info = interface();
        info.resolve_direct_dependencies(vec![ModuleDependencyId::clang("A")])
            .unwrap();
        let err = info
            .resolve_direct_dependencies(vec![ModuleDependencyId::clang("B")])
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyResolved { .. }));
        assert_eq!(info.direct_dependencies(), &[ModuleDependencyId::clang("A")]);
    }

    #[test]
    fn source_modules_may_be_resolved_again() {
        let mut info = ModuleDependencyInfo::new(SourceDetails::default());
        info.resolve_direct_dependencies(vec![ModuleDependencyId::interface("A")])
            .unwrap();
        info.resolve_direct_dependencies(vec![
            ModuleDependencyId::interface("A"),
            ModuleDependencyId::interface("B"),
        ])
        .unwrap();
        assert_eq!(info.direct_dependencies().len(), 2);
    }

    #[test]
    fn finalize_requires_resolution_and_freezes_record() {
        let mut info = interface();
        assert!(matches!(
            info.set_finalized(),
            Err(Error::NotResolved { .. })
        ));

        info.resolve_direct_dependencies(Vec::new()).unwrap();
        info.set_finalized().unwrap();

        assert!(matches!(
            info.update_command_line(vec!["-frontend".into()]),
            Err(Error::AlreadyFinalized { .. })
        ));
        assert!(matches!(
            info.set_finalized(),
            Err(Error::AlreadyFinalized { .. })
        ));
    }

    #[test]
    fn all_dependencies_is_union_without_duplicates() {
        let mut info = interface();
        info.resolve_direct_dependencies(vec![
            ModuleDependencyId::clang("C"),
            ModuleDependencyId::interface("C"),
        ])
        .unwrap();
        info.set_overlay_dependencies(vec![ModuleDependencyId::interface("C")])
            .unwrap();

        assert_eq!(
            info.all_dependencies(),
            vec![
                ModuleDependencyId::clang("C"),
                ModuleDependencyId::interface("C")
            ]
        );
    }

    #[test]
    fn clang_records_reject_overlay_edges() {
        let mut info = ModuleDependencyInfo::builder(ClangDetails::default())
            .resolved(Vec::new())
            .build();
        assert!(info.set_overlay_dependencies(Vec::new()).is_err());
    }

    #[test]
    fn empty_header_scan_still_counts_as_scanned() {
        let mut info = interface();
        assert!(!info.header_dependencies_scanned());

        info.set_header_dependencies(Vec::new(), Vec::new()).unwrap();

        assert!(info.header_dependencies_scanned());
        assert!(info.header_dependencies().is_empty());
    }
}
