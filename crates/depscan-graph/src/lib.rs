//! # depscan-graph
//!
//! Module dependency records, the two-level scanning cache, and the graph
//! algorithms the scanner runs over resolved edges.
//!
//! ## Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ ScanningService (one per session)                           │
//! │  context hash ─▶ [ kind ─▶ name ─▶ Arc<ModuleDependencyInfo> ]
//! └───────────────▲─────────────────────────────▲───────────────┘
//!                 │                             │
//!    ┌────────────┴──────────┐     ┌────────────┴──────────┐
//!    │ DependenciesCache     │     │ DependenciesCache     │
//!    │ (scan of App)         │     │ (scan of Tool)        │
//!    └───────────────────────┘     └───────────────────────┘
//! ```
//!
//! Vertices of the graph are [`ModuleDependencyId`]s. Edges are each record's
//! direct dependencies plus its overlay dependencies, see
//! [`DependenciesCache::all_dependencies`].
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use depscan_graph::{
//!     DependenciesCache, InterfaceDetails, ModuleDependencyId, ModuleDependencyInfo,
//!     ScanningService,
//! };
//!
//! # fn main() -> depscan_graph::Result<()> {
//! let service = Arc::new(ScanningService::new());
//! let mut cache = DependenciesCache::new(service, "App", "/build/modules", "x86_64-ctx");
//!
//! cache.record_dependency("Foo", ModuleDependencyInfo::new(InterfaceDetails::default()))?;
//! let foo = ModuleDependencyId::interface("Foo");
//! cache.resolve_dependency_imports(&foo, Vec::new())?;
//!
//! assert!(cache.find_known_dependency(&foo)?.is_resolved());
//! # Ok(())
//! # }
//! ```
//!
//! ## Record lifecycle
//!
//! Records are insert-once in the service and are replaced, never mutated in
//! place. Resolution state moves `Unresolved → Resolved → Finalized`, and
//! out-of-order transitions return an [`Error`].

pub mod algorithms;
pub mod cache;
pub mod dependency_chain;
pub mod import;
pub mod info;
pub mod link_library;
pub mod module_id;
pub mod service;

pub use algorithms::{
    DependencyCycle, TransitiveClosure, find_cycle, find_path, topological_sort,
    transitive_closure,
};
pub use cache::{CROSS_IMPORT_DUMMY_MODULE, DependenciesCache};
pub use dependency_chain::DependencyChain;
pub use import::{ImportLocation, ImportStatement};
pub use info::{
    BinaryDetails, ClangDetails, CrossImportDeclaration, CrossImportMap, InterfaceDetails,
    MacroDependency, ModuleDependencyInfo, ModuleDependencyInfoBuilder, ModuleDetails,
    PlaceholderDetails, ResolutionState, SourceDetails, TextualDetails,
};
pub use link_library::{LibraryKind, LinkLibrary};
pub use module_id::{ClangModuleId, ModuleDependencyId, ModuleDependencyKind};
pub use service::ScanningService;

#[cfg(test)]
mod tests;

/// Error type for graph operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("module {0} is already recorded")]
    AlreadyRecorded(ModuleDependencyId),

    #[error("module {0} is not recorded")]
    NotRecorded(ModuleDependencyId),

    #[error("scanning context '{0}' was never configured")]
    UnknownContextHash(String),

    #[error("record for {id} has kind {found}")]
    KindMismatch {
        id: ModuleDependencyId,
        found: ModuleDependencyKind,
    },

    #[error("{kind} module dependencies are already resolved")]
    AlreadyResolved { kind: ModuleDependencyKind },

    #[error("{kind} module dependencies are not resolved yet")]
    NotResolved { kind: ModuleDependencyKind },

    #[error("{kind} module is finalized and cannot change")]
    AlreadyFinalized { kind: ModuleDependencyKind },

    #[error("cannot {operation} a {kind} module")]
    InvalidState {
        kind: ModuleDependencyKind,
        operation: &'static str,
    },

    #[error("{from} depends on {to}, which is not part of the graph")]
    DanglingDependency {
        from: ModuleDependencyId,
        to: ModuleDependencyId,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for graph operations.
pub type Result<T> = std::result::Result<T, Error>;
