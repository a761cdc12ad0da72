//! Paths through the module dependency graph.
//!
//! Used to explain diagnostics: the import chain that led to a missing
//! module, or the modules that form a cycle.

use serde::{Deserialize, Serialize};

use crate::ModuleDependencyId;

/// An ordered path of modules, first to last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyChain {
    pub path: Vec<ModuleDependencyId>,
    /// Number of edges in the path.
    pub depth: usize,
}

impl DependencyChain {
    pub fn new(path: Vec<ModuleDependencyId>) -> Self {
        let depth = path.len().saturating_sub(1);
        Self { path, depth }
    }

    pub fn start(&self) -> Option<&ModuleDependencyId> {
        self.path.first()
    }

    pub fn end(&self) -> Option<&ModuleDependencyId> {
        self.path.last()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Adjacent `(from, to)` pairs along the path.
    pub fn edges(&self) -> impl Iterator<Item = (&ModuleDependencyId, &ModuleDependencyId)> {
        self.path.windows(2).map(|pair| (&pair[0], &pair[1]))
    }

    /// Format the chain with each module's backing artifact.
    ///
    /// Example: `App (Source Target) -> Foo.codeinterface -> Bar.pcm`
    pub fn format_chain(&self) -> String {
        self.path
            .iter()
            .map(ModuleDependencyId::display_with_artifact)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_artifact_suffixes() {
        let chain = DependencyChain::new(vec![
            ModuleDependencyId::source("A"),
            ModuleDependencyId::interface("B"),
            ModuleDependencyId::binary("C"),
            ModuleDependencyId::clang("D"),
        ]);
        assert_eq!(
            chain.format_chain(),
            "A (Source Target) -> B.codeinterface -> C.codemodule -> D.pcm"
        );
        assert_eq!(chain.depth, 3);
        assert_eq!(chain.edges().count(), 3);
    }

    #[test]
    fn empty_chain_has_zero_depth() {
        let chain = DependencyChain::new(Vec::new());
        assert!(chain.is_empty());
        assert_eq!(chain.depth, 0);
        assert_eq!(chain.format_chain(), "");
    }
}
