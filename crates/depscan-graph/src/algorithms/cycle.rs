use indexmap::IndexSet;
use rustc_hash::FxHashSet;

use crate::{DependencyChain, ModuleDependencyId, ModuleDependencyKind, Result};

/// A cycle found in the dependency graph.
///
/// `chain` starts at the first module of the cycle and ends at the module
/// that closes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyCycle {
    pub chain: DependencyChain,
}

impl DependencyCycle {
    pub fn format(&self) -> String {
        self.chain.format_chain()
    }
}

fn is_nextcode_dependency(id: &ModuleDependencyId) -> bool {
    matches!(
        id.kind,
        ModuleDependencyKind::Interface | ModuleDependencyKind::Binary | ModuleDependencyKind::Source
    )
}

fn cycle_from(
    open: &IndexSet<ModuleDependencyId>,
    start: usize,
    sink: ModuleDependencyId,
) -> DependencyCycle {
    let mut path: Vec<_> = open.iter().skip(start).cloned().collect();
    path.push(sink);
    DependencyCycle {
        chain: DependencyChain::new(path),
    }
}

/// Searches for a cycle reachable from `root`.
///
/// Depth-first with an ordered open set standing in for the recursion stack
/// and a closed set of fully explored modules. A successor already in the
/// open set closes a cycle. A NeXTCode module sharing the root's name is also
/// treated as closing a cycle back to the root, since it would shadow the
/// module being built.
pub fn find_cycle<F>(root: &ModuleDependencyId, mut successors: F) -> Result<Option<DependencyCycle>>
where
    F: FnMut(&ModuleDependencyId) -> Result<Vec<ModuleDependencyId>>,
{
    let mut open: IndexSet<ModuleDependencyId> = IndexSet::new();
    let mut closed: FxHashSet<ModuleDependencyId> = FxHashSet::default();
    open.insert(root.clone());

    while let Some(last) = open.last().cloned() {
        let before = open.len();
        for dependency in successors(&last)? {
            if closed.contains(&dependency) {
                continue;
            }
            if is_nextcode_dependency(&dependency)
                && dependency.name == root.name
                && open.contains(root)
            {
                return Ok(Some(cycle_from(&open, 0, dependency)));
            }
            match open.get_index_of(&dependency) {
                None => {
                    open.insert(dependency);
                    break;
                }
                Some(start) => return Ok(Some(cycle_from(&open, start, dependency))),
            }
        }
        if open.len() == before {
            open.pop();
            closed.insert(last);
        }
    }

    Ok(None)
}
