use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{Error, ModuleDependencyId, Result};

/// Reachable modules per module, excluding the module itself.
pub type TransitiveClosure = FxHashMap<ModuleDependencyId, BTreeSet<ModuleDependencyId>>;

/// Orders modules so that every module precedes its dependencies.
///
/// Reverse postorder of a depth-first walk started from each entry of
/// `modules` in turn. The graph must already be known to be acyclic.
/// Iterating the result backwards visits dependencies first.
pub fn topological_sort<F>(
    modules: &[ModuleDependencyId],
    mut successors: F,
) -> Result<Vec<ModuleDependencyId>>
where
    F: FnMut(&ModuleDependencyId) -> Result<Vec<ModuleDependencyId>>,
{
    let mut visited: FxHashSet<ModuleDependencyId> = FxHashSet::default();
    let mut postorder = Vec::with_capacity(modules.len());

    for start in modules {
        if !visited.insert(start.clone()) {
            continue;
        }
        let mut stack = vec![(start.clone(), successors(start)?.into_iter())];
        while let Some((_, pending)) = stack.last_mut() {
            match pending.next() {
                Some(next) => {
                    if visited.insert(next.clone()) {
                        let children = successors(&next)?.into_iter();
                        stack.push((next, children));
                    }
                }
                None => {
                    if let Some((finished, _)) = stack.pop() {
                        postorder.push(finished);
                    }
                }
            }
        }
    }

    postorder.reverse();
    Ok(postorder)
}

/// Computes the transitive closure of every module in `topological_order`.
///
/// Modules are visited dependencies-first, so each successor's set is
/// complete by the time its dependents union it in.
pub fn transitive_closure<F>(
    topological_order: &[ModuleDependencyId],
    mut successors: F,
) -> Result<TransitiveClosure>
where
    F: FnMut(&ModuleDependencyId) -> Result<Vec<ModuleDependencyId>>,
{
    let mut closure = TransitiveClosure::default();

    for id in topological_order.iter().rev() {
        let mut reachable = BTreeSet::new();
        for successor in successors(id)? {
            if successor == *id {
                continue;
            }
            let nested = closure
                .get(&successor)
                .ok_or_else(|| Error::DanglingDependency {
                    from: id.clone(),
                    to: successor.clone(),
                })?;
            reachable.extend(nested.iter().cloned());
            reachable.insert(successor);
        }
        reachable.remove(id);
        closure.insert(id.clone(), reachable);
    }

    Ok(closure)
}
