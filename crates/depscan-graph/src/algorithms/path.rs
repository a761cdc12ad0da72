use rustc_hash::FxHashSet;

use crate::{DependencyChain, ModuleDependencyId, Result};

/// Depth-first search from `from` to the first module matching `is_target`.
///
/// Returns the path including both ends, or `None` when no matching module
/// is reachable. Successors are visited in the order they are returned.
pub fn find_path<P, F>(
    from: &ModuleDependencyId,
    mut is_target: P,
    mut successors: F,
) -> Result<Option<DependencyChain>>
where
    P: FnMut(&ModuleDependencyId) -> bool,
    F: FnMut(&ModuleDependencyId) -> Result<Vec<ModuleDependencyId>>,
{
    if is_target(from) {
        return Ok(Some(DependencyChain::new(vec![from.clone()])));
    }

    let mut visited: FxHashSet<ModuleDependencyId> = FxHashSet::default();
    visited.insert(from.clone());
    // Each frame is a module on the current path plus its unvisited successors.
    let mut stack: Vec<(ModuleDependencyId, std::vec::IntoIter<ModuleDependencyId>)> =
        vec![(from.clone(), successors(from)?.into_iter())];

    while let Some((_, pending)) = stack.last_mut() {
        let Some(next) = pending.next() else {
            stack.pop();
            continue;
        };
        if !visited.insert(next.clone()) {
            continue;
        }
        if is_target(&next) {
            let mut path: Vec<_> = stack.iter().map(|(id, _)| id.clone()).collect();
            path.push(next);
            return Ok(Some(DependencyChain::new(path)));
        }
        let children = successors(&next)?.into_iter();
        stack.push((next, children));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    #[test]
    fn finds_first_path_in_successor_order() {
        let app = ModuleDependencyId::source("App");
        let a = ModuleDependencyId::interface("A");
        let b = ModuleDependencyId::interface("B");
        let target = ModuleDependencyId::clang("T");
        let edges: FxHashMap<_, _> = [
            (app.clone(), vec![a.clone(), b.clone()]),
            (a.clone(), vec![]),
            (b.clone(), vec![target.clone()]),
        ]
        .into_iter()
        .collect();

        let chain = find_path(
            &app,
            |id| *id == target,
            |id| Ok(edges.get(id).cloned().unwrap_or_default()),
        )
        .unwrap()
        .unwrap();

        assert_eq!(chain.path, vec![app, b, target]);
    }

    #[test]
    fn unreachable_target_is_none() {
        let app = ModuleDependencyId::source("App");
        let chain = find_path(
            &app,
            |id| id.name == "Missing",
            |_| Ok(vec![ModuleDependencyId::source("App")]),
        )
        .unwrap();
        assert!(chain.is_none());
    }
}
