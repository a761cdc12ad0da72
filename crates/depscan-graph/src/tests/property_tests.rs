//! Property-based tests for depscan-graph using proptest.
//!
//! Random graphs are generated over a fixed pool of module names. Acyclic
//! graphs only contain edges from lower to higher indices; cyclic graphs add
//! a back edge.
//!
//! Run with: cargo test --features proptest --package depscan-graph property_tests

#![cfg(feature = "proptest")]

use std::collections::BTreeSet;

use proptest::prelude::*;
use rustc_hash::FxHashMap;

use crate::{
    InterfaceDetails, ModuleDependencyId, ModuleDependencyInfo, Result, ScanningService,
    find_cycle, topological_sort, transitive_closure,
};

type Edges = FxHashMap<ModuleDependencyId, Vec<ModuleDependencyId>>;

fn node(index: usize) -> ModuleDependencyId {
    ModuleDependencyId::interface(format!("M{index}"))
}

/// Strategy for DAGs with 1-30 nodes: edges only point "forward".
fn dag_strategy() -> impl Strategy<Value = (usize, Edges)> {
    (1usize..=30).prop_flat_map(|count| {
        prop::collection::vec((0..count, 0..count), 0..=count * 3).prop_map(move |pairs| {
            let mut edges: Edges = (0..count).map(|i| (node(i), Vec::new())).collect();
            for (a, b) in pairs {
                let (from, to) = (a.min(b), a.max(b));
                if from == to {
                    continue;
                }
                let list = edges.entry(node(from)).or_default();
                if !list.contains(&node(to)) {
                    list.push(node(to));
                }
            }
            // Root everything at M0 so one traversal covers the graph.
            for i in 1..count {
                let root = edges.entry(node(0)).or_default();
                if !root.contains(&node(i)) {
                    root.push(node(i));
                }
            }
            (count, edges)
        })
    })
}

fn successors(edges: &Edges) -> impl Fn(&ModuleDependencyId) -> Result<Vec<ModuleDependencyId>> + Copy + '_ {
    move |id| Ok(edges.get(id).cloned().unwrap_or_default())
}

fn reachable(edges: &Edges, from: &ModuleDependencyId) -> BTreeSet<ModuleDependencyId> {
    let mut seen = BTreeSet::new();
    let mut stack = edges.get(from).cloned().unwrap_or_default();
    while let Some(next) = stack.pop() {
        if seen.insert(next.clone()) {
            stack.extend(edges.get(&next).cloned().unwrap_or_default());
        }
    }
    seen.remove(from);
    seen
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Property: acyclic graphs never report a cycle.
    #[test]
    fn prop_dag_has_no_cycle((_, edges) in dag_strategy()) {
        prop_assert!(find_cycle(&node(0), successors(&edges)).unwrap().is_none());
    }

    /// Property: a back edge always produces a cycle that starts and ends at
    /// the same module.
    #[test]
    fn prop_back_edge_is_detected((count, mut edges) in dag_strategy(), pick in any::<prop::sample::Index>()) {
        prop_assume!(count > 1);
        let target = pick.index(count - 1) + 1;
        edges.entry(node(target)).or_default().push(node(0));

        let cycle = find_cycle(&node(0), successors(&edges)).unwrap();
        prop_assert!(cycle.is_some());
        let cycle = cycle.unwrap();
        prop_assert_eq!(cycle.chain.start(), cycle.chain.end());
    }

    /// Property: topological order places every module before its dependencies.
    #[test]
    fn prop_topological_order_respects_edges((count, edges) in dag_strategy()) {
        let order = topological_sort(&[node(0)], successors(&edges)).unwrap();
        prop_assert_eq!(order.len(), count);

        let position: FxHashMap<_, _> = order.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();
        for (from, tos) in &edges {
            for to in tos {
                prop_assert!(position[from] < position[to]);
            }
        }
    }

    /// Property: the dynamic-programming closure equals plain reachability.
    #[test]
    fn prop_closure_matches_reachability((_, edges) in dag_strategy()) {
        let order = topological_sort(&[node(0)], successors(&edges)).unwrap();
        let closure = transitive_closure(&order, successors(&edges)).unwrap();
        for id in &order {
            prop_assert_eq!(&closure[id], &reachable(&edges, id));
        }
    }

    /// Property: find after record returns the recorded value; recording the
    /// same id twice fails.
    #[test]
    fn prop_insert_once(names in prop::collection::btree_set("[A-Z][a-z]{0,6}", 1..=20)) {
        let service = ScanningService::new();
        service.configure_for_context_hash("ctx");
        for name in &names {
            let info = ModuleDependencyInfo::builder(InterfaceDetails::default()).import(name).build();
            service.record_dependency(name, info.clone(), "ctx").unwrap();
            let found = service.find_dependency(name, None, "ctx").unwrap().unwrap();
            prop_assert_eq!(found.as_ref(), &info);
            prop_assert!(service.record_dependency(name, info, "ctx").is_err());
        }
        prop_assert_eq!(service.module_count("ctx").unwrap(), names.len());
    }
}
