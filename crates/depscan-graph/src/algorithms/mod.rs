//! Graph algorithms over resolved dependency edges.
//!
//! All traversals are iterative with explicit stacks; real module graphs run
//! to thousands of nodes. Edges are supplied by a successor function so the
//! algorithms work over a [`DependenciesCache`](crate::DependenciesCache) or
//! a plain adjacency map alike.

mod cycle;
mod path;
mod topo;

pub use cycle::{DependencyCycle, find_cycle};
pub use path::find_path;
pub use topo::{TransitiveClosure, topological_sort, transitive_closure};
