//! Call graph construction from interval-based call stacks.
//!
//! - `builder` - depth-first traversal producing one group per leaf element
//! - `grouping` - regrouping of the resulting groups (leaf, parent, all)

pub mod builder;
pub mod grouping;

// Re-export main types
pub use builder::{CallGraph, CallGraphBuilder, CallGraphConfig, CancellationToken};
pub use grouping::{empty_group, group_nodes, merge_all, GroupBy};
