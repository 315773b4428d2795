//! Callgraph Studio
//!
//! Call graph aggregation for interval traces and sampled stacks.
//!
//! Per-depth call intervals (or sampled call chains) are merged into a
//! symbol-keyed tree with one node per distinct call path, carrying
//! duration, self time, CPU time, call counts and streaming statistics.
//!
//! ## Getting Started
//!
//! Most users should use the CLI:
//!
//! ```bash
//! callgraph samples --input stacks.folded --summary
//! callgraph intervals --input intervals.json --group-by parent
//! ```
//!
//! Library users build [`callstack::CallStackElement`]s over their own
//! [`callstack::IntervalSource`] and run a [`callgraph::CallGraphBuilder`].

pub mod aggregator;
pub mod callgraph;
pub mod callstack;
pub mod commands;
pub mod model;
pub mod output;
pub mod utils;
