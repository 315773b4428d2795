//! Aggregation of function calls into symbol-keyed trees.
//!
//! This module transforms calls and sampled stacks into:
//! - Mergeable streaming statistics (`statistics`)
//! - Duration and count aggregation nodes (`call_site`)
//! - Per-element group roots (`group`)
//! - Count trees built from stack samples (`stack_builder`)
//! - Hot path analysis and weight distribution (`metrics`)

pub mod call_site;
pub mod group;
pub mod metrics;
pub mod stack_builder;
pub mod statistics;

// Re-export main types and functions
pub use call_site::{AggregatedCallSite, CallSiteData, DurationData};
pub use group::GroupNode;
pub use metrics::{
    calculate_distribution, calculate_hot_paths, collapsed_paths, HotPath, WeightDistribution,
};
pub use stack_builder::{build_profiling_group, parse_folded_line, FrameOrder, ProfilingGroup};
pub use statistics::{AggregatedStatistics, Statistics, StatisticsSnapshot};
