//! Hot paths and weight distribution of an aggregation tree.
//!
//! Every call path of a group gets an exclusive weight: its self time for
//! instrumented calls, or the number of samples ending on it for sampled
//! stacks. Hot paths are the paths with the largest exclusive weight and
//! are the primary targets for optimization.

use super::call_site::{AggregatedCallSite, CallSiteData};
use super::group::GroupNode;
use crate::utils::config::FOLDED_FRAME_SEPARATOR;
use log::debug;
use serde::{Deserialize, Serialize};

/// One call path with its exclusive weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotPath {
    /// Frames joined with `;`, root first
    pub stack: String,

    /// Self time or sample count spent on the innermost frame
    pub weight: i64,

    /// Share of the group's total weight
    pub percentage: f64,

    /// Calls or samples of the innermost frame
    pub calls: u64,
}

/// Exclusive weight of a node: self time, or samples not attributed to a child
fn exclusive_weight(node: &AggregatedCallSite) -> i64 {
    match node.data() {
        CallSiteData::Duration(data) => data.self_time(),
        CallSiteData::Count(count) => {
            let children: u64 = node.children().filter_map(AggregatedCallSite::count).sum();
            count.saturating_sub(children) as i64
        }
    }
}

fn collect_paths(
    node: &AggregatedCallSite,
    prefix: &str,
    paths: &mut Vec<(String, i64, u64)>,
) {
    let stack = if prefix.is_empty() {
        node.symbol().to_string()
    } else {
        format!("{}{}{}", prefix, FOLDED_FRAME_SEPARATOR, node.symbol())
    };
    for child in node.children() {
        collect_paths(child, &stack, paths);
    }
    paths.push((stack, exclusive_weight(node), node.nb_calls()));
}

/// Every call path below the group root with its exclusive weight
///
/// **Public** - also used to export folded stacks
pub fn collapsed_paths(group: &GroupNode) -> Vec<(String, i64, u64)> {
    let mut paths = Vec::new();
    for child in group.children() {
        collect_paths(child, "", &mut paths);
    }
    paths.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    paths
}

/// Calculate hot paths of a group
///
/// **Public** - main entry point for metrics calculation
///
/// # Arguments
/// * `group` - Aggregated group
/// * `top_n` - Number of top paths to return (e.g., 10)
///
/// # Returns
/// Vector of hot paths, sorted by exclusive weight (descending)
pub fn calculate_hot_paths(group: &GroupNode, top_n: usize) -> Vec<HotPath> {
    let total = group.root().length();
    let paths = collapsed_paths(group);
    debug!(
        "Calculating top {} hot paths from {} paths of '{}'",
        top_n,
        paths.len(),
        group.name()
    );

    paths
        .into_iter()
        .take(top_n)
        .map(|(stack, weight, calls)| HotPath {
            stack,
            weight,
            percentage: percentage(weight, total),
            calls,
        })
        .collect()
}

fn percentage(weight: i64, total: i64) -> f64 {
    if total > 0 {
        (weight as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Calculate the weight distribution of a group's call paths
///
/// **Public** - provides summary statistics
pub fn calculate_distribution(group: &GroupNode) -> WeightDistribution {
    let paths = collapsed_paths(group);
    if paths.is_empty() {
        return WeightDistribution::default();
    }

    let total: i64 = paths.iter().map(|p| p.1).sum();
    let count = paths.len();

    let mut weights: Vec<i64> = paths.iter().map(|p| p.1).collect();
    weights.sort_unstable();
    let median = weights[weights.len() / 2];

    // Paths are sorted by weight, heaviest first
    let top_10_percent_count = (count as f64 * 0.1).ceil() as usize;
    let top_10_percent_weight: i64 = paths.iter().take(top_10_percent_count).map(|p| p.1).sum();

    WeightDistribution {
        total_weight: total,
        path_count: count,
        max_depth: group.max_depth(),
        mean_weight_per_path: total / count as i64,
        median_weight_per_path: median,
        top_10_percent_weight,
        top_10_percent_percentage: percentage(top_10_percent_weight, total),
    }
}

/// Weight distribution over the call paths of one group
///
/// **Public** - returned from calculate_distribution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightDistribution {
    /// Sum of exclusive weights
    pub total_weight: i64,

    /// Number of distinct call paths
    pub path_count: usize,

    pub max_depth: usize,

    pub mean_weight_per_path: i64,

    pub median_weight_per_path: i64,

    /// Weight of the heaviest 10% of paths
    pub top_10_percent_weight: i64,

    pub top_10_percent_percentage: f64,
}

impl WeightDistribution {
    /// True if the heaviest 10% of paths hold more than 80% of the weight
    pub fn is_highly_concentrated(&self) -> bool {
        self.top_10_percent_percentage > 80.0
    }

    /// Get human-readable summary
    ///
    /// **Public** - for logging and debugging
    pub fn summary(&self) -> String {
        format!(
            "Total: {} | Paths: {} | Depth: {} | Mean: {} | Median: {} | Top 10%: {:.1}%",
            self.total_weight,
            self.path_count,
            self.max_depth,
            self.mean_weight_per_path,
            self.median_weight_per_path,
            self.top_10_percent_percentage
        )
    }
}
