//! Report schema definitions for call graph data.
//!
//! This module defines the structure of JSON reports written by the CLI.
//! The library itself owns no format; reports are a read-only view over
//! the aggregation forest. Schema is versioned to allow future evolution.

use crate::aggregator::metrics::{
    calculate_distribution, calculate_hot_paths, HotPath, WeightDistribution,
};
use crate::aggregator::{AggregatedCallSite, CallSiteData, GroupNode, StatisticsSnapshot};
use crate::utils::config::{SCHEMA_VERSION, TIME_UNKNOWN};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Top-level report structure written to JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallGraphReport {
    /// Schema version for compatibility checking
    pub version: String,

    /// Timestamp when the report was generated (RFC 3339)
    pub generated_at: String,

    /// False if the run was cancelled before completion
    pub completed: bool,

    /// One entry per group, in output order
    pub groups: Vec<GroupSummary>,
}

impl CallGraphReport {
    /// Create a report stamped with the current schema version and time
    pub fn new(groups: Vec<GroupSummary>, completed: bool) -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            generated_at: Utc::now().to_rfc3339(),
            completed,
            groups,
        }
    }
}

/// Summary of one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub id: usize,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    pub host_id: String,

    /// Group root: lifetime of the element, or total sample count
    pub root: CallSiteSummary,

    /// Heaviest call paths by exclusive weight
    pub hot_paths: Vec<HotPath>,

    pub distribution: WeightDistribution,
}

impl GroupSummary {
    /// Summarize `group`, keeping its `top_paths` heaviest paths
    pub fn from_group(group: &GroupNode, top_paths: usize) -> Self {
        Self {
            id: group.id(),
            name: group.name().to_string(),
            parent: group.parent().map(str::to_string),
            host_id: group.host_id().to_string(),
            root: CallSiteSummary::from(group.root()),
            hot_paths: calculate_hot_paths(group, top_paths),
            distribution: calculate_distribution(group),
        }
    }
}

/// Statistics of the three duration metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStatistics {
    pub duration: StatisticsSnapshot,
    pub self_time: StatisticsSnapshot,
    pub cpu_time: StatisticsSnapshot,
}

/// Summary of one aggregated call site and its callees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSiteSummary {
    /// Symbol text; numeric symbols are written in decimal
    pub symbol: String,

    /// "integer", "long" or "string"
    pub symbol_type: String,

    pub depth: u32,

    /// Calls (instrumented) or samples (sampled)
    pub calls: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_time: Option<i64>,

    /// Absent when no CPU time could be resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_time: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<MetricStatistics>,

    /// Callees, heaviest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CallSiteSummary>,
}

impl From<&AggregatedCallSite> for CallSiteSummary {
    fn from(node: &AggregatedCallSite) -> Self {
        let mut summary = Self {
            symbol: node.symbol().to_string(),
            symbol_type: node.symbol().type_name().to_string(),
            depth: node.depth(),
            calls: node.nb_calls(),
            duration: None,
            self_time: None,
            cpu_time: None,
            statistics: None,
            children: node
                .sorted_children()
                .into_iter()
                .map(CallSiteSummary::from)
                .collect(),
        };

        if let CallSiteData::Duration(data) = node.data() {
            let statistics = data.statistics();
            summary.duration = Some(data.duration());
            summary.self_time = Some(data.self_time());
            summary.cpu_time = Some(data.cpu_time()).filter(|&cpu| cpu != TIME_UNKNOWN);
            summary.statistics = Some(MetricStatistics {
                duration: statistics.durations().snapshot(),
                self_time: statistics.self_times().snapshot(),
                cpu_time: statistics.cpu_times().snapshot(),
            });
        }
        summary
    }
}
