//! Regrouping of per-element groups.

use crate::aggregator::{AggregatedCallSite, CallSiteData, GroupNode};
use crate::utils::config::ALL_GROUP_NAME;
use crate::utils::error::AggregationError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How leaf element groups are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    /// One group per leaf element
    #[default]
    Leaf,
    /// One group per parent element, e.g. all threads of a process
    Parent,
    /// A single group for every element
    All,
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "leaf" => Ok(GroupBy::Leaf),
            "parent" => Ok(GroupBy::Parent),
            "all" => Ok(GroupBy::All),
            other => Err(format!(
                "unknown grouping '{}', expected leaf, parent or all",
                other
            )),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GroupBy::Leaf => "leaf",
            GroupBy::Parent => "parent",
            GroupBy::All => "all",
        };
        f.write_str(name)
    }
}

/// Combine `groups` according to `by`
///
/// **Public** - applied to the output of a call graph run
///
/// Groups are merged by symbol, the input is left untouched. Output groups
/// keep the order in which their first member appears. Elements without a
/// parent form their own group under `GroupBy::Parent`.
///
/// # Errors
/// * `AggregationError::VariantMismatch` - groups of different modalities
pub fn group_nodes(groups: &[GroupNode], by: GroupBy) -> Result<Vec<GroupNode>, AggregationError> {
    let mut merged: Vec<GroupNode> = Vec::new();

    for group in groups {
        let key = match by {
            GroupBy::Leaf => {
                merged.push(group.clone());
                continue;
            }
            GroupBy::Parent => group.parent().unwrap_or(group.name()),
            GroupBy::All => ALL_GROUP_NAME,
        };

        let position = match merged.iter().position(|g| g.name() == key) {
            Some(position) => position,
            None => {
                merged.push(seed_group(merged.len(), key, group));
                merged.len() - 1
            }
        };
        merged[position].merge_group(group)?;
    }

    debug!("Grouped {} groups by {} into {}", groups.len(), by, merged.len());
    Ok(merged)
}

/// Merge every group into one, `None` when there is nothing to merge
///
/// # Errors
/// * `AggregationError::VariantMismatch` - groups of different modalities
pub fn merge_all(groups: &[GroupNode]) -> Result<Option<GroupNode>, AggregationError> {
    Ok(group_nodes(groups, GroupBy::All)?.into_iter().next())
}

/// Empty duration group that other groups are merged into
pub fn empty_group(id: usize, name: &str) -> GroupNode {
    GroupNode::with_root(id, name, AggregatedCallSite::synthetic(name))
}

/// Empty group of the same modality as `first`, on its host
fn seed_group(id: usize, name: &str, first: &GroupNode) -> GroupNode {
    let group = match first.root().data() {
        CallSiteData::Duration(_) => empty_group(id, name),
        CallSiteData::Count(_) => {
            GroupNode::with_root(id, name, AggregatedCallSite::stack_frame(name, 0, 0))
        }
    };
    group.with_host_id(first.host_id())
}
