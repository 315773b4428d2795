//! Per-element roots of the aggregation forest.

use super::call_site::AggregatedCallSite;
use crate::callstack::{CalledFunction, Symbol};
use crate::utils::error::AggregationError;
use std::fmt;

/// Root of the aggregation tree of one leaf element (e.g. one thread)
///
/// The root node spans the element's lifetime, so the group's own self time
/// is the part of the lifetime not covered by any depth-1 call. Direct
/// children are at depth 1.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    id: usize,
    name: String,
    parent: Option<String>,
    host_id: String,
    root: AggregatedCallSite,
}

impl GroupNode {
    /// Group seeded from the synthetic function spanning an element's lifetime
    pub fn from_root_function(
        id: usize,
        name: impl Into<String>,
        root_function: &CalledFunction,
    ) -> Self {
        Self::with_root(id, name, AggregatedCallSite::from_function(root_function))
    }

    /// Group around an existing root node
    pub fn with_root(id: usize, name: impl Into<String>, root: AggregatedCallSite) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
            host_id: String::new(),
            root,
        }
    }

    pub fn with_parent(mut self, parent: Option<String>) -> Self {
        self.parent = parent;
        self
    }

    pub fn with_host_id(mut self, host_id: impl Into<String>) -> Self {
        self.host_id = host_id.into();
        self
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Display name of the group
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent element name (e.g. the owning process), if known
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    pub fn root(&self) -> &AggregatedCallSite {
        &self.root
    }

    /// Top-level call sites, all at depth 1
    pub fn children(&self) -> impl Iterator<Item = &AggregatedCallSite> {
        self.root.children()
    }

    pub fn child(&self, symbol: &Symbol) -> Option<&AggregatedCallSite> {
        self.root.child(symbol)
    }

    /// Depth of the deepest call site below this group
    pub fn max_depth(&self) -> usize {
        self.root.max_depth()
    }

    /// Attach the aggregate of one depth-1 call
    ///
    /// # Errors
    /// See [`AggregatedCallSite::add_called_child`]
    pub fn add_called_child(
        &mut self,
        call: &CalledFunction,
        child: AggregatedCallSite,
    ) -> Result<(), AggregationError> {
        self.root.add_called_child(call, child)
    }

    pub(crate) fn root_mut(&mut self) -> &mut AggregatedCallSite {
        &mut self.root
    }

    /// Fold another group into this one
    ///
    /// Root metrics are summed and top-level children merged by symbol;
    /// `other` is left untouched.
    ///
    /// # Errors
    /// * `AggregationError::VariantMismatch` - the groups use different modalities
    pub fn merge_group(&mut self, other: &GroupNode) -> Result<(), AggregationError> {
        let root = other.root.clone().renamed(self.root.symbol().clone());
        self.root.merge(root)
    }
}

impl fmt::Display for GroupNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Group {} [{}]: {}", self.id, self.name, self.root)
    }
}
