//! Symbol-keyed aggregation tree.
//!
//! An [`AggregatedCallSite`] summarizes every occurrence of one call path.
//! Children are keyed by symbol; adding a child whose symbol is already
//! present merges the two subtrees deeply instead of replacing one.
//!
//! Two modalities share the tree shape and are kept apart by
//! [`CallSiteData`]:
//! - `Duration` - instrumented calls: duration, self time, CPU time and
//!   statistics per metric
//! - `Count` - sampled stack traces: number of occurrences
//!
//! Merging is associative and commutative, so the resulting tree does not
//! depend on the order occurrences were added in.

use super::statistics::AggregatedStatistics;
use crate::callstack::{CalledFunction, Symbol};
use crate::utils::config::TIME_UNKNOWN;
use crate::utils::error::AggregationError;
use std::collections::HashMap;
use std::fmt;

/// Metrics of an instrumented (duration-based) call site
#[derive(Debug, Clone, PartialEq)]
pub struct DurationData {
    duration: i64,
    self_time: i64,
    cpu_time: i64,
    process_id: i32,
    statistics: AggregatedStatistics,
}

impl DurationData {
    pub fn duration(&self) -> i64 {
        self.duration
    }

    pub fn self_time(&self) -> i64 {
        self.self_time
    }

    /// Total resolved CPU time, or `TIME_UNKNOWN` if none was resolved
    pub fn cpu_time(&self) -> i64 {
        self.cpu_time
    }

    pub fn process_id(&self) -> i32 {
        self.process_id
    }

    pub fn statistics(&self) -> &AggregatedStatistics {
        &self.statistics
    }

    fn merge(&mut self, other: &DurationData) {
        self.duration += other.duration;
        self.self_time += other.self_time;
        self.cpu_time = add_cpu_time(self.cpu_time, other.cpu_time);
        self.statistics.merge(&other.statistics);
    }
}

/// Unresolved operands are skipped, never counted as zero
fn add_cpu_time(a: i64, b: i64) -> i64 {
    match (a == TIME_UNKNOWN, b == TIME_UNKNOWN) {
        (false, false) => a + b,
        (false, true) => a,
        (true, false) => b,
        (true, true) => TIME_UNKNOWN,
    }
}

/// Per-modality payload of a call site
#[derive(Debug, Clone, PartialEq)]
pub enum CallSiteData {
    Duration(DurationData),
    Count(u64),
}

impl CallSiteData {
    fn kind(&self) -> &'static str {
        match self {
            CallSiteData::Duration(_) => "duration",
            CallSiteData::Count(_) => "count",
        }
    }
}

/// One node of the aggregation tree
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedCallSite {
    symbol: Symbol,
    depth: u32,
    data: CallSiteData,
    children: HashMap<Symbol, AggregatedCallSite>,
}

impl AggregatedCallSite {
    /// Duration node seeded from one occurrence
    ///
    /// Duration and self time start at the call's duration; statistics stay
    /// empty until the occurrence is recorded through [`Self::add_called_child`].
    pub fn from_function(function: &CalledFunction) -> Self {
        Self {
            symbol: function.symbol().clone(),
            depth: function.depth(),
            data: CallSiteData::Duration(DurationData {
                duration: function.duration(),
                self_time: function.duration(),
                cpu_time: function.cpu_time(),
                process_id: function.process_id(),
                statistics: AggregatedStatistics::new(),
            }),
            children: HashMap::new(),
        }
    }

    /// Empty duration root that other roots are merged into
    pub fn synthetic(symbol: impl Into<Symbol>) -> Self {
        Self {
            symbol: symbol.into(),
            depth: 0,
            data: CallSiteData::Duration(DurationData {
                duration: 0,
                self_time: 0,
                cpu_time: TIME_UNKNOWN,
                process_id: -1,
                statistics: AggregatedStatistics::new(),
            }),
            children: HashMap::new(),
        }
    }

    /// Count node for one frame of a sampled stack trace
    pub fn stack_frame(symbol: impl Into<Symbol>, depth: u32, count: u64) -> Self {
        Self {
            symbol: symbol.into(),
            depth,
            data: CallSiteData::Count(count),
            children: HashMap::new(),
        }
    }

    /// Same node under another symbol, used to merge roots of different groups
    pub fn renamed(mut self, symbol: impl Into<Symbol>) -> Self {
        self.symbol = symbol.into();
        self
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Depth in the call stack; direct children of a group are at depth 1
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn data(&self) -> &CallSiteData {
        &self.data
    }

    pub fn children(&self) -> impl Iterator<Item = &AggregatedCallSite> {
        self.children.values()
    }

    pub fn child(&self, symbol: &Symbol) -> Option<&AggregatedCallSite> {
        self.children.get(symbol)
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Children sorted by decreasing length, ties broken by symbol
    pub fn sorted_children(&self) -> Vec<&AggregatedCallSite> {
        let mut children: Vec<&AggregatedCallSite> = self.children.values().collect();
        children.sort_by(|a, b| {
            b.length()
                .cmp(&a.length())
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        children
    }

    /// Weight of the node: total duration or occurrence count
    pub fn length(&self) -> i64 {
        match &self.data {
            CallSiteData::Duration(data) => data.duration,
            CallSiteData::Count(count) => *count as i64,
        }
    }

    pub fn duration_data(&self) -> Option<&DurationData> {
        match &self.data {
            CallSiteData::Duration(data) => Some(data),
            CallSiteData::Count(_) => None,
        }
    }

    pub fn duration(&self) -> Option<i64> {
        self.duration_data().map(DurationData::duration)
    }

    pub fn self_time(&self) -> Option<i64> {
        self.duration_data().map(DurationData::self_time)
    }

    pub fn cpu_time(&self) -> Option<i64> {
        self.duration_data().map(DurationData::cpu_time)
    }

    pub fn statistics(&self) -> Option<&AggregatedStatistics> {
        self.duration_data().map(DurationData::statistics)
    }

    /// Number of recorded calls (duration) or occurrences (count)
    pub fn nb_calls(&self) -> u64 {
        match &self.data {
            CallSiteData::Duration(data) => data.statistics.durations().count(),
            CallSiteData::Count(count) => *count,
        }
    }

    /// Occurrence count of a sampled call site
    pub fn count(&self) -> Option<u64> {
        match &self.data {
            CallSiteData::Count(count) => Some(*count),
            CallSiteData::Duration(_) => None,
        }
    }

    /// Height of the subtree below this node: 0 for a leaf
    pub fn max_depth(&self) -> usize {
        self.children
            .values()
            .map(|child| child.max_depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Record one occurrence in this node's statistics
    ///
    /// No-op on count nodes.
    pub fn add_function_call(&mut self, function: &CalledFunction) {
        if let CallSiteData::Duration(data) = &mut self.data {
            data.statistics.update(function);
        }
    }

    /// Attach the aggregate of a direct callee occurrence
    ///
    /// **Public** - used by the call graph builder for each call found
    ///
    /// Records `call` in `child`'s statistics, removes the child's duration
    /// from this node's self time, then merges or inserts the child.
    ///
    /// # Errors
    /// * `AggregationError::NegativeSelfTime` - children overflow this node
    /// * `AggregationError::VariantMismatch` - modalities differ
    pub fn add_called_child(
        &mut self,
        call: &CalledFunction,
        mut child: AggregatedCallSite,
    ) -> Result<(), AggregationError> {
        child.add_function_call(call);
        self.adopt_child(child)
    }

    /// Attach an already aggregated subtree as a direct child
    ///
    /// Duration nodes give up the child's duration from their self time.
    ///
    /// # Errors
    /// * `AggregationError::NegativeSelfTime` - children overflow this node;
    ///   the node is left unchanged
    /// * `AggregationError::VariantMismatch` - modalities differ
    pub fn adopt_child(&mut self, child: AggregatedCallSite) -> Result<(), AggregationError> {
        if let CallSiteData::Duration(data) = &mut self.data {
            let child_duration = child.duration().ok_or(AggregationError::VariantMismatch {
                expected: "duration",
                found: child.data.kind(),
            })?;
            let self_time = data.self_time - child_duration;
            if self_time < 0 {
                return Err(AggregationError::NegativeSelfTime {
                    symbol: self.symbol.to_string(),
                    self_time,
                });
            }
            data.self_time = self_time;
        }
        self.add_child(child)
    }

    /// Insert `child`, or merge it into the existing child of the same symbol
    ///
    /// # Errors
    /// * `AggregationError::VariantMismatch` - modalities differ
    pub fn add_child(&mut self, child: AggregatedCallSite) -> Result<(), AggregationError> {
        if self.data.kind() != child.data.kind() {
            return Err(AggregationError::VariantMismatch {
                expected: self.data.kind(),
                found: child.data.kind(),
            });
        }
        match self.children.get_mut(&child.symbol) {
            Some(existing) => existing.merge(child),
            None => {
                self.children.insert(child.symbol.clone(), child);
                Ok(())
            }
        }
    }

    /// Merge another aggregate of the same symbol into this one
    ///
    /// Sums metrics (or counts), merges statistics and recursively merges
    /// every child of `other` by symbol.
    ///
    /// # Errors
    /// * `AggregationError::SymbolMismatch` - symbols differ
    /// * `AggregationError::VariantMismatch` - modalities differ
    pub fn merge(&mut self, other: AggregatedCallSite) -> Result<(), AggregationError> {
        if self.symbol != other.symbol {
            return Err(AggregationError::SymbolMismatch {
                expected: format!("{} ({})", self.symbol, self.symbol.type_name()),
                found: format!("{} ({})", other.symbol, other.symbol.type_name()),
            });
        }
        match (&mut self.data, &other.data) {
            (CallSiteData::Duration(mine), CallSiteData::Duration(theirs)) => mine.merge(theirs),
            (CallSiteData::Count(mine), CallSiteData::Count(theirs)) => *mine += *theirs,
            (mine, theirs) => {
                return Err(AggregationError::VariantMismatch {
                    expected: mine.kind(),
                    found: theirs.kind(),
                })
            }
        }
        for child in other.children.into_values() {
            self.add_child(child)?;
        }
        Ok(())
    }
}

impl fmt::Display for AggregatedCallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            CallSiteData::Duration(data) => write!(
                f,
                "Aggregate Function: {}, Duration: {}, Self Time: {} on {} calls",
                self.symbol,
                data.duration,
                data.self_time,
                self.nb_calls()
            ),
            CallSiteData::Count(count) => {
                write!(f, "Aggregate Stack: {}, Count: {}", self.symbol, count)
            }
        }
    }
}
