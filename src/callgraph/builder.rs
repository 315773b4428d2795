//! Depth-first construction of the call graph from call stacks.
//!
//! For every leaf element, a synthetic root call spanning the element's
//! lifetime seeds a [`GroupNode`]. The builder then enumerates the calls of
//! each depth in chronological order, bounded by their caller, builds each
//! call's subtree first and finally merges the call's aggregate into its
//! caller's node.
//!
//! Failures of the interval source drop the affected branch only.
//! Cancellation is polled between siblings at every depth and yields the
//! forest built so far, flagged as incomplete.

use super::grouping::empty_group;
use crate::aggregator::{AggregatedCallSite, GroupNode};
use crate::callstack::{CallStack, CallStackElement, CalledFunction, Symbol};
use crate::model::{HostModel, ModelRegistry};
use crate::utils::config::ALL_GROUP_NAME;
use crate::utils::error::{CallGraphError, QueryError};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

/// Call graph build configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallGraphConfig {
    /// Build independent leaf elements on worker threads
    pub parallel: bool,

    /// Retain every visited call and the list of depth-1 calls
    pub keep_segments: bool,
}

impl CallGraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_keep_segments(mut self, keep_segments: bool) -> Self {
        self.keep_segments = keep_segments;
        self
    }
}

/// Cooperative cancellation flag shared with a running build
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Output of one analysis run
#[derive(Debug, Clone, PartialEq)]
pub struct CallGraph {
    groups: Vec<GroupNode>,
    completed: bool,
    root_functions: Vec<CalledFunction>,
    segments: Vec<CalledFunction>,
}

impl CallGraph {
    /// One group per leaf element, in input order
    pub fn groups(&self) -> &[GroupNode] {
        &self.groups
    }

    pub fn into_groups(self) -> Vec<GroupNode> {
        self.groups
    }

    pub fn group(&self, name: &str) -> Option<&GroupNode> {
        self.groups.iter().find(|group| group.name() == name)
    }

    /// False when the run was cancelled before every element was walked
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Depth-1 calls, kept only with `keep_segments`
    pub fn root_functions(&self) -> &[CalledFunction] {
        &self.root_functions
    }

    /// Every visited call with its final self time, kept only with `keep_segments`
    pub fn segments(&self) -> &[CalledFunction] {
        &self.segments
    }
}

/// Result of walking one element
struct ElementGraph {
    group: GroupNode,
    completed: bool,
    root_functions: Vec<CalledFunction>,
    segments: Vec<CalledFunction>,
}

/// Traversal state of one element
struct Walk<'a> {
    call_stack: &'a CallStack,
    model: &'a dyn HostModel,
    token: &'a CancellationToken,
    keep_segments: bool,
    completed: bool,
    segments: Vec<CalledFunction>,
}

impl Walk<'_> {
    fn cancelled(&mut self) -> bool {
        if self.token.is_cancelled() {
            self.completed = false;
        }
        !self.completed
    }

    /// Next call at `depth`, `None` when exhausted or when the source failed
    fn next(
        &self,
        time: i64,
        depth: u32,
        parent: Option<&CalledFunction>,
    ) -> Result<Option<CalledFunction>, CallGraphError> {
        match self.call_stack.next_function(time, depth, parent, self.model) {
            Ok(next) => Ok(next),
            Err(QueryError::SourceUnavailable(err)) => {
                warn!(
                    "Dropping branch at depth {} from time {}: {}",
                    depth, time, err
                );
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Aggregate the callees of `function` into `aggregate`
    fn walk_children(
        &mut self,
        function: &mut CalledFunction,
        aggregate: &mut AggregatedCallSite,
        depth: u32,
    ) -> Result<(), CallGraphError> {
        if depth > self.call_stack.max_depth() {
            return Ok(());
        }

        let mut time = function.start();
        while !self.cancelled() {
            let Some(mut child) = self.next(time, depth, Some(&*function))? else {
                break;
            };
            let mut child_aggregate = AggregatedCallSite::from_function(&child);
            self.walk_children(&mut child, &mut child_aggregate, depth + 1)?;

            function.add_child(&child)?;
            aggregate.add_called_child(&child, child_aggregate)?;

            time = child.end().max(child.start() + 1);
            if self.keep_segments {
                self.segments.push(child);
            }
        }
        Ok(())
    }
}

/// Symbol of an element's root; unnamed elements are named after their index
fn root_symbol(id: usize, element: &CallStackElement) -> Symbol {
    if element.name().is_empty() {
        Symbol::from(format!("element-{}", id))
    } else {
        Symbol::from(element.name())
    }
}

/// Builds call graphs from leaf elements
///
/// **Public** - main entry point of the instrumented modality
pub struct CallGraphBuilder<'a> {
    registry: &'a ModelRegistry,
    config: CallGraphConfig,
    token: CancellationToken,
}

impl<'a> CallGraphBuilder<'a> {
    /// Create a builder resolving CPU times through `registry`
    pub fn new(registry: &'a ModelRegistry) -> Self {
        Self {
            registry,
            config: CallGraphConfig::default(),
            token: CancellationToken::new(),
        }
    }

    pub fn with_config(mut self, config: CallGraphConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `token` to cancel the build from another thread
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn config(&self) -> &CallGraphConfig {
        &self.config
    }

    /// Build one group per leaf element
    ///
    /// **Public** - main entry point for call graph construction
    ///
    /// # Arguments
    /// * `elements` - Leaf elements, each owning one call stack
    ///
    /// # Returns
    /// The groups in input order; `is_completed()` is false if the run was
    /// cancelled
    ///
    /// # Errors
    /// * `CallGraphError::Function` - malformed interval or negative self time
    /// * `CallGraphError::Query` - invalid depth
    /// * `CallGraphError::Aggregation` - merge conflict
    pub fn build(&self, elements: &[CallStackElement]) -> Result<CallGraph, CallGraphError> {
        info!(
            "Building call graph for {} elements (parallel: {})",
            elements.len(),
            self.config.parallel
        );

        let results = self.build_elements(elements)?;
        let mut graph = CallGraph {
            groups: Vec::with_capacity(results.len()),
            completed: true,
            root_functions: Vec::new(),
            segments: Vec::new(),
        };
        for result in results {
            graph.completed &= result.completed;
            graph.groups.push(result.group);
            graph.root_functions.extend(result.root_functions);
            graph.segments.extend(result.segments);
        }

        if graph.completed {
            info!("Call graph built: {} groups", graph.groups.len());
        } else {
            warn!("Call graph build cancelled, returning partial result");
        }
        Ok(graph)
    }

    /// Build a single group aggregating every leaf element
    ///
    /// **Public** - "all elements" aggregation
    ///
    /// Element subtrees are merged into one shared root as soon as they are
    /// built; the root is locked for each merge.
    ///
    /// # Errors
    /// Same as [`Self::build`]
    pub fn build_merged(&self, elements: &[CallStackElement]) -> Result<CallGraph, CallGraphError> {
        info!(
            "Building merged call graph for {} elements (parallel: {})",
            elements.len(),
            self.config.parallel
        );

        let host_id = elements
            .first()
            .map_or("", |element| element.call_stack().host_id());
        let shared = Mutex::new(empty_group(0, ALL_GROUP_NAME).with_host_id(host_id));
        let merge = |result: ElementGraph| -> Result<ElementGraph, CallGraphError> {
            shared
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .merge_group(&result.group)?;
            Ok(result)
        };

        let results: Vec<ElementGraph> = if self.config.parallel {
            thread::scope(|scope| {
                let handles: Vec<_> = elements
                    .iter()
                    .enumerate()
                    .map(|(id, element)| {
                        let merge = &merge;
                        scope.spawn(move || merge(self.build_element(id, element)?))
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| {
                        handle
                            .join()
                            .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                    })
                    .collect::<Result<Vec<_>, _>>()
            })?
        } else {
            elements
                .iter()
                .enumerate()
                .map(|(id, element)| merge(self.build_element(id, element)?))
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut graph = CallGraph {
            groups: vec![shared.into_inner().unwrap_or_else(PoisonError::into_inner)],
            completed: true,
            root_functions: Vec::new(),
            segments: Vec::new(),
        };
        for result in results {
            graph.completed &= result.completed;
            graph.root_functions.extend(result.root_functions);
            graph.segments.extend(result.segments);
        }
        Ok(graph)
    }

    fn build_elements(
        &self,
        elements: &[CallStackElement],
    ) -> Result<Vec<ElementGraph>, CallGraphError> {
        if !self.config.parallel {
            return elements
                .iter()
                .enumerate()
                .map(|(id, element)| self.build_element(id, element))
                .collect();
        }

        thread::scope(|scope| {
            let handles: Vec<_> = elements
                .iter()
                .enumerate()
                .map(|(id, element)| scope.spawn(move || self.build_element(id, element)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        })
    }

    /// Walk one leaf element into its group
    fn build_element(
        &self,
        id: usize,
        element: &CallStackElement,
    ) -> Result<ElementGraph, CallGraphError> {
        let call_stack = element.call_stack();
        let model = self.registry.model_for(call_stack.host_id());
        let start = call_stack.start_time();
        let end = call_stack.end_time();
        debug!(
            "Walking element '{}' over [{}, {}) with {} depths",
            element.name(),
            start,
            end,
            call_stack.max_depth()
        );

        let root = CalledFunction::new(
            start,
            end,
            0,
            root_symbol(id, element),
            call_stack.symbol_key_at(start),
            call_stack.thread_id_at(start),
            None,
            model.as_ref(),
        )?;
        let mut group = GroupNode::from_root_function(id, element.name(), &root)
            .with_parent(element.parent().map(str::to_string))
            .with_host_id(call_stack.host_id());

        let mut walk = Walk {
            call_stack,
            model: model.as_ref(),
            token: &self.token,
            keep_segments: self.config.keep_segments,
            completed: true,
            segments: Vec::new(),
        };
        let mut root_functions = Vec::new();

        if call_stack.max_depth() > 0 {
            let mut time = start;
            while !walk.cancelled() {
                let Some(mut function) = walk.next(time, 1, None)? else {
                    break;
                };
                let mut aggregate = AggregatedCallSite::from_function(&function);
                walk.walk_children(&mut function, &mut aggregate, 2)?;
                group.add_called_child(&function, aggregate)?;

                time = function.end().max(function.start() + 1);
                if walk.keep_segments {
                    root_functions.push(function.clone());
                    walk.segments.push(function);
                }
            }
        }

        debug!(
            "Element '{}' done: {} top-level symbols, depth {}",
            element.name(),
            group.children().count(),
            group.max_depth()
        );
        Ok(ElementGraph {
            group,
            completed: walk.completed,
            root_functions,
            segments: walk.segments,
        })
    }
}
