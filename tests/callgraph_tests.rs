use callgraph_studio::aggregator::{AggregatedCallSite, GroupNode};
use callgraph_studio::callgraph::{
    group_nodes, CallGraph, CallGraphBuilder, CallGraphConfig, CancellationToken, GroupBy,
};
use callgraph_studio::callstack::{
    CallStack, CallStackElement, DepthHandle, IntervalSource, MemoryIntervalSource, StateInterval,
    StateValue, Symbol,
};
use callgraph_studio::model::{CompositeHostModel, ModelRegistry};
use callgraph_studio::utils::error::{CallGraphError, FunctionError, QueryError, SourceError};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type Spans<'a> = &'a [(i64, i64, &'a str)];

fn memory_source(start: i64, end: i64, depths: &[Spans]) -> (MemoryIntervalSource, Vec<DepthHandle>) {
    let mut source = MemoryIntervalSource::new(start, end);
    let handles = source.add_attributes(depths.len());
    for (handle, spans) in handles.iter().zip(depths) {
        for &(s, e, symbol) in spans.iter() {
            source
                .push_interval(*handle, s, e, StateValue::Str(symbol.to_string()))
                .unwrap();
        }
    }
    (source, handles)
}

fn element(name: &str, start: i64, end: i64, depths: &[Spans]) -> CallStackElement {
    let (source, handles) = memory_source(start, end, depths);
    CallStackElement::new(name, CallStack::new(Arc::new(source), handles))
}

fn build(elements: &[CallStackElement]) -> CallGraph {
    let registry = ModelRegistry::new();
    CallGraphBuilder::new(&registry).build(elements).unwrap()
}

fn sym(symbol: &str) -> Symbol {
    Symbol::from(symbol)
}

fn node<'a>(group: &'a GroupNode, path: &[&str]) -> &'a AggregatedCallSite {
    let mut current = group.child(&sym(path[0])).unwrap();
    for symbol in &path[1..] {
        current = current.child(&sym(symbol)).unwrap();
    }
    current
}

/// Check duration, self time and call count of a node
fn assert_node(node: &AggregatedCallSite, duration: i64, self_time: i64, calls: u64) {
    assert_eq!(node.duration(), Some(duration), "duration of {}", node.symbol());
    assert_eq!(node.self_time(), Some(self_time), "self time of {}", node.symbol());
    assert_eq!(node.nb_calls(), calls, "calls of {}", node.symbol());
}

/// Every invariant of a duration tree, checked recursively
fn assert_invariants(node: &AggregatedCallSite) {
    let children: i64 = node.children().filter_map(AggregatedCallSite::duration).sum();
    let duration = node.duration().unwrap();
    let self_time = node.self_time().unwrap();
    assert!(self_time >= 0, "negative self time on {}", node.symbol());
    assert_eq!(self_time, duration - children, "self time of {}", node.symbol());
    for child in node.children() {
        assert_eq!(child.depth(), node.depth() + 1);
        assert_invariants(child);
    }
}

#[test]
fn test_nested_single_path() {
    let graph = build(&[element(
        "thread",
        1,
        1001,
        &[&[(2, 1000, "a")], &[(3, 999, "b")], &[(4, 998, "c")]],
    )]);

    let group = &graph.groups()[0];
    assert_node(node(group, &["a"]), 998, 2, 1);
    assert_node(node(group, &["a", "b"]), 996, 2, 1);
    assert_node(node(group, &["a", "b", "c"]), 994, 994, 1);

    assert_eq!(group.root().duration(), Some(1000));
    assert_eq!(group.root().self_time(), Some(2));
    assert_eq!(group.max_depth(), 3);
    assert_eq!(node(group, &["a"]).max_depth(), 2);
    assert!(graph.is_completed());
    assert_invariants(group.root());
}

#[test]
fn test_repeated_call_merge() {
    let graph = build(&[element(
        "thread",
        0,
        100,
        &[
            &[(0, 100, "main")],
            &[(0, 50, "1"), (60, 90, "1")],
            &[(0, 30, "2")],
        ],
    )]);

    let group = &graph.groups()[0];
    assert_node(node(group, &["main"]), 100, 20, 1);

    let one = node(group, &["main", "1"]);
    assert_node(one, 80, 50, 2);
    let durations = one.statistics().unwrap().durations();
    assert_eq!(durations.min(), Some(30));
    assert_eq!(durations.max(), Some(50));
    assert_eq!(durations.mean(), 40.0);
    let self_times = one.statistics().unwrap().self_times();
    assert_eq!(self_times.min(), Some(20));
    assert_eq!(self_times.max(), Some(30));
    assert_eq!(self_times.mean(), 25.0);

    assert_node(node(group, &["main", "1", "2"]), 30, 30, 1);
    assert_invariants(group.root());
}

#[test]
fn test_single_occurrence_std_dev_is_nan() {
    let graph = build(&[element(
        "thread",
        0,
        100,
        &[&[(0, 100, "main")], &[(0, 30, "leaf")]],
    )]);

    let leaf = node(&graph.groups()[0], &["main", "leaf"]);
    let statistics = leaf.statistics().unwrap();
    assert!(statistics.durations().std_dev().is_nan());
    assert!(statistics.self_times().std_dev().is_nan());
    assert_eq!(statistics.durations().count(), 1);
}

#[test]
fn test_merge_first_level_callees() {
    let graph = build(&[element(
        "thread",
        0,
        100,
        &[
            &[(0, 100, "main")],
            &[(0, 50, "1"), (60, 90, "1")],
            &[(0, 30, "2"), (60, 80, "3")],
        ],
    )]);

    let group = &graph.groups()[0];
    assert_node(node(group, &["main"]), 100, 20, 1);
    assert_node(node(group, &["main", "1"]), 80, 30, 2);
    assert_node(node(group, &["main", "1", "2"]), 30, 30, 1);
    assert_node(node(group, &["main", "1", "3"]), 20, 20, 1);
    assert_invariants(group.root());
}

#[test]
fn test_merge_second_level_callees() {
    let graph = build(&[element(
        "thread",
        0,
        100,
        &[
            &[(0, 100, "main")],
            &[(0, 50, "1"), (60, 100, "1")],
            &[(0, 10, "2"), (20, 30, "3"), (60, 90, "2")],
            &[(0, 10, "4"), (60, 80, "4")],
        ],
    )]);

    let group = &graph.groups()[0];
    assert_node(node(group, &["main"]), 100, 10, 1);
    assert_node(node(group, &["main", "1"]), 90, 40, 2);
    assert_node(node(group, &["main", "1", "2"]), 40, 10, 2);
    assert_node(node(group, &["main", "1", "3"]), 10, 10, 1);
    assert_node(node(group, &["main", "1", "2", "4"]), 30, 30, 2);
    assert_eq!(group.max_depth(), 4);
    assert_invariants(group.root());
}

#[test]
fn test_multiple_roots_merge() {
    let graph = build(&[element(
        "thread",
        0,
        50,
        &[&[(0, 20, "1"), (30, 50, "1")], &[(0, 10, "2"), (30, 40, "3")]],
    )]);

    let group = &graph.groups()[0];
    assert_node(node(group, &["1"]), 40, 20, 2);
    assert_node(node(group, &["1", "2"]), 10, 10, 1);
    assert_node(node(group, &["1", "3"]), 10, 10, 1);
    assert_eq!(group.root().self_time(), Some(10));
    assert_eq!(group.children().count(), 1);
}

#[test]
fn test_deep_chain() {
    const DEPTH: i64 = 200;
    let levels: Vec<Vec<(i64, i64, String)>> = (0..DEPTH)
        .map(|d| vec![(d, 2 * DEPTH - d, format!("f{}", d))])
        .collect();

    let mut source = MemoryIntervalSource::new(0, 2 * DEPTH);
    let handles = source.add_attributes(levels.len());
    for (handle, spans) in handles.iter().zip(&levels) {
        for (s, e, symbol) in spans {
            source
                .push_interval(*handle, *s, *e, StateValue::Str(symbol.clone()))
                .unwrap();
        }
    }
    let graph = build(&[CallStackElement::new(
        "deep",
        CallStack::new(Arc::new(source), handles),
    )]);

    let group = &graph.groups()[0];
    assert_eq!(group.max_depth(), DEPTH as usize);
    let mut current = group.child(&sym("f0")).unwrap();
    for d in 1..DEPTH {
        current = current.child(&sym(&format!("f{}", d))).unwrap();
        assert_eq!(current.depth(), d as u32 + 1);
    }
    assert_eq!(current.self_time(), Some(2));
    assert_invariants(group.root());
}

#[test]
fn test_empty_element() {
    let graph = build(&[element("idle", 0, 100, &[&[], &[]])]);
    let group = &graph.groups()[0];
    assert_eq!(group.children().count(), 0);
    assert_eq!(group.root().self_time(), Some(100));
    assert!(graph.is_completed());
}

#[test]
fn test_gaps_between_intervals_are_skipped() {
    let graph = build(&[element(
        "thread",
        0,
        100,
        &[&[(5, 10, "a"), (40, 41, "b"), (90, 100, "a")]],
    )]);
    let group = &graph.groups()[0];
    assert_node(node(group, &["a"]), 15, 15, 2);
    assert_node(node(group, &["b"]), 1, 1, 1);
    assert_eq!(group.root().self_time(), Some(84));
}

#[test]
fn test_group_identity_and_parent() {
    let registry = ModelRegistry::new();
    let (source, handles) = memory_source(0, 10, &[&[(0, 10, "main")]]);
    let call_stack = CallStack::new(Arc::new(source), handles).with_host_id("node-7");
    let elements = vec![CallStackElement::new("tid-12", call_stack).with_parent("pid-3")];

    let graph = CallGraphBuilder::new(&registry).build(&elements).unwrap();
    let group = graph.group("tid-12").unwrap();
    assert_eq!(group.parent(), Some("pid-3"));
    assert_eq!(group.host_id(), "node-7");
    assert_eq!(group.root().symbol(), &sym("tid-12"));
    assert_eq!(registry.hosts(), vec!["node-7".to_string()]);
}

#[test]
fn test_unnamed_element_does_not_abort_run() {
    let elements = vec![
        element("tid-1", 0, 10, &[&[(0, 10, "main")]]),
        element("", 0, 20, &[&[(0, 20, "main")]]),
    ];
    let graph = build(&elements);

    assert!(graph.is_completed());
    assert_eq!(graph.groups().len(), 2);
    let unnamed = &graph.groups()[1];
    assert_eq!(unnamed.name(), "");
    assert_eq!(unnamed.root().symbol(), &sym("element-1"));
    assert_node(node(unnamed, &["main"]), 20, 20, 1);
}

#[test]
fn test_keep_segments() {
    let registry = ModelRegistry::new();
    let elements = vec![element(
        "thread",
        0,
        100,
        &[&[(0, 100, "main")], &[(0, 50, "1"), (60, 90, "1")]],
    )];

    let graph = CallGraphBuilder::new(&registry)
        .with_config(CallGraphConfig::new().with_keep_segments(true))
        .build(&elements)
        .unwrap();

    assert_eq!(graph.root_functions().len(), 1);
    assert_eq!(graph.root_functions()[0].self_time(), 20);
    assert_eq!(graph.segments().len(), 3);

    let plain = build(&elements);
    assert!(plain.segments().is_empty());
    assert!(plain.root_functions().is_empty());
}

#[test]
fn test_negative_self_time_is_an_error() {
    let registry = ModelRegistry::new();
    let elements = vec![element(
        "thread",
        0,
        20,
        &[&[(0, 10, "parent")], &[(0, 20, "child")]],
    )];

    let result = CallGraphBuilder::new(&registry).build(&elements);
    assert!(matches!(
        result,
        Err(CallGraphError::Function(FunctionError::NegativeSelfTime { .. }))
    ));
}

#[test]
fn test_invalid_depth() {
    let (source, handles) = memory_source(0, 10, &[&[(0, 10, "main")]]);
    let call_stack = CallStack::new(Arc::new(source), handles);
    let model = CompositeHostModel::new();

    assert_eq!(
        call_stack.next_function(0, 0, None, &model),
        Err(QueryError::InvalidDepth {
            depth: 0,
            max_depth: 1
        })
    );
    assert!(matches!(
        call_stack.call_list_at_depth(2, 0, 10, 1, &model),
        Err(QueryError::InvalidDepth { depth: 2, .. })
    ));
}

#[test]
fn test_call_list_at_depth() {
    let (source, handles) = memory_source(
        0,
        100,
        &[&[(0, 100, "main")], &[(0, 50, "1"), (60, 90, "1")]],
    );
    let call_stack = CallStack::new(Arc::new(source), handles)
        .with_symbol_key(Arc::new(|_: i64| 7))
        .with_thread_id(Arc::new(|_: i64| 8));
    let model = CompositeHostModel::new();

    let calls = call_stack.call_list_at_depth(2, 40, 70, 1, &model).unwrap();
    let spans: Vec<(i64, i64)> = calls.iter().map(|c| (c.start(), c.end())).collect();
    assert_eq!(spans, vec![(0, 50), (60, 90)]);
    assert_eq!(calls[0].process_id(), 7);
    assert_eq!(calls[0].thread_id(), 8);

    // Coarser resolutions are a hint only
    let coarse = call_stack.call_list_at_depth(2, 40, 70, 10, &model).unwrap();
    assert_eq!(coarse, calls);

    assert!(call_stack
        .call_list_at_depth(2, 95, 200, 1, &model)
        .unwrap()
        .is_empty());
    assert!(call_stack
        .call_list_at_depth(2, 300, 200, 1, &model)
        .unwrap()
        .is_empty());
}

#[test]
fn test_next_function_respects_parent_bound() {
    let (source, handles) = memory_source(
        0,
        100,
        &[&[(0, 40, "a"), (50, 100, "b")], &[(10, 20, "x"), (60, 70, "y")]],
    );
    let call_stack = CallStack::new(Arc::new(source), handles);
    let model = CompositeHostModel::new();

    let a = call_stack.next_function(0, 1, None, &model).unwrap().unwrap();
    assert_eq!(a.symbol(), &sym("a"));
    let x = call_stack.next_function(0, 2, Some(&a), &model).unwrap().unwrap();
    assert_eq!(x.symbol(), &sym("x"));
    assert_eq!(x.parent().map(|p| p.symbol.clone()), Some(sym("a")));
    assert_eq!(call_stack.next_function(20, 2, Some(&a), &model).unwrap(), None);

    let b = call_stack.next_function(40, 1, None, &model).unwrap().unwrap();
    assert_eq!((b.start(), b.end()), (50, 100));
}

/// Interval source whose queries fail on one depth
struct FailingDepth {
    inner: MemoryIntervalSource,
    failing: DepthHandle,
}

impl IntervalSource for FailingDepth {
    fn start_time(&self) -> i64 {
        self.inner.start_time()
    }

    fn end_time(&self) -> i64 {
        self.inner.end_time()
    }

    fn query(
        &self,
        handle: DepthHandle,
        start: i64,
        end: i64,
    ) -> Result<Vec<StateInterval>, SourceError> {
        if handle == self.failing {
            return Err(SourceError::Disposed);
        }
        self.inner.query(handle, start, end)
    }
}

#[test]
fn test_source_unavailable_drops_branch() {
    let (inner, handles) = memory_source(
        0,
        100,
        &[&[(0, 100, "main")], &[(0, 50, "1")], &[(0, 30, "2")]],
    );
    let source = FailingDepth {
        inner,
        failing: handles[1],
    };
    let graph = build(&[CallStackElement::new(
        "thread",
        CallStack::new(Arc::new(source), handles),
    )]);

    let group = &graph.groups()[0];
    assert!(graph.is_completed());
    let main = node(group, &["main"]);
    assert_node(main, 100, 100, 1);
    assert_eq!(main.child_count(), 0);
}

#[test]
fn test_disposed_source_yields_empty_group() {
    let (source, handles) = memory_source(0, 100, &[&[(0, 100, "main")]]);
    let source = Arc::new(source);
    source.dispose();

    let graph = build(&[CallStackElement::new(
        "thread",
        CallStack::new(source, handles),
    )]);
    assert!(graph.is_completed());
    assert_eq!(graph.groups()[0].children().count(), 0);
}

/// Interval source that cancels a token on its n-th query
struct CancellingSource {
    inner: MemoryIntervalSource,
    token: CancellationToken,
    cancel_on: usize,
    queries: AtomicUsize,
}

impl IntervalSource for CancellingSource {
    fn start_time(&self) -> i64 {
        self.inner.start_time()
    }

    fn end_time(&self) -> i64 {
        self.inner.end_time()
    }

    fn query(
        &self,
        handle: DepthHandle,
        start: i64,
        end: i64,
    ) -> Result<Vec<StateInterval>, SourceError> {
        if self.queries.fetch_add(1, Ordering::SeqCst) + 1 == self.cancel_on {
            self.token.cancel();
        }
        self.inner.query(handle, start, end)
    }
}

#[test]
fn test_cancellation_returns_partial_result() {
    let token = CancellationToken::new();
    let (inner, handles) = memory_source(
        0,
        40,
        &[&[(0, 10, "a"), (10, 20, "a"), (20, 30, "a"), (30, 40, "a")]],
    );
    let source = CancellingSource {
        inner,
        token: token.clone(),
        cancel_on: 2,
        queries: AtomicUsize::new(0),
    };
    let elements = vec![CallStackElement::new(
        "thread",
        CallStack::new(Arc::new(source), handles),
    )];

    let registry = ModelRegistry::new();
    let graph = CallGraphBuilder::new(&registry)
        .with_cancellation(token)
        .build(&elements)
        .unwrap();

    assert!(!graph.is_completed());
    assert_node(node(&graph.groups()[0], &["a"]), 20, 20, 2);
}

#[test]
fn test_cancelled_before_start() {
    let token = CancellationToken::new();
    token.cancel();
    let registry = ModelRegistry::new();
    let elements = vec![element("thread", 0, 10, &[&[(0, 10, "main")]])];

    let graph = CallGraphBuilder::new(&registry)
        .with_cancellation(token)
        .build(&elements)
        .unwrap();
    assert!(!graph.is_completed());
    assert_eq!(graph.groups().len(), 1);
    assert_eq!(graph.groups()[0].children().count(), 0);
}

fn threads() -> Vec<CallStackElement> {
    vec![
        element(
            "t1",
            0,
            100,
            &[&[(0, 100, "main")], &[(0, 50, "1"), (60, 90, "1")], &[(0, 30, "2")]],
        )
        .with_parent("p1"),
        element(
            "t2",
            0,
            80,
            &[&[(0, 80, "main")], &[(10, 20, "1"), (30, 70, "3")]],
        )
        .with_parent("p1"),
        element("t3", 0, 60, &[&[(0, 40, "worker")], &[(0, 40, "1")]]).with_parent("p2"),
    ]
}

type Projection = BTreeMap<String, (i64, i64, u64, Option<i64>, Option<i64>, i64)>;

/// Path-keyed projection of the exact metrics of a tree
fn project(node: &AggregatedCallSite, prefix: &str, out: &mut Projection) {
    let path = format!("{}/{}", prefix, node.symbol());
    let durations = node.statistics().unwrap().durations();
    out.insert(
        path.clone(),
        (
            node.duration().unwrap(),
            node.self_time().unwrap(),
            node.nb_calls(),
            durations.min(),
            durations.max(),
            durations.total(),
        ),
    );
    for child in node.children() {
        project(child, &path, out);
    }
}

fn projection(group: &GroupNode) -> Projection {
    let mut out = Projection::new();
    for child in group.children() {
        project(child, "", &mut out);
    }
    out
}

#[test]
fn test_parallel_build_matches_sequential() {
    let registry = ModelRegistry::new();
    let elements = threads();

    let sequential = CallGraphBuilder::new(&registry).build(&elements).unwrap();
    let parallel = CallGraphBuilder::new(&registry)
        .with_config(CallGraphConfig::new().with_parallel(true))
        .build(&elements)
        .unwrap();

    assert_eq!(sequential, parallel);
    let names: Vec<&str> = parallel.groups().iter().map(GroupNode::name).collect();
    assert_eq!(names, vec!["t1", "t2", "t3"]);
}

#[test]
fn test_merged_build_matches_grouping() {
    let registry = ModelRegistry::new();
    let elements = threads();

    let graph = CallGraphBuilder::new(&registry).build(&elements).unwrap();
    let grouped = group_nodes(graph.groups(), GroupBy::All).unwrap();
    assert_eq!(grouped.len(), 1);

    let merged = CallGraphBuilder::new(&registry)
        .build_merged(&elements)
        .unwrap();
    assert_eq!(merged.groups(), grouped.as_slice());

    let merged_parallel = CallGraphBuilder::new(&registry)
        .with_config(CallGraphConfig::new().with_parallel(true))
        .build_merged(&elements)
        .unwrap();
    assert!(merged_parallel.is_completed());
    assert_eq!(
        projection(&merged_parallel.groups()[0]),
        projection(&grouped[0])
    );
    assert_eq!(merged_parallel.groups()[0].root().duration(), Some(240));

    let all = &grouped[0];
    assert_node(node(all, &["main"]), 180, 50, 2);
    assert_node(node(all, &["main", "1"]), 90, 60, 3);
    assert_node(node(all, &["worker", "1"]), 40, 40, 1);
}

#[test]
fn test_group_by_parent() {
    let graph = build(&threads());
    let groups = group_nodes(graph.groups(), GroupBy::Parent).unwrap();

    let names: Vec<&str> = groups.iter().map(GroupNode::name).collect();
    assert_eq!(names, vec!["p1", "p2"]);
    assert_node(node(&groups[0], &["main", "3"]), 40, 40, 1);
    assert_eq!(groups[0].root().duration(), Some(180));
    assert_eq!(groups[1].root().duration(), Some(60));
    assert_invariants(groups[0].root());

    // Input groups are untouched
    assert_eq!(graph.groups().len(), 3);
    assert_node(node(&graph.groups()[0], &["main", "1"]), 80, 50, 2);

    let leaves = group_nodes(graph.groups(), GroupBy::Leaf).unwrap();
    assert_eq!(leaves.as_slice(), graph.groups());
}
