use callgraph_studio::aggregator::{
    build_profiling_group, calculate_distribution, calculate_hot_paths, collapsed_paths,
    AggregatedCallSite, FrameOrder, GroupNode, ProfilingGroup,
};
use callgraph_studio::callgraph::{group_nodes, merge_all, GroupBy};
use callgraph_studio::callstack::Symbol;
use callgraph_studio::utils::error::InputError;
use pretty_assertions::assert_eq;
use std::io::Cursor;

fn traces() -> Vec<Vec<i64>> {
    vec![
        vec![1, 2, 3, 4],
        vec![1, 2, 3],
        vec![1, 2, 3, 4],
        vec![1, 3, 4],
        vec![1, 2, 5],
        vec![1, 2, 5, 4],
        vec![10, 11, 12],
        vec![10, 11],
        vec![1, 2, 3, 4],
        vec![1, 2, 4, 5],
    ]
}

fn at<'a>(node: &'a AggregatedCallSite, path: &[i64]) -> &'a AggregatedCallSite {
    path.iter().fold(node, |node, &frame| {
        node.child(&Symbol::Long(frame))
            .unwrap_or_else(|| panic!("missing frame {} under {}", frame, node.symbol()))
    })
}

fn count_at(group: &ProfilingGroup, path: &[i64]) -> u64 {
    at(group.group().root(), path).count().unwrap()
}

#[test]
fn test_sampled_traces_share_prefixes() {
    let mut group = ProfilingGroup::new("samples");
    for trace in traces() {
        group.add_stack_trace(trace).unwrap();
    }

    assert_eq!(group.sample_count(), 10);
    assert_eq!(group.group().root().child_count(), 2);

    assert_eq!(count_at(&group, &[1]), 8);
    let one = at(group.group().root(), &[1]);
    assert_eq!(one.child_count(), 2);
    assert_eq!(count_at(&group, &[1, 2]), 7);
    assert_eq!(at(one, &[2]).child_count(), 3);
    assert_eq!(count_at(&group, &[1, 3]), 1);
    assert_eq!(count_at(&group, &[1, 3, 4]), 1);

    assert_eq!(count_at(&group, &[1, 2, 3]), 4);
    assert_eq!(count_at(&group, &[1, 2, 3, 4]), 3);
    assert_eq!(count_at(&group, &[1, 2, 5]), 2);
    assert_eq!(count_at(&group, &[1, 2, 5, 4]), 1);
    assert_eq!(count_at(&group, &[1, 2, 4]), 1);
    assert_eq!(count_at(&group, &[1, 2, 4, 5]), 1);

    assert_eq!(count_at(&group, &[10]), 2);
    assert_eq!(count_at(&group, &[10, 11]), 2);
    assert_eq!(count_at(&group, &[10, 11, 12]), 1);

    assert_eq!(at(group.group().root(), &[1, 2, 3, 4]).depth(), 4);
    assert_eq!(group.group().max_depth(), 4);
}

#[test]
fn test_sample_order_does_not_matter() {
    let mut forward = ProfilingGroup::new("samples");
    let mut backward = ProfilingGroup::new("samples");
    for trace in traces() {
        forward.add_stack_trace(trace).unwrap();
    }
    for trace in traces().into_iter().rev() {
        backward.add_stack_trace(trace).unwrap();
    }
    assert_eq!(forward, backward);
}

#[test]
fn test_leaf_first_traces_match_root_first() {
    let mut root_first = ProfilingGroup::new("samples");
    let mut leaf_first = ProfilingGroup::new("samples");
    for trace in traces() {
        root_first.add_stack_trace(trace.clone()).unwrap();
        let reversed: Vec<i64> = trace.into_iter().rev().collect();
        leaf_first
            .add_stack_trace_ordered(reversed, FrameOrder::LeafFirst)
            .unwrap();
    }
    assert_eq!(root_first, leaf_first);
}

#[test]
fn test_empty_trace_is_ignored() {
    let mut group = ProfilingGroup::new("samples");
    group.add_stack_trace(Vec::<i64>::new()).unwrap();
    group
        .add_weighted_stack_trace([1_i64], FrameOrder::RootFirst, 0)
        .unwrap();
    assert_eq!(group.sample_count(), 0);
    assert_eq!(group.group().root().child_count(), 0);
    assert_eq!(group, ProfilingGroup::new("samples"));
}

#[test]
fn test_weighted_trace_equals_repeated_trace() {
    let mut weighted = ProfilingGroup::new("samples");
    weighted
        .add_weighted_stack_trace([1_i64, 2, 3], FrameOrder::RootFirst, 4)
        .unwrap();

    let mut repeated = ProfilingGroup::new("samples");
    for _ in 0..4 {
        repeated.add_stack_trace([1_i64, 2, 3]).unwrap();
    }
    assert_eq!(weighted, repeated);
    assert_eq!(weighted.sample_count(), 4);
}

#[test]
fn test_frame_symbols_keep_their_type() {
    let mut group = ProfilingGroup::new("samples");
    group.add_stack_trace([Symbol::Int(1)]).unwrap();
    group.add_stack_trace([Symbol::Long(1)]).unwrap();
    group.add_stack_trace([Symbol::from("1")]).unwrap();
    assert_eq!(group.group().root().child_count(), 3);
}

#[test]
fn test_hot_paths_use_exclusive_samples() {
    let mut group = ProfilingGroup::new("samples");
    for trace in traces() {
        group.add_stack_trace(trace).unwrap();
    }

    let hot_paths = calculate_hot_paths(group.group(), 3);
    assert_eq!(hot_paths.len(), 3);
    assert_eq!(hot_paths[0].stack, "1;2;3;4");
    assert_eq!(hot_paths[0].weight, 3);
    assert_eq!(hot_paths[0].percentage, 30.0);
    assert_eq!(hot_paths[0].calls, 3);

    let paths = collapsed_paths(group.group());
    let exclusive: i64 = paths.iter().map(|(_, weight, _)| weight).sum();
    assert_eq!(exclusive, 10);

    let distribution = calculate_distribution(group.group());
    assert_eq!(distribution.total_weight, 10);
    assert_eq!(distribution.max_depth, 4);
}

#[test]
fn test_build_from_folded_text() {
    let folded = "\
# sampled by perf
main;parse;lex 3
main;parse 2

main;0x400 1
main;parse;lex
";
    let group = build_profiling_group("perf", Cursor::new(folded), FrameOrder::RootFirst).unwrap();
    assert_eq!(group.sample_count(), 7);
    assert_eq!(group.group().name(), "perf");

    let main = group.group().child(&Symbol::from("main")).unwrap();
    assert_eq!(main.count(), Some(7));
    let parse = main.child(&Symbol::from("parse")).unwrap();
    assert_eq!(parse.count(), Some(6));
    assert_eq!(parse.child(&Symbol::from("lex")).unwrap().count(), Some(4));
    assert_eq!(main.child(&Symbol::Long(0x400)).unwrap().count(), Some(1));
}

#[test]
fn test_build_from_leaf_first_folded_text() {
    let folded = "lex;parse;main 2\nparse;main 1\n";
    let group = build_profiling_group("perf", Cursor::new(folded), FrameOrder::LeafFirst).unwrap();
    let main = group.group().child(&Symbol::from("main")).unwrap();
    assert_eq!(main.count(), Some(3));
    assert_eq!(main.child(&Symbol::from("parse")).unwrap().count(), Some(3));
}

#[test]
fn test_build_reports_bad_line() {
    let folded = "main;work 1\nmain;work many\n";
    let result = build_profiling_group("perf", Cursor::new(folded), FrameOrder::RootFirst);
    assert!(matches!(result, Err(InputError::InvalidLine { line: 2, .. })));
}

fn sampled_thread(id: usize, name: &str, parent: &str, trace: [i64; 2]) -> GroupNode {
    let mut group = ProfilingGroup::with_id(id, name);
    group.add_stack_trace(trace).unwrap();
    group.into_group().with_parent(Some(parent.to_string()))
}

#[test]
fn test_sampled_groups_regroup() {
    let groups = vec![
        sampled_thread(0, "t1", "p1", [1, 2]),
        sampled_thread(1, "t2", "p1", [1, 3]),
        sampled_thread(2, "t3", "p2", [7, 8]),
    ];

    let by_parent = group_nodes(&groups, GroupBy::Parent).unwrap();
    let names: Vec<&str> = by_parent.iter().map(|g| g.name()).collect();
    assert_eq!(names, vec!["p1", "p2"]);
    assert_eq!(by_parent[0].root().count(), Some(2));
    let one = by_parent[0].child(&Symbol::Long(1)).unwrap();
    assert_eq!(one.count(), Some(2));
    assert_eq!(one.child_count(), 2);
    assert_eq!(one.child(&Symbol::Long(3)).unwrap().count(), Some(1));

    let all = merge_all(&groups).unwrap().unwrap();
    assert_eq!(all.name(), "all");
    assert_eq!(all.root().count(), Some(3));
    assert_eq!(all.root().child_count(), 2);
    assert_eq!(all.child(&Symbol::Long(7)).unwrap().count(), Some(1));

    let by_leaf = group_nodes(&groups, GroupBy::Leaf).unwrap();
    assert_eq!(by_leaf, groups);
}
