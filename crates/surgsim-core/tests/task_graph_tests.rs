use surgsim_core::error::ConfigError;
use surgsim_core::task_graph::TaskGraph;

#[test]
fn test_topological_order_respects_edges() {
    let mut graph: TaskGraph<u32> = TaskGraph::new("source", "sink");
    let a = graph.add_node("a", 1);
    let b = graph.add_node("b", 2);
    let c = graph.add_node("c", 3);
    let d = graph.add_node("d", 4);

    // Diamond: a -> {b, c} -> d.
    graph.add_edge(graph.source(), a);
    graph.add_edge(a, b);
    graph.add_edge(a, c);
    graph.add_edge(b, d);
    graph.add_edge(c, d);
    graph.add_edge(d, graph.sink());

    let order = graph.topological_order().unwrap();
    let position = |id| order.iter().position(|&n| n == id).unwrap();

    assert!(position(graph.source()) < position(a));
    assert!(position(a) < position(b));
    assert!(position(a) < position(c));
    assert!(position(b) < position(d));
    assert!(position(c) < position(d));
    assert!(position(d) < position(graph.sink()));
    assert_eq!(order.len(), graph.num_nodes());
}

#[test]
fn test_execute_skips_anchors_and_follows_order() {
    let mut graph: TaskGraph<&'static str> = TaskGraph::new("source", "sink");
    let first = graph.add_node("first", "first");
    let second = graph.add_node("second", "second");
    graph.add_edge(graph.source(), first);
    graph.add_edge(first, second);
    graph.add_edge(second, graph.sink());

    let mut seen = Vec::new();
    graph.execute(|name, payload| seen.push((name.to_owned(), *payload))).unwrap();

    assert_eq!(
        seen,
        vec![
            ("first".to_owned(), "first"),
            ("second".to_owned(), "second")
        ]
    );
}

#[test]
fn test_cycle_is_detected() {
    let mut graph: TaskGraph<u32> = TaskGraph::new("source", "sink");
    let a = graph.add_node("a", 1);
    let b = graph.add_node("b", 2);
    graph.add_edge(graph.source(), a);
    graph.add_edge(a, b);
    graph.add_edge(b, a);
    graph.add_edge(b, graph.sink());

    assert!(matches!(
        graph.topological_order(),
        Err(ConfigError::CycleInTaskGraph(_))
    ));
}

#[test]
fn test_nest_graph_splices_between_anchors() {
    let mut inner: TaskGraph<u32> = TaskGraph::new("inner_source", "inner_sink");
    let work = inner.add_node("inner_work", 42);
    inner.add_edge(inner.source(), work);
    inner.add_edge(work, inner.sink());

    let mut outer: TaskGraph<u32> = TaskGraph::new("outer_source", "outer_sink");
    let before = outer.add_node("before", 1);
    let after = outer.add_node("after", 2);
    outer.add_edge(outer.source(), before);
    outer.add_edge(after, outer.sink());

    let mapping = outer.nest_graph(inner, before, after);

    // before -> inner source ... inner sink -> after.
    assert!(outer.has_edge(before, mapping[0]));
    assert!(outer.has_edge(mapping[1], after));

    let mut payloads = Vec::new();
    outer.execute(|_, p| payloads.push(*p)).unwrap();
    assert_eq!(payloads, vec![1, 42, 2]);
}

#[test]
fn test_duplicate_edges_are_ignored() {
    let mut graph: TaskGraph<u32> = TaskGraph::new("source", "sink");
    let a = graph.add_node("a", 1);
    graph.add_edge(graph.source(), a);
    graph.add_edge(graph.source(), a);
    graph.add_edge(a, graph.sink());

    assert!(graph.topological_order().is_ok());
    let mut count = 0;
    graph.execute(|_, _| count += 1).unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_find_node_by_name() {
    let mut graph: TaskGraph<u32> = TaskGraph::new("source", "sink");
    let a = graph.add_node("stage_a", 1);
    assert_eq!(graph.find_node("stage_a"), Some(a));
    assert_eq!(graph.find_node("missing"), None);
}
