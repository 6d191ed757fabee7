//! Call-tree aggregation over derived threads.

mod common;

use pretty_assertions::assert_eq;

use common::ThreadBuilder;
use stacklens::calltree::{collapsed_lines, compute_call_tree};

#[test]
fn totals_and_self_weights_aggregate_per_call_node() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A", "B", "C"], 0.0);
    b.sample(&["A", "B"], 1.0);
    b.sample(&["A", "D"], 2.0);
    let thread = b.build();

    let tree = compute_call_tree(&thread, 0);
    let info = &tree.call_node_info;

    let node_a = info.call_node_index_from_path(&[0]).unwrap();
    let node_b = info.call_node_index_from_path(&[0, 1]).unwrap();
    let node_c = info.call_node_index_from_path(&[0, 1, 2]).unwrap();

    assert_eq!(tree.total[node_a], 3.0);
    assert_eq!(tree.self_weight[node_a], 0.0);
    assert_eq!(tree.total[node_b], 2.0);
    assert_eq!(tree.self_weight[node_b], 1.0);
    assert_eq!(tree.total[node_c], 1.0);
    assert_eq!(tree.self_weight[node_c], 1.0);
}

#[test]
fn rows_walk_depth_first_heaviest_first() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A", "Light"], 0.0);
    b.sample(&["A", "Heavy"], 1.0);
    b.sample(&["A", "Heavy"], 2.0);
    let thread = b.build();

    let tree = compute_call_tree(&thread, 0);
    let names: Vec<&str> = tree
        .rows()
        .into_iter()
        .map(|node| thread.func_name(tree.call_node_info.call_node_table.func[node]))
        .collect();
    assert_eq!(names, vec!["A", "Heavy", "Light"]);
}

#[test]
fn rows_skip_unreferenced_stacks() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A", "B"], 0.0);
    // An interned stack no sample references.
    b.stack(&["Z", "Q"]);
    let thread = b.build();

    let tree = compute_call_tree(&thread, 0);
    let names: Vec<&str> = tree
        .rows()
        .into_iter()
        .map(|node| thread.func_name(tree.call_node_info.call_node_table.func[node]))
        .collect();
    assert_eq!(names, vec!["A", "B"]);
}

#[test]
fn collapsed_lines_sum_self_weight_per_path() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A", "B"], 0.0);
    b.sample(&["A", "B"], 1.0);
    b.sample(&["A"], 2.0);
    let thread = b.build();

    let mut lines = collapsed_lines(&thread, 0);
    lines.sort();
    assert_eq!(lines, vec!["A 1".to_string(), "A;B 2".to_string()]);
}
