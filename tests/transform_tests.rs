//! Semantics of each call-tree transform.

mod common;

use pretty_assertions::assert_eq;
use std::collections::HashMap;

use common::{assert_referential_integrity, sample_paths, test_categories, ThreadBuilder};
use stacklens::filters::ImplementationFilter;
use stacklens::profile::markers::MarkerSchema;
use stacklens::transforms::{apply_transform, SampleFilterType, Transform, TransformContext};

fn apply(thread: &stacklens::profile::tables::Thread, transform: Transform) -> stacklens::profile::tables::Thread {
    let categories = test_categories();
    let schemas: HashMap<String, MarkerSchema> = HashMap::new();
    let ctx = TransformContext {
        default_category: 0,
        categories: &categories,
        marker_schemas: &schemas,
    };
    let result = apply_transform(thread, &transform, &ctx).expect("transform should apply");
    assert_referential_integrity(&result);
    result
}

#[test]
fn merge_function_elides_the_function_everywhere() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A", "B", "C"], 0.0);
    b.sample(&["A", "B", "D"], 1.0);
    let func_b = b.func_index("B");
    let thread = b.build();

    let merged = apply(&thread, Transform::MergeFunction { func_index: func_b });

    assert_eq!(
        sample_paths(&merged),
        vec![Some("A;C".to_string()), Some("A;D".to_string())]
    );
}

#[test]
fn merge_call_node_splices_out_one_node() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A", "B", "C"], 0.0);
    b.sample(&["A", "B"], 1.0);
    b.sample(&["X", "B"], 2.0);
    let a = b.func_index("A");
    let func_b = b.func_index("B");
    let thread = b.build();

    let merged = apply(
        &thread,
        Transform::MergeCallNode {
            call_node_path: vec![a, func_b],
            implementation: ImplementationFilter::Combined,
        },
    );

    // Only the A->B node is spliced; X->B is a different call node.
    assert_eq!(
        sample_paths(&merged),
        vec![
            Some("A;C".to_string()),
            Some("A".to_string()),
            Some("X;B".to_string()),
        ]
    );
}

#[test]
fn merge_call_node_matches_through_filtered_out_frames() {
    let mut b = ThreadBuilder::new();
    b.func_js("A");
    b.func_js("B");
    b.sample(&["A", "glue", "B", "C"], 0.0);
    let a = b.func_index("A");
    let func_b = b.func_index("B");
    let thread = b.build();

    // "glue" is native; under the JS filter it doesn't block the match.
    let merged = apply(
        &thread,
        Transform::MergeCallNode {
            call_node_path: vec![a, func_b],
            implementation: ImplementationFilter::Js,
        },
    );

    assert_eq!(sample_paths(&merged), vec![Some("A;glue;C".to_string())]);
}

#[test]
fn drop_function_drops_whole_samples() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A", "B", "C"], 0.0);
    b.sample(&["A", "D"], 1.0);
    let func_b = b.func_index("B");
    let thread = b.build();

    let dropped = apply(&thread, Transform::DropFunction { func_index: func_b });

    assert_eq!(
        sample_paths(&dropped),
        vec![None, Some("A;D".to_string())]
    );
    // The stack table itself is untouched.
    assert_eq!(dropped.stack_table.len(), thread.stack_table.len());
}

#[test]
fn focus_subtree_reroots_at_the_path_leaf() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A", "B", "C"], 0.0);
    b.sample(&["A", "B", "D"], 1.0);
    b.sample(&["A", "B"], 2.0);
    b.sample(&["A"], 3.0);
    b.sample(&["X", "B", "C"], 4.0);
    let a = b.func_index("A");
    let func_b = b.func_index("B");
    let thread = b.build();

    let focused = apply(
        &thread,
        Transform::FocusSubtree {
            call_node_path: vec![a, func_b],
            implementation: ImplementationFilter::Combined,
            inverted: false,
        },
    );

    assert_eq!(
        sample_paths(&focused),
        vec![
            Some("B;C".to_string()),
            Some("B;D".to_string()),
            Some("B".to_string()),
            // Time spent above the focused node is dropped.
            None,
            // A different root never matches.
            None,
        ]
    );
}

#[test]
fn focus_subtree_skips_frames_outside_the_implementation() {
    let mut b = ThreadBuilder::new();
    b.func_js("A");
    b.func_js("B");
    b.sample(&["A", "glue", "B", "C"], 0.0);
    b.sample(&["A", "glue"], 1.0);
    let a = b.func_index("A");
    let func_b = b.func_index("B");
    let thread = b.build();

    let focused = apply(
        &thread,
        Transform::FocusSubtree {
            call_node_path: vec![a, func_b],
            implementation: ImplementationFilter::Js,
            inverted: false,
        },
    );

    assert_eq!(
        sample_paths(&focused),
        vec![Some("B;C".to_string()), None]
    );
}

#[test]
fn focus_inverted_subtree_truncates_at_the_match() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A", "B", "C"], 0.0);
    b.sample(&["X", "B", "C"], 1.0);
    b.sample(&["A", "C"], 2.0);
    b.sample(&["A", "B"], 3.0);
    let func_b = b.func_index("B");
    let c = b.func_index("C");
    let thread = b.build();

    // Inverted path: leaf C called by B.
    let focused = apply(
        &thread,
        Transform::FocusSubtree {
            call_node_path: vec![c, func_b],
            implementation: ImplementationFilter::Combined,
            inverted: true,
        },
    );

    assert_eq!(
        sample_paths(&focused),
        vec![
            Some("A;B".to_string()),
            Some("X;B".to_string()),
            None,
            None,
        ]
    );
}

#[test]
fn focus_function_reroots_at_first_occurrence() {
    let mut b = ThreadBuilder::new();
    b.sample(&["X", "A", "B"], 0.0);
    b.sample(&["Y", "A", "C"], 1.0);
    b.sample(&["Z", "D"], 2.0);
    let a = b.func_index("A");
    let thread = b.build();

    let focused = apply(&thread, Transform::FocusFunction { func_index: a });

    assert_eq!(
        sample_paths(&focused),
        vec![Some("A;B".to_string()), Some("A;C".to_string()), None]
    );
}

#[test]
fn focus_function_twice_is_a_no_op() {
    let mut b = ThreadBuilder::new();
    b.sample(&["X", "A", "B"], 0.0);
    b.sample(&["Y", "A", "C"], 1.0);
    let a = b.func_index("A");
    let thread = b.build();

    let once = apply(&thread, Transform::FocusFunction { func_index: a });
    let twice = apply(&once, Transform::FocusFunction { func_index: a });

    assert_eq!(sample_paths(&once), sample_paths(&twice));
    assert_eq!(once.stack_table.len(), twice.stack_table.len());
}

#[test]
fn focus_category_reparents_to_nearest_kept_ancestor() {
    let mut b = ThreadBuilder::new();
    b.sample_with_categories(&[("A", 1, 0), ("B", 0, 0), ("C", 1, 0)], 0.0);
    b.sample_with_categories(&[("A", 1, 0), ("B", 0, 0)], 1.0);
    let thread = b.build();

    let focused = apply(&thread, Transform::FocusCategory { category: 1 });

    assert_eq!(
        sample_paths(&focused),
        vec![Some("A;C".to_string()), Some("A".to_string())]
    );
}

#[test]
fn collapse_resource_shares_one_node_per_contiguous_run() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A", "B", "X"], 0.0);
    b.sample(&["A", "C", "Y"], 1.0);
    b.sample(&["A", "B", "C", "Z"], 2.0);
    let resource = b.resource("libfoo");
    b.set_resource("B", resource);
    b.set_resource("C", resource);
    let thread = b.build();

    let collapsed = apply(
        &thread,
        Transform::CollapseResource {
            resource_index: resource,
            collapsed_func_index: thread.func_table.len(),
            implementation: ImplementationFilter::Combined,
        },
    );

    // Siblings B and C share one collapsed node; the contiguous B->C run
    // collapses into the same node as well.
    assert_eq!(
        sample_paths(&collapsed),
        vec![
            Some("A;libfoo;X".to_string()),
            Some("A;libfoo;Y".to_string()),
            Some("A;libfoo;Z".to_string()),
        ]
    );
    // Exactly one synthetic func and frame were added.
    assert_eq!(collapsed.func_table.len(), thread.func_table.len() + 1);
    assert_eq!(collapsed.frame_table.len(), thread.frame_table.len() + 1);
}

#[test]
fn collapse_resource_conflicting_categories_use_the_default() {
    let mut b = ThreadBuilder::new();
    b.sample_with_categories(&[("A", 0, 0), ("B", 1, 1)], 0.0);
    b.sample_with_categories(&[("A", 0, 0), ("C", 2, 0)], 1.0);
    let resource = b.resource("libfoo");
    b.set_resource("B", resource);
    b.set_resource("C", resource);
    let thread = b.build();

    let collapsed = apply(
        &thread,
        Transform::CollapseResource {
            resource_index: resource,
            collapsed_func_index: thread.func_table.len(),
            implementation: ImplementationFilter::Combined,
        },
    );

    let collapsed_stack = collapsed.samples.stack[0].unwrap();
    assert_eq!(collapsed.samples.stack[1], Some(collapsed_stack));
    // Categories 1 and 2 conflict: default category, subcategory 0.
    assert_eq!(collapsed.stack_table.category[collapsed_stack], 0);
    assert_eq!(collapsed.stack_table.subcategory[collapsed_stack], 0);
}

#[test]
fn collapse_resource_subcategory_conflict_keeps_the_category() {
    let mut b = ThreadBuilder::new();
    b.sample_with_categories(&[("A", 0, 0), ("B", 1, 1)], 0.0);
    b.sample_with_categories(&[("A", 0, 0), ("C", 1, 2)], 1.0);
    let resource = b.resource("libfoo");
    b.set_resource("B", resource);
    b.set_resource("C", resource);
    let thread = b.build();

    let collapsed = apply(
        &thread,
        Transform::CollapseResource {
            resource_index: resource,
            collapsed_func_index: thread.func_table.len(),
            implementation: ImplementationFilter::Combined,
        },
    );

    let collapsed_stack = collapsed.samples.stack[0].unwrap();
    assert_eq!(collapsed.stack_table.category[collapsed_stack], 1);
    assert_eq!(collapsed.stack_table.subcategory[collapsed_stack], 0);
}

#[test]
fn collapse_direct_recursion_folds_consecutive_calls() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A", "B", "B", "B", "C"], 0.0);
    b.sample(&["A", "B", "B"], 1.0);
    let func_b = b.func_index("B");
    let thread = b.build();

    let collapsed = apply(
        &thread,
        Transform::CollapseDirectRecursion {
            func_index: func_b,
            implementation: ImplementationFilter::Combined,
        },
    );

    assert_eq!(
        sample_paths(&collapsed),
        vec![Some("A;B;C".to_string()), Some("A;B".to_string())]
    );
}

#[test]
fn collapse_direct_recursion_is_direct_modulo_the_filter() {
    let mut b = ThreadBuilder::new();
    b.func_js("B");
    b.sample(&["A", "B", "glue", "B", "C"], 0.0);
    let func_b = b.func_index("B");
    let thread = b.build();

    // Under the combined filter the native "glue" frame breaks the run.
    let combined = apply(
        &thread,
        Transform::CollapseDirectRecursion {
            func_index: func_b,
            implementation: ImplementationFilter::Combined,
        },
    );
    assert_eq!(
        sample_paths(&combined),
        vec![Some("A;B;glue;B;C".to_string())]
    );

    // Under the JS filter, JS -> C++ -> JS counts as direct recursion.
    let js_only = apply(
        &thread,
        Transform::CollapseDirectRecursion {
            func_index: func_b,
            implementation: ImplementationFilter::Js,
        },
    );
    assert_eq!(sample_paths(&js_only), vec![Some("A;B;C".to_string())]);
}

#[test]
fn collapse_recursion_folds_any_nested_call() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A", "B", "B", "B", "C"], 0.0);
    b.sample(&["A", "B", "D"], 1.0);
    let func_b = b.func_index("B");
    let thread = b.build();

    let collapsed = apply(&thread, Transform::CollapseRecursion { func_index: func_b });

    assert_eq!(
        sample_paths(&collapsed),
        vec![Some("A;B;C".to_string()), Some("A;B;D".to_string())]
    );
}

#[test]
fn collapse_recursion_ignores_the_implementation_filter() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A", "B", "X", "B", "C"], 0.0);
    let func_b = b.func_index("B");
    let thread = b.build();

    let collapsed = apply(&thread, Transform::CollapseRecursion { func_index: func_b });

    // The inner B merges into the outer activation even across a
    // matching intermediate frame; C re-parents to the outer B.
    assert_eq!(sample_paths(&collapsed), vec![Some("A;B;C".to_string())]);
}

#[test]
fn collapse_function_subtree_turns_the_subtree_into_a_leaf() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A", "B", "C", "D"], 0.0);
    b.sample(&["A", "B", "E"], 1.0);
    b.sample(&["A", "X"], 2.0);
    let func_b = b.func_index("B");
    let thread = b.build();

    let collapsed = apply(
        &thread,
        Transform::CollapseFunctionSubtree { func_index: func_b },
    );

    assert_eq!(
        sample_paths(&collapsed),
        vec![
            Some("A;B".to_string()),
            Some("A;B".to_string()),
            Some("A;X".to_string()),
        ]
    );
}

#[test]
fn filter_samples_keeps_the_half_open_range() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A"], 1.9);
    b.sample(&["A"], 2.0);
    b.sample(&["A"], 3.9);
    b.sample(&["A"], 4.0);
    b.marker("Work", Some(2.0), Some(4.0), None);
    let thread = b.build();

    let filtered = apply(
        &thread,
        Transform::FilterSamples {
            filter_type: SampleFilterType::MarkerSearch,
            filter: "work".to_string(),
        },
    );

    // [2.0, 4.0): the sample at the start is kept, the one at the end is
    // not.
    assert_eq!(
        filtered.samples.stack.iter().map(Option::is_some).collect::<Vec<_>>(),
        vec![false, true, true, false]
    );
    assert_eq!(filtered.samples.len(), thread.samples.len());
}

#[test]
fn filter_samples_with_spanning_marker_changes_nothing() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A"], 0.0);
    b.sample(&["A", "B"], 1.0);
    b.marker("Everything", Some(0.0), Some(10.0), None);
    let thread = b.build();

    let filtered = apply(
        &thread,
        Transform::FilterSamples {
            filter_type: SampleFilterType::MarkerSearch,
            filter: String::new(),
        },
    );

    assert_eq!(sample_paths(&filtered), sample_paths(&thread));
    assert_eq!(filtered.samples.len(), thread.samples.len());
}

#[test]
fn out_of_range_indices_are_rejected() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A"], 0.0);
    let thread = b.build();

    let categories = test_categories();
    let schemas: HashMap<String, MarkerSchema> = HashMap::new();
    let ctx = TransformContext {
        default_category: 0,
        categories: &categories,
        marker_schemas: &schemas,
    };

    let stale = Transform::DropFunction { func_index: 999 };
    assert!(apply_transform(&thread, &stale, &ctx).is_err());

    let stale_category = Transform::FocusCategory { category: 99 };
    assert!(apply_transform(&thread, &stale_category, &ctx).is_err());
}

#[test]
fn filter_samples_merges_overlapping_marker_ranges() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A"], 0.5);
    b.sample(&["A"], 2.5);
    b.sample(&["A"], 5.5);
    b.marker("Work", Some(1.0), Some(3.0), None);
    b.marker("Work", Some(2.0), Some(6.0), None);
    let thread = b.build();

    let filtered = apply(
        &thread,
        Transform::FilterSamples {
            filter_type: SampleFilterType::MarkerSearch,
            filter: "Work".to_string(),
        },
    );

    assert_eq!(
        filtered.samples.stack.iter().map(Option::is_some).collect::<Vec<_>>(),
        vec![false, true, true]
    );
}
