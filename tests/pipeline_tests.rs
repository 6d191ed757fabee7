//! The memoized view pipeline: stage composition and incremental
//! recomputation.

mod common;

use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::Arc;

use common::{sample_paths, test_categories, ThreadBuilder};
use stacklens::filters::{
    filter_thread_samples_to_range, filter_thread_to_implementation,
    filter_thread_to_search_string, ImplementationFilter,
};
use stacklens::profile::markers::MarkerSchema;
use stacklens::selectors::{ThreadSelectors, ViewOptions};
use stacklens::transforms::{SampleFilterType, Transform, TransformContext};
use stacklens::utils::error::TransformError;

fn context<'a>(
    categories: &'a [stacklens::profile::tables::Category],
    schemas: &'a HashMap<String, MarkerSchema>,
) -> TransformContext<'a> {
    TransformContext {
        default_category: 0,
        categories,
        marker_schemas: schemas,
    }
}

#[test]
fn range_filter_slices_half_open() {
    let mut b = ThreadBuilder::new();
    for t in 0..5 {
        b.sample(&["A"], t as f64);
    }
    let thread = b.build();

    let filtered = filter_thread_samples_to_range(&thread, 1.0, 3.0);
    assert_eq!(filtered.samples.time, vec![1.0, 2.0]);
    // Stacks may stay unreferenced; that's fine.
    assert_eq!(filtered.stack_table.len(), thread.stack_table.len());
}

#[test]
fn implementation_filter_reparents_across_removed_frames() {
    let mut b = ThreadBuilder::new();
    b.func_js("B");
    b.sample(&["A", "B", "C"], 0.0);
    let thread = b.build();

    let js = filter_thread_to_implementation(&thread, ImplementationFilter::Js);
    assert_eq!(sample_paths(&js), vec![Some("B".to_string())]);

    let cpp = filter_thread_to_implementation(&thread, ImplementationFilter::Cpp);
    assert_eq!(sample_paths(&cpp), vec![Some("A;C".to_string())]);
}

#[test]
fn cpp_filter_excludes_probable_jit_frames() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A", "0x7f2e4c11", "C"], 0.0);
    let thread = b.build();

    let cpp = filter_thread_to_implementation(&thread, ImplementationFilter::Cpp);
    assert_eq!(sample_paths(&cpp), vec![Some("A;C".to_string())]);
}

#[test]
fn search_filter_drops_non_matching_samples() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A", "B", "C"], 0.0);
    b.sample(&["X"], 1.0);
    let thread = b.build();

    let found = filter_thread_to_search_string(&thread, "b");
    assert_eq!(
        found.samples.stack.iter().map(Option::is_some).collect::<Vec<_>>(),
        vec![true, false]
    );

    let none = filter_thread_to_search_string(&thread, "zzz");
    assert_eq!(none.samples.stack, vec![None, None]);
}

#[test]
fn inverted_view_reverses_sample_chains() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A", "B", "C"], 0.0);
    b.sample(&["A", "B"], 1.0);
    let thread = b.build();

    let categories = test_categories();
    let schemas = HashMap::new();
    let ctx = context(&categories, &schemas);

    let mut selectors = ThreadSelectors::new(Arc::new(thread));
    let options = ViewOptions {
        inverted: true,
        ..Default::default()
    };
    let inverted = selectors.filtered_thread(&options, &ctx).unwrap();

    assert_eq!(
        sample_paths(&inverted),
        vec![Some("C;B;A".to_string()), Some("B;A".to_string())]
    );
}

#[test]
fn pushing_a_transform_recomputes_only_the_suffix() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A", "B", "C"], 0.0);
    b.sample(&["A", "B", "D"], 1.0);
    let func_b = b.func_index("B");
    let c = b.func_index("C");
    let thread = b.build();

    let categories = test_categories();
    let schemas = HashMap::new();
    let ctx = context(&categories, &schemas);

    let mut selectors = ThreadSelectors::new(Arc::new(thread));

    let mut options = ViewOptions::default();
    options.transforms = vec![Transform::MergeFunction { func_index: func_b }];
    let first = selectors.filtered_thread(&options, &ctx).unwrap();
    assert_eq!(selectors.transform_chain.applications, 1);

    // Same options again: everything is a cache hit.
    let again = selectors.filtered_thread(&options, &ctx).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(selectors.transform_chain.applications, 1);

    // Pushing one more transform only applies the new one.
    options
        .transforms
        .push(Transform::DropFunction { func_index: c });
    let pushed = selectors.filtered_thread(&options, &ctx).unwrap();
    assert_eq!(selectors.transform_chain.applications, 2);
    assert_eq!(
        sample_paths(&pushed),
        vec![None, Some("A;D".to_string())]
    );

    // Popping back reuses the cached prefix without any new application.
    options.transforms.pop();
    let popped = selectors.filtered_thread(&options, &ctx).unwrap();
    assert!(Arc::ptr_eq(&first, &popped));
    assert_eq!(selectors.transform_chain.applications, 2);
}

#[test]
fn full_pipeline_composes_in_order() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A", "B", "C"], 0.0);
    b.sample(&["A", "B", "C"], 5.0);
    b.sample(&["A", "D"], 6.0);
    let func_b = b.func_index("B");
    let thread = b.build();

    let categories = test_categories();
    let schemas = HashMap::new();
    let ctx = context(&categories, &schemas);

    let mut selectors = ThreadSelectors::new(Arc::new(thread));
    let options = ViewOptions {
        range: Some((4.0, 10.0)),
        transforms: vec![Transform::MergeFunction { func_index: func_b }],
        search: "c".to_string(),
        ..Default::default()
    };
    let derived = selectors.filtered_thread(&options, &ctx).unwrap();

    // Range keeps the samples at 5.0 and 6.0; the merge elides B; the
    // search keeps only the stack containing C.
    assert_eq!(
        sample_paths(&derived),
        vec![Some("A;C".to_string()), None]
    );
}

#[test]
fn missing_marker_schema_fails_the_pipeline() {
    let mut b = ThreadBuilder::new();
    b.sample(&["A"], 0.0);
    b.marker(
        "Custom",
        Some(0.0),
        Some(1.0),
        Some(serde_json::json!({ "type": "CustomThing", "detail": "x" })),
    );
    let thread = b.build();

    let categories = test_categories();
    let schemas = HashMap::new();
    let ctx = context(&categories, &schemas);

    let mut selectors = ThreadSelectors::new(Arc::new(thread));
    let options = ViewOptions {
        transforms: vec![Transform::FilterSamples {
            filter_type: SampleFilterType::MarkerSearch,
            filter: "detail-x".to_string(),
        }],
        ..Default::default()
    };
    let result = selectors.filtered_thread(&options, &ctx);
    assert!(matches!(
        result,
        Err(TransformError::MissingMarkerSchema(_))
    ));
}
