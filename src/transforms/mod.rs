//! Call-tree transforms: pure rewrites of a thread's stack table.
//!
//! Every transform takes a thread and produces a new thread; inputs are
//! never mutated. Transforms that change which stacks exist all follow the
//! same template: walk the old stack table in index order (prefixes come
//! before children), decide per row whether to keep, merge, or drop it
//! while recording an old-index -> new-index-or-none map, then hand the
//! new table and the map to [`update_thread_stacks`] which rewrites every
//! reference consistently.
//!
//! The transform set, their parameters, and the serialized short keys:
//!
//! | transform | key |
//! |---|---|
//! | focus subtree (optionally inverted) | `f` |
//! | focus function | `ff` |
//! | focus category | `fg` |
//! | merge call node | `mcn` |
//! | merge function | `mf` |
//! | drop function | `df` |
//! | collapse resource | `cr` |
//! | collapse direct recursion | `drec` |
//! | collapse recursion | `rec` |
//! | collapse function subtree | `cfs` |
//! | filter samples | `fs` |

pub mod collapse;
pub mod focus;
pub mod merge;
pub mod path;
pub mod sample_filter;
pub mod serialization;

use std::collections::HashMap;

use crate::filters::implementation::ImplementationFilter;
use crate::profile::call_node::CallNodePath;
use crate::profile::markers::MarkerSchema;
use crate::profile::tables::{
    Category, IndexIntoCategoryList, IndexIntoFuncTable, IndexIntoResourceTable,
    IndexIntoStackTable, StackTable, Thread,
};
use crate::utils::error::TransformError;
use crate::utils::function_name::get_function_name;

pub use path::apply_transform_to_call_node_path;
pub use serialization::{parse_transforms, stringify_transforms};

/// What a `filter-samples` transform filters by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFilterType {
    /// Keep samples inside time ranges of markers matching a search.
    MarkerSearch,
}

/// One user-applied rewrite of a thread's stacks. Parameters are exactly
/// what is needed to reapply the transform when the view is recomputed.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    FocusSubtree {
        call_node_path: CallNodePath,
        implementation: ImplementationFilter,
        inverted: bool,
    },
    FocusFunction {
        func_index: IndexIntoFuncTable,
    },
    FocusCategory {
        category: IndexIntoCategoryList,
    },
    MergeCallNode {
        call_node_path: CallNodePath,
        implementation: ImplementationFilter,
    },
    MergeFunction {
        func_index: IndexIntoFuncTable,
    },
    DropFunction {
        func_index: IndexIntoFuncTable,
    },
    CollapseResource {
        resource_index: IndexIntoResourceTable,
        collapsed_func_index: IndexIntoFuncTable,
        implementation: ImplementationFilter,
    },
    CollapseDirectRecursion {
        func_index: IndexIntoFuncTable,
        implementation: ImplementationFilter,
    },
    CollapseRecursion {
        func_index: IndexIntoFuncTable,
    },
    CollapseFunctionSubtree {
        func_index: IndexIntoFuncTable,
    },
    FilterSamples {
        filter_type: SampleFilterType,
        filter: String,
    },
}

/// Ordered list of transforms, applied left to right. Order matters.
pub type TransformStack = Vec<Transform>;

/// Per-profile context a transform application needs besides the thread.
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    pub default_category: IndexIntoCategoryList,
    pub categories: &'a [Category],
    pub marker_schemas: &'a HashMap<String, MarkerSchema>,
}

fn check_func(thread: &Thread, func: IndexIntoFuncTable) -> Result<(), TransformError> {
    if func >= thread.func_table.len() {
        return Err(TransformError::IndexOutOfRange(format!(
            "func {} of {}",
            func,
            thread.func_table.len()
        )));
    }
    Ok(())
}

/// Apply one transform. The single dispatch point; the match is exhaustive
/// on purpose so a new transform variant fails to compile until every
/// consumer handles it.
///
/// Indices a stale URL might carry (func, resource, category) are
/// validated here; call node paths need no validation since an unknown
/// func simply never matches.
pub fn apply_transform(
    thread: &Thread,
    transform: &Transform,
    ctx: &TransformContext,
) -> Result<Thread, TransformError> {
    match transform {
        Transform::FocusSubtree {
            call_node_path,
            implementation,
            inverted,
        } => {
            if *inverted {
                Ok(focus::focus_inverted_subtree(
                    thread,
                    call_node_path,
                    *implementation,
                ))
            } else {
                Ok(focus::focus_subtree(thread, call_node_path, *implementation))
            }
        }
        Transform::FocusFunction { func_index } => {
            check_func(thread, *func_index)?;
            Ok(focus::focus_function(thread, *func_index))
        }
        Transform::FocusCategory { category } => {
            if *category >= ctx.categories.len() {
                return Err(TransformError::IndexOutOfRange(format!(
                    "category {} of {}",
                    category,
                    ctx.categories.len()
                )));
            }
            Ok(focus::focus_category(thread, *category))
        }
        Transform::MergeCallNode {
            call_node_path,
            implementation,
        } => Ok(merge::merge_call_node(
            thread,
            call_node_path,
            *implementation,
        )),
        Transform::MergeFunction { func_index } => {
            check_func(thread, *func_index)?;
            Ok(merge::merge_function(thread, *func_index))
        }
        Transform::DropFunction { func_index } => {
            check_func(thread, *func_index)?;
            Ok(merge::drop_function(thread, *func_index))
        }
        Transform::CollapseResource {
            resource_index,
            collapsed_func_index,
            implementation,
        } => {
            if *resource_index >= thread.resource_table.len() {
                return Err(TransformError::IndexOutOfRange(format!(
                    "resource {} of {}",
                    resource_index,
                    thread.resource_table.len()
                )));
            }
            Ok(collapse::collapse_resource(
                thread,
                *resource_index,
                *collapsed_func_index,
                *implementation,
                ctx.default_category,
            ))
        }
        Transform::CollapseDirectRecursion {
            func_index,
            implementation,
        } => {
            check_func(thread, *func_index)?;
            Ok(collapse::collapse_direct_recursion(
                thread,
                *func_index,
                *implementation,
            ))
        }
        Transform::CollapseRecursion { func_index } => {
            check_func(thread, *func_index)?;
            Ok(collapse::collapse_recursion(thread, *func_index))
        }
        Transform::CollapseFunctionSubtree { func_index } => {
            check_func(thread, *func_index)?;
            Ok(collapse::collapse_function_subtree(
                thread,
                *func_index,
                ctx.default_category,
            ))
        }
        Transform::FilterSamples {
            filter_type,
            filter,
        } => sample_filter::filter_samples(thread, *filter_type, filter, ctx),
    }
}

/// Reduce a transform stack left to right. The memoized variant lives in
/// the selector layer; this is the plain reduction.
pub fn apply_transform_stack(
    thread: &Thread,
    transforms: &[Transform],
    ctx: &TransformContext,
) -> Result<Thread, TransformError> {
    let mut current = thread.clone();
    for transform in transforms {
        current = apply_transform(&current, transform, ctx)?;
    }
    Ok(current)
}

/// Human-readable label for a transform, with function names normalized
/// (argument lists and template parameters stripped).
pub fn describe_transform(thread: &Thread, transform: &Transform) -> String {
    let func_label = |func: IndexIntoFuncTable| {
        if func < thread.func_table.len() {
            get_function_name(thread.func_name(func))
        } else {
            format!("func {}", func)
        }
    };
    match transform {
        Transform::FocusSubtree { call_node_path, inverted, .. } => {
            let leaf = call_node_path.last().map(|&f| func_label(f)).unwrap_or_default();
            if *inverted {
                format!("Focus (inverted): {}", leaf)
            } else {
                format!("Focus: {}", leaf)
            }
        }
        Transform::FocusFunction { func_index } => {
            format!("Focus function: {}", func_label(*func_index))
        }
        Transform::FocusCategory { category } => format!("Focus category: {}", category),
        Transform::MergeCallNode { call_node_path, .. } => {
            let leaf = call_node_path.last().map(|&f| func_label(f)).unwrap_or_default();
            format!("Merge node: {}", leaf)
        }
        Transform::MergeFunction { func_index } => {
            format!("Merge: {}", func_label(*func_index))
        }
        Transform::DropFunction { func_index } => {
            format!("Drop: {}", func_label(*func_index))
        }
        Transform::CollapseResource { resource_index, .. } => {
            let name = if *resource_index < thread.resource_table.len() {
                thread
                    .string_table
                    .get(thread.resource_table.name[*resource_index])
                    .to_string()
            } else {
                format!("resource {}", resource_index)
            };
            format!("Collapse: {}", name)
        }
        Transform::CollapseDirectRecursion { func_index, .. } => {
            format!("Collapse direct recursion: {}", func_label(*func_index))
        }
        Transform::CollapseRecursion { func_index } => {
            format!("Collapse recursion: {}", func_label(*func_index))
        }
        Transform::CollapseFunctionSubtree { func_index } => {
            format!("Collapse subtree: {}", func_label(*func_index))
        }
        Transform::FilterSamples { filter, .. } => {
            format!("Filter samples: marker search \"{}\"", filter)
        }
    }
}

/// Old-stack -> new-stack mapping built during a rewrite walk.
///
/// Backed by a flat i64 array: -2 = not yet mapped, -1 = maps to none,
/// otherwise the new index. Reading an unmapped entry is a programming
/// error in the transform (prefixes must be visited before children) and
/// fails loudly.
pub struct StackMap {
    entries: Vec<i64>,
}

impl StackMap {
    const UNSET: i64 = -2;
    const NONE: i64 = -1;

    pub fn new(len: usize) -> Self {
        Self {
            entries: vec![Self::UNSET; len],
        }
    }

    pub fn set(&mut self, old: IndexIntoStackTable, new: Option<IndexIntoStackTable>) {
        self.entries[old] = match new {
            None => Self::NONE,
            Some(index) => index as i64,
        };
    }

    pub fn get(&self, old: Option<IndexIntoStackTable>) -> Option<IndexIntoStackTable> {
        let old = old?;
        match self.entries[old] {
            Self::UNSET => panic!(
                "stack {} was referenced before being mapped; prefixes must be visited first",
                old
            ),
            Self::NONE => None,
            new => Some(new as usize),
        }
    }
}

/// Replace a thread's stack table and rewrite every reference to the old
/// stack indices through `map_old_stack_to_new`. The mapping function must
/// be total over the old table; this helper's only job is consistent
/// replacement everywhere stack indices appear.
pub fn update_thread_stacks(
    thread: &Thread,
    new_stack_table: StackTable,
    map_old_stack_to_new: impl Fn(Option<IndexIntoStackTable>) -> Option<IndexIntoStackTable>,
) -> Thread {
    let mut samples = thread.samples.clone();
    for stack in samples.stack.iter_mut() {
        *stack = map_old_stack_to_new(*stack);
    }

    Thread {
        name: thread.name.clone(),
        stack_table: new_stack_table,
        frame_table: thread.frame_table.clone(),
        func_table: thread.func_table.clone(),
        resource_table: thread.resource_table.clone(),
        samples,
        markers: thread.markers.clone(),
        string_table: thread.string_table.clone(),
    }
}
