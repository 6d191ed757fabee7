//! Collapse transforms: fold runs of related stacks into single nodes.

use log::debug;
use std::collections::HashMap;

use crate::filters::implementation::{func_matches_implementation, ImplementationFilter};
use crate::profile::tables::{
    IndexIntoCategoryList, IndexIntoFuncTable, IndexIntoResourceTable, IndexIntoStackTable,
    StackTable, Thread,
};
use crate::transforms::{update_thread_stacks, StackMap};

/// Collapse all frames belonging to `resource_index` into one synthetic
/// frame/func per contiguous run. Siblings from the same resource under
/// the same parent share one collapsed stack.
///
/// The synthetic func/frame pair is created lazily the first time a frame
/// of the resource is seen; `collapsed_func_index` is the func index
/// recorded when the transform was created (replay is deterministic, so
/// the lazily pushed func lands on the same index).
///
/// Category tie-breaks when merged rows disagree: conflicting categories
/// fall back to `default_category` with subcategory 0; a subcategory-only
/// conflict resets the subcategory to 0 and keeps the category.
pub fn collapse_resource(
    thread: &Thread,
    resource_index: IndexIntoResourceTable,
    collapsed_func_index: IndexIntoFuncTable,
    implementation: ImplementationFilter,
    default_category: IndexIntoCategoryList,
) -> Thread {
    debug!(
        "collapse-resource {}: {} stacks",
        resource_index,
        thread.stack_table.len()
    );

    let stack_table = &thread.stack_table;
    let mut new_frame_table = thread.frame_table.clone();
    let mut new_func_table = thread.func_table.clone();
    let mut new_stack_table = StackTable::new();
    let mut map = StackMap::new(stack_table.len());
    // New prefix -> the collapsed stack that absorbs same-resource
    // siblings under it.
    let mut collapsed_for_prefix: HashMap<Option<IndexIntoStackTable>, IndexIntoStackTable> =
        HashMap::new();
    // New stacks that are collapsed rows, for absorbing contiguous runs.
    let mut is_collapsed_row: Vec<bool> = Vec::new();
    let mut collapsed_frame: Option<usize> = None;

    for stack in 0..stack_table.len() {
        let new_prefix = map.get(stack_table.prefix[stack]);
        let func = thread.stack_func(stack);
        let category = stack_table.category[stack];
        let subcategory = stack_table.subcategory[stack];

        if thread.func_table.resource[func] != Some(resource_index) {
            let new_stack = new_stack_table.push(
                new_prefix,
                stack_table.frame[stack],
                category,
                subcategory,
            );
            is_collapsed_row.push(false);
            map.set(stack, Some(new_stack));
            continue;
        }

        // A contiguous run: the parent already collapsed into this
        // resource, so this stack folds into it.
        if let Some(prefix) = new_prefix {
            if is_collapsed_row[prefix] {
                resolve_category_conflict(
                    &mut new_stack_table,
                    prefix,
                    category,
                    subcategory,
                    default_category,
                );
                map.set(stack, Some(prefix));
                continue;
            }
        }

        // A sibling under the same parent already collapsed.
        if let Some(&existing) = collapsed_for_prefix.get(&new_prefix) {
            resolve_category_conflict(
                &mut new_stack_table,
                existing,
                category,
                subcategory,
                default_category,
            );
            map.set(stack, Some(existing));
            continue;
        }

        let frame = *collapsed_frame.get_or_insert_with(|| {
            let name = thread.resource_table.name[resource_index];
            let func = new_func_table.push(
                name,
                Some(resource_index),
                implementation == ImplementationFilter::Js,
                false,
            );
            debug_assert_eq!(func, collapsed_func_index);
            new_frame_table.push(func, None, None)
        });
        let new_stack = new_stack_table.push(new_prefix, frame, category, subcategory);
        is_collapsed_row.push(true);
        collapsed_for_prefix.insert(new_prefix, new_stack);
        map.set(stack, Some(new_stack));
    }

    let mut new_thread = update_thread_stacks(thread, new_stack_table, |old| map.get(old));
    new_thread.frame_table = new_frame_table;
    new_thread.func_table = new_func_table;
    new_thread
}

fn resolve_category_conflict(
    stack_table: &mut StackTable,
    row: IndexIntoStackTable,
    category: IndexIntoCategoryList,
    subcategory: IndexIntoCategoryList,
    default_category: IndexIntoCategoryList,
) {
    if stack_table.category[row] != category {
        stack_table.category[row] = default_category;
        stack_table.subcategory[row] = 0;
    } else if stack_table.subcategory[row] != subcategory {
        stack_table.subcategory[row] = 0;
    }
}

/// Collapse consecutive recursive calls to `func_index` — consecutive
/// modulo the implementation filter, so JS -> C++ -> JS counts as direct
/// recursion under a JS-only filter. Inner recursive stacks re-parent to
/// the outermost activation's parent while keeping their own frame, so the
/// innermost frame's line/address wins in the call tree.
pub fn collapse_direct_recursion(
    thread: &Thread,
    func_index: IndexIntoFuncTable,
    implementation: ImplementationFilter,
) -> Thread {
    debug!(
        "collapse-direct-recursion: {} stacks",
        thread.stack_table.len()
    );

    let stack_table = &thread.stack_table;
    let mut new_stack_table = StackTable::new();
    let mut map = StackMap::new(stack_table.len());
    // For stacks inside a recursion chain: the new prefix the collapsed
    // activations hang from (the outermost activation's parent).
    let mut chain: Vec<Option<Option<IndexIntoStackTable>>> = vec![None; stack_table.len()];

    for stack in 0..stack_table.len() {
        let prefix = stack_table.prefix[stack];
        let new_prefix = map.get(prefix);
        let in_chain = prefix.and_then(|p| chain[p]);
        let func = thread.stack_func(stack);

        if func == func_index {
            let collapse_prefix = match in_chain {
                // Inner recursive call: skip straight to the outermost
                // activation's parent.
                Some(root_prefix) => root_prefix,
                None => new_prefix,
            };
            let new_stack = new_stack_table.push(
                collapse_prefix,
                stack_table.frame[stack],
                stack_table.category[stack],
                stack_table.subcategory[stack],
            );
            map.set(stack, Some(new_stack));
            chain[stack] = Some(collapse_prefix);
        } else {
            let new_stack = new_stack_table.push(
                new_prefix,
                stack_table.frame[stack],
                stack_table.category[stack],
                stack_table.subcategory[stack],
            );
            map.set(stack, Some(new_stack));
            // The chain extends through frames the implementation filter
            // would hide, and only through those.
            chain[stack] = if in_chain.is_some()
                && !func_matches_implementation(thread, func, implementation)
            {
                in_chain
            } else {
                None
            };
        }
    }

    update_thread_stacks(thread, new_stack_table, |old| map.get(old))
}

/// Collapse any recursive call to `func_index` anywhere in a subtree of
/// `func_index` into the outermost activation, ignoring the implementation
/// filter entirely. Descendants of an inner activation re-parent to the
/// outermost one.
pub fn collapse_recursion(thread: &Thread, func_index: IndexIntoFuncTable) -> Thread {
    debug!("collapse-recursion: {} stacks", thread.stack_table.len());

    let stack_table = &thread.stack_table;
    let mut new_stack_table = StackTable::new();
    let mut map = StackMap::new(stack_table.len());
    // New index of the outermost activation governing each old stack.
    let mut outermost: Vec<Option<IndexIntoStackTable>> = vec![None; stack_table.len()];

    for stack in 0..stack_table.len() {
        let prefix = stack_table.prefix[stack];
        let new_prefix = map.get(prefix);
        let outer = prefix.and_then(|p| outermost[p]);

        if thread.stack_func(stack) == func_index {
            match outer {
                Some(outer_new) => {
                    // Inner activation merges into the outermost one.
                    map.set(stack, Some(outer_new));
                    outermost[stack] = Some(outer_new);
                }
                None => {
                    let new_stack = new_stack_table.push(
                        new_prefix,
                        stack_table.frame[stack],
                        stack_table.category[stack],
                        stack_table.subcategory[stack],
                    );
                    map.set(stack, Some(new_stack));
                    outermost[stack] = Some(new_stack);
                }
            }
        } else {
            let new_stack = new_stack_table.push(
                new_prefix,
                stack_table.frame[stack],
                stack_table.category[stack],
                stack_table.subcategory[stack],
            );
            map.set(stack, Some(new_stack));
            outermost[stack] = outer;
        }
    }

    update_thread_stacks(thread, new_stack_table, |old| map.get(old))
}

/// Once a stack matching `func_index` is found, merge all of its
/// descendants into it, turning the call and everything below it into a
/// single leaf. Descendant categories resolve conflicts the same way
/// collapse-resource does.
pub fn collapse_function_subtree(
    thread: &Thread,
    func_index: IndexIntoFuncTable,
    default_category: IndexIntoCategoryList,
) -> Thread {
    debug!(
        "collapse-function-subtree: {} stacks",
        thread.stack_table.len()
    );

    let stack_table = &thread.stack_table;
    let mut new_stack_table = StackTable::new();
    let mut map = StackMap::new(stack_table.len());
    // The collapsed leaf each old stack folds into, if inside a collapsed
    // subtree.
    let mut collapsed_into: Vec<Option<IndexIntoStackTable>> = vec![None; stack_table.len()];

    for stack in 0..stack_table.len() {
        let prefix = stack_table.prefix[stack];
        let root = prefix.and_then(|p| collapsed_into[p]);

        if let Some(root_new) = root {
            resolve_category_conflict(
                &mut new_stack_table,
                root_new,
                stack_table.category[stack],
                stack_table.subcategory[stack],
                default_category,
            );
            map.set(stack, Some(root_new));
            collapsed_into[stack] = Some(root_new);
        } else {
            let new_stack = new_stack_table.push(
                map.get(prefix),
                stack_table.frame[stack],
                stack_table.category[stack],
                stack_table.subcategory[stack],
            );
            map.set(stack, Some(new_stack));
            collapsed_into[stack] = if thread.stack_func(stack) == func_index {
                Some(new_stack)
            } else {
                None
            };
        }
    }

    update_thread_stacks(thread, new_stack_table, |old| map.get(old))
}
