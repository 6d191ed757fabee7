//! Focus transforms: restrict the tree to one subtree, function, or
//! category.

use log::debug;
use std::collections::HashMap;

use crate::filters::implementation::{func_matches_implementation, ImplementationFilter};
use crate::profile::call_node::CallNodePath;
use crate::profile::tables::{IndexIntoCategoryList, IndexIntoFuncTable, StackTable, Thread};
use crate::transforms::{update_thread_stacks, StackMap};

// Matching state while walking stacks against a call node path: number of
// path functions matched along the ancestor chain, or BROKEN once a
// non-transparent frame diverged from the path.
const BROKEN: i64 = -1;

/// Keep only stacks whose (implementation-filtered) ancestor chain matches
/// `call_node_path` exactly, re-rooted at the path's leaf.
///
/// Frames that fail the implementation filter are transparent while
/// matching: they neither advance nor break the match. Stacks on the path
/// above the focus node are dropped (their samples measured time outside
/// the focused subtree).
pub fn focus_subtree(
    thread: &Thread,
    call_node_path: &CallNodePath,
    implementation: ImplementationFilter,
) -> Thread {
    if call_node_path.is_empty() {
        return thread.clone();
    }
    debug!(
        "focus-subtree: path depth {}, {} stacks",
        call_node_path.len(),
        thread.stack_table.len()
    );

    let stack_table = &thread.stack_table;
    let path_len = call_node_path.len() as i64;
    let mut new_stack_table = StackTable::new();
    let mut map = StackMap::new(stack_table.len());
    let mut matched_depth: Vec<i64> = vec![BROKEN; stack_table.len()];

    for stack in 0..stack_table.len() {
        let prefix = stack_table.prefix[stack];
        let prefix_depth = match prefix {
            None => 0,
            Some(p) => matched_depth[p],
        };

        if prefix_depth == BROKEN {
            matched_depth[stack] = BROKEN;
            map.set(stack, None);
            continue;
        }

        if prefix_depth == path_len {
            // Inside the focused subtree: keep as-is.
            let new_stack = new_stack_table.push(
                map.get(prefix),
                stack_table.frame[stack],
                stack_table.category[stack],
                stack_table.subcategory[stack],
            );
            map.set(stack, Some(new_stack));
            matched_depth[stack] = path_len;
            continue;
        }

        // Still on the way to a full match.
        let func = thread.stack_func(stack);
        if func == call_node_path[prefix_depth as usize] {
            let depth = prefix_depth + 1;
            matched_depth[stack] = depth;
            if depth == path_len {
                // This stack is the focused node; it becomes a root.
                let new_stack = new_stack_table.push(
                    None,
                    stack_table.frame[stack],
                    stack_table.category[stack],
                    stack_table.subcategory[stack],
                );
                map.set(stack, Some(new_stack));
            } else {
                map.set(stack, None);
            }
        } else if !func_matches_implementation(thread, func, implementation) {
            // Transparent frame: doesn't advance or break the match.
            matched_depth[stack] = prefix_depth;
            map.set(stack, None);
        } else {
            matched_depth[stack] = BROKEN;
            map.set(stack, None);
        }
    }

    update_thread_stacks(thread, new_stack_table, |old| map.get(old))
}

/// Inverted focus: `call_node_path` is a path in the inverted tree, so its
/// first element is the sample's leaf function. Each sample's stack is
/// walked from the leaf toward the root; when the whole path matches
/// (skipping frames that fail the implementation filter), the sample
/// re-points at the ancestor stack where the match completed. Samples that
/// don't match are dropped. The stack table itself is untouched.
pub fn focus_inverted_subtree(
    thread: &Thread,
    call_node_path: &CallNodePath,
    implementation: ImplementationFilter,
) -> Thread {
    if call_node_path.is_empty() {
        return thread.clone();
    }
    debug!(
        "focus-inverted-subtree: path depth {}, {} samples",
        call_node_path.len(),
        thread.samples.len()
    );

    let mut match_cache: HashMap<usize, Option<usize>> = HashMap::new();

    let match_from_leaf = |leaf: usize, cache: &mut HashMap<usize, Option<usize>>| {
        if let Some(&result) = cache.get(&leaf) {
            return result;
        }
        let mut depth = 0usize;
        let mut current = Some(leaf);
        let mut result = None;
        while let Some(stack) = current {
            let func = thread.stack_func(stack);
            if func == call_node_path[depth] {
                depth += 1;
                if depth == call_node_path.len() {
                    result = Some(stack);
                    break;
                }
                current = thread.stack_table.prefix[stack];
            } else if !func_matches_implementation(thread, func, implementation) {
                current = thread.stack_table.prefix[stack];
            } else {
                break;
            }
        }
        cache.insert(leaf, result);
        result
    };

    let mut samples = thread.samples.clone();
    for stack in samples.stack.iter_mut() {
        *stack = stack.and_then(|s| match_from_leaf(s, &mut match_cache));
    }

    let mut new_thread = thread.clone();
    new_thread.samples = samples;
    new_thread
}

/// Keep only stacks that contain `func_index` somewhere in their ancestry,
/// re-rooted at the first occurrence: everything below a matching ancestor
/// is kept, everything without the function anywhere in the chain is
/// dropped.
pub fn focus_function(thread: &Thread, func_index: IndexIntoFuncTable) -> Thread {
    debug!("focus-function: {} stacks", thread.stack_table.len());

    let stack_table = &thread.stack_table;
    let mut new_stack_table = StackTable::new();
    // "+1" encoding: 0 means none, otherwise new index + 1.
    let mut old_to_new: Vec<u32> = vec![0; stack_table.len()];

    for stack in 0..stack_table.len() {
        let prefix = stack_table.prefix[stack];
        let new_prefix_plus_one = match prefix {
            None => 0,
            Some(p) => old_to_new[p],
        };
        let matches_focus = thread.stack_func(stack) == func_index;

        if new_prefix_plus_one != 0 || matches_focus {
            let new_prefix = if new_prefix_plus_one == 0 {
                None
            } else {
                Some((new_prefix_plus_one - 1) as usize)
            };
            let new_stack = new_stack_table.push(
                new_prefix,
                stack_table.frame[stack],
                stack_table.category[stack],
                stack_table.subcategory[stack],
            );
            old_to_new[stack] = (new_stack + 1) as u32;
        }
    }

    update_thread_stacks(thread, new_stack_table, |old| {
        old.and_then(|s| match old_to_new[s] {
            0 => None,
            plus_one => Some((plus_one - 1) as usize),
        })
    })
}

/// Keep only stack rows whose category equals the target. A dropped
/// stack's descendants re-parent to the nearest kept ancestor, and samples
/// on dropped rows move there too.
pub fn focus_category(thread: &Thread, category: IndexIntoCategoryList) -> Thread {
    debug!(
        "focus-category {}: {} stacks",
        category,
        thread.stack_table.len()
    );

    let stack_table = &thread.stack_table;
    let mut new_stack_table = StackTable::new();
    let mut map = StackMap::new(stack_table.len());

    for stack in 0..stack_table.len() {
        let new_prefix = map.get(stack_table.prefix[stack]);
        if stack_table.category[stack] == category {
            let new_stack = new_stack_table.push(
                new_prefix,
                stack_table.frame[stack],
                stack_table.category[stack],
                stack_table.subcategory[stack],
            );
            map.set(stack, Some(new_stack));
        } else {
            map.set(stack, new_prefix);
        }
    }

    update_thread_stacks(thread, new_stack_table, |old| map.get(old))
}
