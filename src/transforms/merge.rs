//! Merge and drop transforms: splice single nodes out of the tree, elide
//! a function everywhere, or drop samples containing a function.

use log::debug;

use crate::filters::implementation::{func_matches_implementation, ImplementationFilter};
use crate::profile::call_node::CallNodePath;
use crate::profile::tables::{IndexIntoFuncTable, StackTable, Thread};
use crate::transforms::{update_thread_stacks, StackMap};

const BROKEN: i64 = -1;

/// Remove exactly the call node matching `call_node_path`, splicing its
/// children up to its parent: stacks below it keep their own frame but
/// point at their grandparent. Frames filtered out by the implementation
/// filter don't block the path match.
pub fn merge_call_node(
    thread: &Thread,
    call_node_path: &CallNodePath,
    implementation: ImplementationFilter,
) -> Thread {
    if call_node_path.is_empty() {
        return thread.clone();
    }
    debug!(
        "merge-call-node: path depth {}, {} stacks",
        call_node_path.len(),
        thread.stack_table.len()
    );

    let stack_table = &thread.stack_table;
    let path_len = call_node_path.len() as i64;
    let mut new_stack_table = StackTable::new();
    let mut map = StackMap::new(stack_table.len());
    // Matched depth along the chain; path_len means "at or below the
    // merged node", where no further matching happens.
    let mut matched_depth: Vec<i64> = vec![BROKEN; stack_table.len()];

    for stack in 0..stack_table.len() {
        let prefix = stack_table.prefix[stack];
        let new_prefix = map.get(prefix);
        let prefix_depth = match prefix {
            None => 0,
            Some(p) => matched_depth[p],
        };

        let mut emit = true;
        if prefix_depth != BROKEN && prefix_depth < path_len {
            let func = thread.stack_func(stack);
            if func == call_node_path[prefix_depth as usize] {
                let depth = prefix_depth + 1;
                matched_depth[stack] = depth;
                if depth == path_len {
                    // The matching node: children re-parent to its parent.
                    map.set(stack, new_prefix);
                    emit = false;
                }
            } else if !func_matches_implementation(thread, func, implementation) {
                matched_depth[stack] = prefix_depth;
            } else {
                matched_depth[stack] = BROKEN;
            }
        } else {
            matched_depth[stack] = prefix_depth;
        }

        if emit {
            let new_stack = new_stack_table.push(
                new_prefix,
                stack_table.frame[stack],
                stack_table.category[stack],
                stack_table.subcategory[stack],
            );
            map.set(stack, Some(new_stack));
        }
    }

    update_thread_stacks(thread, new_stack_table, |old| map.get(old))
}

/// Elide every stack whose frame's function is `func_index`; its children
/// re-parent to the nearest surviving ancestor. Applies everywhere in the
/// tree, not just one path.
pub fn merge_function(thread: &Thread, func_index: IndexIntoFuncTable) -> Thread {
    debug!("merge-function: {} stacks", thread.stack_table.len());

    let stack_table = &thread.stack_table;
    let mut new_stack_table = StackTable::new();
    let mut map = StackMap::new(stack_table.len());

    for stack in 0..stack_table.len() {
        let new_prefix = map.get(stack_table.prefix[stack]);
        if thread.stack_func(stack) == func_index {
            map.set(stack, new_prefix);
        } else {
            let new_stack = new_stack_table.push(
                new_prefix,
                stack_table.frame[stack],
                stack_table.category[stack],
                stack_table.subcategory[stack],
            );
            map.set(stack, Some(new_stack));
        }
    }

    update_thread_stacks(thread, new_stack_table, |old| map.get(old))
}

/// Drop every sample whose stack contains `func_index` anywhere in its
/// ancestry. The stack table is left alone; only the samples change, so
/// the table is shared structurally.
pub fn drop_function(thread: &Thread, func_index: IndexIntoFuncTable) -> Thread {
    debug!("drop-function: {} stacks", thread.stack_table.len());

    let stack_table = &thread.stack_table;
    let mut contains_func = vec![false; stack_table.len()];
    for stack in 0..stack_table.len() {
        let inherited = stack_table.prefix[stack].map_or(false, |p| contains_func[p]);
        contains_func[stack] = inherited || thread.stack_func(stack) == func_index;
    }

    update_thread_stacks(thread, stack_table.clone(), |old| {
        old.filter(|&s| !contains_func[s])
    })
}
