//! Call-node-path translation through a transform.
//!
//! When a transform is pushed, the selected/expanded call node paths were
//! computed against the pre-transform thread and have to be rewritten to
//! stay valid. Each arm here mirrors the stack-level effect of the
//! corresponding transform; the two must never diverge or the selection
//! desyncs from the tree.

use std::collections::HashSet;

use crate::filters::implementation::func_matches_implementation;
use crate::profile::call_node::CallNodePath;
use crate::profile::tables::Thread;
use crate::transforms::Transform;

/// Rewrite `path` the way `transform` rewrote the thread's stacks.
/// `transformed_thread` is the thread *after* the transform was applied.
pub fn apply_transform_to_call_node_path(
    path: &CallNodePath,
    transform: &Transform,
    transformed_thread: &Thread,
) -> CallNodePath {
    match transform {
        Transform::FocusSubtree {
            call_node_path,
            inverted,
            ..
        } => {
            if *inverted {
                // The focused tree is re-rooted around inverted suffixes;
                // no stable mapping of the old selection exists.
                Vec::new()
            } else if path_starts_with(path, call_node_path) {
                // The focused node stays as the new root.
                path[call_node_path.len() - 1..].to_vec()
            } else {
                Vec::new()
            }
        }
        Transform::FocusFunction { func_index } => match path.iter().position(|f| f == func_index)
        {
            Some(first) => path[first..].to_vec(),
            None => Vec::new(),
        },
        Transform::FocusCategory { .. } => {
            // Funcs with no surviving stack row disappeared from the tree.
            let surviving: HashSet<usize> = (0..transformed_thread.stack_table.len())
                .map(|s| transformed_thread.stack_func(s))
                .collect();
            path.iter()
                .copied()
                .filter(|f| surviving.contains(f))
                .collect()
        }
        Transform::MergeCallNode { call_node_path, .. } => {
            if path_starts_with(path, call_node_path) {
                let mut out = path.clone();
                out.remove(call_node_path.len() - 1);
                out
            } else {
                path.clone()
            }
        }
        Transform::MergeFunction { func_index } => {
            path.iter().copied().filter(|f| f != func_index).collect()
        }
        Transform::DropFunction { func_index } => {
            if path.contains(func_index) {
                Vec::new()
            } else {
                path.clone()
            }
        }
        Transform::CollapseResource {
            resource_index,
            collapsed_func_index,
            ..
        } => {
            let mut out: CallNodePath = Vec::with_capacity(path.len());
            for &func in path {
                let mapped = if transformed_thread.func_table.resource.get(func).copied()
                    == Some(Some(*resource_index))
                {
                    *collapsed_func_index
                } else {
                    func
                };
                // A contiguous run collapses to one node.
                if mapped == *collapsed_func_index && out.last() == Some(collapsed_func_index) {
                    continue;
                }
                out.push(mapped);
            }
            out
        }
        Transform::CollapseDirectRecursion {
            func_index,
            implementation,
        } => {
            let mut out: CallNodePath = Vec::with_capacity(path.len());
            // Transparent funcs seen since the last recursive frame; they
            // survive only if no further recursion swallows them.
            let mut pending: CallNodePath = Vec::new();
            let mut in_chain = false;
            for &func in path {
                if func == *func_index {
                    if in_chain {
                        pending.clear();
                    } else {
                        out.push(func);
                        in_chain = true;
                    }
                } else if in_chain
                    && !func_matches_implementation(transformed_thread, func, *implementation)
                {
                    pending.push(func);
                } else {
                    out.append(&mut pending);
                    out.push(func);
                    in_chain = false;
                }
            }
            out.append(&mut pending);
            out
        }
        Transform::CollapseRecursion { func_index } => {
            let first = path.iter().position(|f| f == func_index);
            let last = path.iter().rposition(|f| f == func_index);
            match (first, last) {
                (Some(first), Some(last)) if last > first => {
                    let mut out = path[..=first].to_vec();
                    out.extend_from_slice(&path[last + 1..]);
                    out
                }
                _ => path.clone(),
            }
        }
        Transform::CollapseFunctionSubtree { func_index } => {
            match path.iter().position(|f| f == func_index) {
                Some(first) => path[..=first].to_vec(),
                None => path.clone(),
            }
        }
        Transform::FilterSamples { .. } => path.clone(),
    }
}

fn path_starts_with(path: &[usize], prefix: &[usize]) -> bool {
    !prefix.is_empty() && path.len() >= prefix.len() && path[..prefix.len()] == *prefix
}
