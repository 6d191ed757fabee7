//! Implementation filtering: classify frames as JS, native, or neither.
//!
//! The predicate is consulted in two places. As a pipeline stage it
//! restricts a thread to matching frames. Inside transforms it decides
//! which ancestor frames are "transparent" while matching a call node
//! path, so a JS-only view can match through interleaved native frames.

use log::debug;

use crate::profile::tables::{IndexIntoFuncTable, StackTable, Thread};
use crate::utils::config::{IMPLEMENTATION_COMBINED, IMPLEMENTATION_CPP, IMPLEMENTATION_JS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImplementationFilter {
    #[default]
    Combined,
    Js,
    Cpp,
}

impl ImplementationFilter {
    /// Parse a URL component. Empty or unrecognized values fall back to
    /// `Combined` so stale URLs keep working.
    pub fn from_url_component(s: &str) -> Self {
        match s {
            IMPLEMENTATION_JS => ImplementationFilter::Js,
            IMPLEMENTATION_CPP => ImplementationFilter::Cpp,
            _ => ImplementationFilter::Combined,
        }
    }

    pub fn as_url_component(self) -> &'static str {
        match self {
            ImplementationFilter::Combined => IMPLEMENTATION_COMBINED,
            ImplementationFilter::Js => IMPLEMENTATION_JS,
            ImplementationFilter::Cpp => IMPLEMENTATION_CPP,
        }
    }
}

/// Does this function match the implementation filter?
///
/// JS matches funcs flagged `is_js` or `relevant_for_js`. C++ matches
/// everything that isn't JS and isn't probable JIT code, where JIT code is
/// detected as a func with no resource whose name starts with `0x`.
pub fn func_matches_implementation(
    thread: &Thread,
    func: IndexIntoFuncTable,
    filter: ImplementationFilter,
) -> bool {
    match filter {
        ImplementationFilter::Combined => true,
        ImplementationFilter::Js => {
            thread.func_table.is_js[func] || thread.func_table.relevant_for_js[func]
        }
        ImplementationFilter::Cpp => {
            if thread.func_table.is_js[func] {
                return false;
            }
            let probably_jit = thread.func_table.resource[func].is_none()
                && thread.func_name(func).starts_with("0x");
            !probably_jit
        }
    }
}

/// Pipeline stage: keep only stacks whose function matches the filter.
/// Children of removed stacks re-parent to their nearest kept ancestor;
/// samples on removed stacks move there too (or to `None` when nothing in
/// the chain matched).
pub fn filter_thread_to_implementation(
    thread: &Thread,
    filter: ImplementationFilter,
) -> Thread {
    if filter == ImplementationFilter::Combined {
        return thread.clone();
    }
    debug!(
        "implementation filter {:?} over {} stacks",
        filter,
        thread.stack_table.len()
    );

    let stack_table = &thread.stack_table;
    let mut new_stack_table = StackTable::new();
    let mut map = crate::transforms::StackMap::new(stack_table.len());

    for stack in 0..stack_table.len() {
        let new_prefix = map.get(stack_table.prefix[stack]);
        if func_matches_implementation(thread, thread.stack_func(stack), filter) {
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

    crate::transforms::update_thread_stacks(thread, new_stack_table, |old| map.get(old))
}
