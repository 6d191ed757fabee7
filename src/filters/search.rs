//! Search filtering: keep samples whose stack matches a search string.

use log::debug;

use crate::profile::markers::SearchMatcher;
use crate::profile::tables::Thread;

/// Drop (null out) samples whose stack chain doesn't match `search`
/// anywhere. A stack matches when its own frame matches — by function
/// name, file name, or resource name — or when any ancestor does. The
/// empty string matches everything.
pub fn filter_thread_to_search_string(thread: &Thread, search: &str) -> Thread {
    let matcher = SearchMatcher::new(search);
    if matcher.is_empty() {
        return thread.clone();
    }
    debug!(
        "search filter {:?} over {} stacks",
        search,
        thread.stack_table.len()
    );

    let stack_table = &thread.stack_table;
    let mut matches = vec![false; stack_table.len()];
    for stack in 0..stack_table.len() {
        if stack_table.prefix[stack].map_or(false, |p| matches[p]) {
            matches[stack] = true;
            continue;
        }
        let func = thread.stack_func(stack);
        matches[stack] = matcher.matches(thread.func_name(func))
            || thread.func_table.file_name[func]
                .map_or(false, |f| matcher.matches(thread.string_table.get(f)))
            || thread.func_table.resource[func].map_or(false, |r| {
                matcher.matches(thread.string_table.get(thread.resource_table.name[r]))
            });
    }

    let mut samples = thread.samples.clone();
    for stack in samples.stack.iter_mut() {
        *stack = stack.filter(|&s| matches[s]);
    }

    let mut new_thread = thread.clone();
    new_thread.samples = samples;
    new_thread
}
