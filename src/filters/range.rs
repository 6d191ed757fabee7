//! Range filtering: restrict a thread to a committed time window.
//!
//! Always applied before the transform stack. Samples are sliced to the
//! window; stacks that end up unreferenced are left in place, which is
//! harmless — they are just unused rows.

use log::debug;

use crate::profile::tables::{Milliseconds, SamplesTable, Thread};

/// Keep the samples with `range_start <= time < range_end`.
pub fn filter_thread_samples_to_range(
    thread: &Thread,
    range_start: Milliseconds,
    range_end: Milliseconds,
) -> Thread {
    let time = &thread.samples.time;
    // Sample times are non-decreasing.
    let begin = time.partition_point(|&t| t < range_start);
    let end = time.partition_point(|&t| t < range_end);
    debug!(
        "range filter [{}, {}): keeping samples {}..{} of {}",
        range_start,
        range_end,
        begin,
        end,
        time.len()
    );

    let samples = SamplesTable {
        stack: thread.samples.stack[begin..end].to_vec(),
        time: thread.samples.time[begin..end].to_vec(),
        weight: thread.samples.weight[begin..end].to_vec(),
    };

    let mut new_thread = thread.clone();
    new_thread.samples = samples;
    new_thread
}
