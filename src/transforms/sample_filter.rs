//! The filter-samples transform: drop samples outside marker-derived time
//! ranges.

use log::debug;

use crate::profile::markers::{marker_ranges_matching_search, SearchMatcher};
use crate::profile::tables::Thread;
use crate::transforms::{SampleFilterType, TransformContext};
use crate::utils::error::TransformError;

/// Drop every sample whose time falls outside the union of time ranges
/// selected by the filter. Dropped samples keep their row with a `None`
/// stack so the time axis stays intact.
///
/// For `MarkerSearch`, ranges come from interval markers matching a
/// case-insensitive search over the marker name and searchable payload
/// fields, canonicalized before use. Boundaries are half-open: a sample
/// exactly at a range's start is kept, one exactly at its end is not.
pub fn filter_samples(
    thread: &Thread,
    filter_type: SampleFilterType,
    filter: &str,
    ctx: &TransformContext,
) -> Result<Thread, TransformError> {
    let ranges = match filter_type {
        SampleFilterType::MarkerSearch => {
            let matcher = SearchMatcher::new(filter);
            marker_ranges_matching_search(
                &thread.markers,
                &thread.string_table,
                ctx.marker_schemas,
                &matcher,
            )?
        }
    };
    debug!(
        "filter-samples: {} canonical ranges over {} samples",
        ranges.len(),
        thread.samples.len()
    );

    let mut samples = thread.samples.clone();
    // Sample times are non-decreasing, so one pointer walks the sorted
    // canonical ranges alongside the samples.
    let mut r = 0;
    for i in 0..samples.len() {
        let t = samples.time[i];
        while r < ranges.len() && t >= ranges[r].end {
            r += 1;
        }
        let keep = r < ranges.len() && t >= ranges[r].start;
        if !keep {
            samples.stack[i] = None;
        }
    }

    let mut new_thread = thread.clone();
    new_thread.samples = samples;
    Ok(new_thread)
}
