//! The memoized view pipeline.
//!
//! Data flows one direction: raw thread -> range-filtered thread ->
//! transform-stack-reduced thread -> implementation-filtered thread ->
//! search-filtered thread -> optionally inverted thread. Each stage is
//! memoized on its direct inputs, and the transform chain is cached per
//! applied transform, so pushing or popping one transform recomputes only
//! the changed suffix. The caches grow without eviction; the number of
//! distinct view states per profile is small.

mod memo;

use std::sync::Arc;

use crate::filters::{
    filter_thread_samples_to_range, filter_thread_to_implementation,
    filter_thread_to_search_string, invert_callstack, ImplementationFilter,
};
use crate::profile::tables::{Milliseconds, Thread};
use crate::transforms::{apply_transform, Transform, TransformContext, TransformStack};
use crate::utils::error::TransformError;
use crate::utils::timing::time_code;
use memo::{thread_key, MemoizedStage};

/// Everything that parameterizes one derived view of a thread.
#[derive(Debug, Clone, Default)]
pub struct ViewOptions {
    /// Committed time window, applied before the transform stack.
    pub range: Option<(Milliseconds, Milliseconds)>,
    pub transforms: TransformStack,
    pub implementation: ImplementationFilter,
    pub search: String,
    pub inverted: bool,
}

struct ChainEntry {
    input_key: usize,
    transform: Transform,
    default_category: usize,
    output: Arc<Thread>,
}

/// Per-transform cache over the reduction chain. Each entry is keyed on
/// the identity of its input thread, the transform, and the default
/// category, so an unchanged prefix of the chain is reused as-is.
#[derive(Default)]
pub struct TransformChainCache {
    entries: Vec<ChainEntry>,
    /// Number of transforms actually applied, for tests and
    /// instrumentation.
    pub applications: usize,
}

impl TransformChainCache {
    pub fn apply(
        &mut self,
        base: Arc<Thread>,
        transforms: &[Transform],
        ctx: &TransformContext,
    ) -> Result<Arc<Thread>, TransformError> {
        let mut current = base;
        for (i, transform) in transforms.iter().enumerate() {
            let reusable = self.entries.get(i).map_or(false, |entry| {
                entry.input_key == thread_key(&current)
                    && entry.transform == *transform
                    && entry.default_category == ctx.default_category
            });
            if reusable {
                current = self.entries[i].output.clone();
                continue;
            }
            self.entries.truncate(i);
            self.applications += 1;
            let output = Arc::new(time_code("apply_transform", || {
                apply_transform(&current, transform, ctx)
            })?);
            self.entries.push(ChainEntry {
                input_key: thread_key(&current),
                transform: transform.clone(),
                default_category: ctx.default_category,
                output: output.clone(),
            });
            current = output;
        }
        self.entries.truncate(transforms.len());
        Ok(current)
    }
}

/// Memoized selectors for one thread's derived views.
pub struct ThreadSelectors {
    base: Arc<Thread>,
    range_stage: MemoizedStage<Option<(Milliseconds, Milliseconds)>>,
    pub transform_chain: TransformChainCache,
    implementation_stage: MemoizedStage<ImplementationFilter>,
    search_stage: MemoizedStage<String>,
    invert_stage: MemoizedStage<bool>,
}

impl ThreadSelectors {
    pub fn new(base: Arc<Thread>) -> Self {
        Self {
            base,
            range_stage: MemoizedStage::default(),
            transform_chain: TransformChainCache::default(),
            implementation_stage: MemoizedStage::default(),
            search_stage: MemoizedStage::default(),
            invert_stage: MemoizedStage::default(),
        }
    }

    pub fn base_thread(&self) -> &Arc<Thread> {
        &self.base
    }

    /// The fully derived thread for `options`. Incremental recomputation:
    /// a call with one more transform pushed reuses every earlier stage.
    pub fn filtered_thread(
        &mut self,
        options: &ViewOptions,
        ctx: &TransformContext,
    ) -> Result<Arc<Thread>, TransformError> {
        let range_filtered = match options.range {
            Some((start, end)) => self
                .range_stage
                .get_or_compute(&self.base, options.range, |thread| {
                    filter_thread_samples_to_range(thread, start, end)
                }),
            None => self.base.clone(),
        };

        let transformed =
            self.transform_chain
                .apply(range_filtered, &options.transforms, ctx)?;

        let implementation_filtered = self.implementation_stage.get_or_compute(
            &transformed,
            options.implementation,
            |thread| filter_thread_to_implementation(thread, options.implementation),
        );

        let search_filtered = self.search_stage.get_or_compute(
            &implementation_filtered,
            options.search.clone(),
            |thread| filter_thread_to_search_string(thread, &options.search),
        );

        if !options.inverted {
            return Ok(search_filtered);
        }
        Ok(self
            .invert_stage
            .get_or_compute(&search_filtered, true, |thread| {
                invert_callstack(thread, ctx.default_category)
            }))
    }
}
