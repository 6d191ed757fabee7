//! Memoization primitives for the view pipeline.
//!
//! Stages are keyed on reference identity of their input thread (the
//! `Arc` pointer) plus the stage's own parameters. That is enough to
//! detect "nothing changed" cheaply without hashing table contents.

use std::sync::Arc;

use crate::profile::tables::Thread;

/// Identity of a thread value, for memo keys.
pub(crate) fn thread_key(thread: &Arc<Thread>) -> usize {
    Arc::as_ptr(thread) as usize
}

/// A single-entry memo: remembers the last (input, params) pair and its
/// output. Enough for a pipeline stage that is recomputed with the same
/// inputs many times in a row.
pub struct MemoizedStage<P: PartialEq + Clone> {
    last: Option<(usize, P, Arc<Thread>)>,
    /// Number of actual computations, for tests and instrumentation.
    pub computations: usize,
}

impl<P: PartialEq + Clone> Default for MemoizedStage<P> {
    fn default() -> Self {
        Self {
            last: None,
            computations: 0,
        }
    }
}

impl<P: PartialEq + Clone> MemoizedStage<P> {
    pub fn get_or_compute(
        &mut self,
        input: &Arc<Thread>,
        params: P,
        compute: impl FnOnce(&Thread) -> Thread,
    ) -> Arc<Thread> {
        let key = thread_key(input);
        if let Some((last_key, last_params, output)) = &self.last {
            if *last_key == key && *last_params == params {
                return output.clone();
            }
        }
        self.computations += 1;
        let output = Arc::new(compute(input));
        self.last = Some((key, params, output.clone()));
        output
    }
}
