//! Timing instrumentation for long-running operations.
//!
//! Transforms are synchronous and uncancellable, so the way to observe a
//! slow one is to wrap it and log how long it took.

use log::debug;
use std::time::Instant;

/// Run `f`, logging its wall-clock duration at debug level.
pub fn time_code<T>(label: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    debug!("{} took {:?}", label, start.elapsed());
    result
}
