//! Thread-level filters surrounding the transform stack in the pipeline:
//! range restriction before it, implementation/search filtering and
//! inversion after it.

pub mod implementation;
pub mod invert;
pub mod range;
pub mod search;

pub use implementation::{
    filter_thread_to_implementation, func_matches_implementation, ImplementationFilter,
};
pub use invert::invert_callstack;
pub use range::filter_thread_samples_to_range;
pub use search::filter_thread_to_search_string;
