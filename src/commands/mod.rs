//! CLI command implementations.
//!
//! Commands orchestrate the library components to perform user tasks.

pub mod view;

// Re-export main command functions
pub use view::{
    execute_filter, execute_flamegraph, execute_transforms, execute_tree, parse_range,
    validate_args, ViewArgs,
};
