//! Configuration and constants for the CLI.

/// Current output schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Default number of call-tree rows printed by the `tree` command
pub const DEFAULT_TREE_ROWS: usize = 40;

/// Default flamegraph width in pixels
pub const DEFAULT_FLAMEGRAPH_WIDTH: usize = 1200;

/// Separator between transforms in the serialized transform stack
pub const TRANSFORM_SEPARATOR: char = '~';

/// Separator between fields of a single serialized transform
pub const FIELD_SEPARATOR: char = '-';

// Accepted spellings for the implementation filter in transform strings
// (anything else falls back to "combined")
pub const IMPLEMENTATION_COMBINED: &str = "combined";
pub const IMPLEMENTATION_JS: &str = "js";
pub const IMPLEMENTATION_CPP: &str = "cpp";
