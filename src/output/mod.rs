//! Output writers: filtered profile documents and flamegraphs.

pub mod flamegraph;
pub mod json;

pub use flamegraph::{write_flamegraph, FlamegraphConfig};
pub use json::write_profile;
