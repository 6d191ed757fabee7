//! Stacklens
//!
//! Transform pipeline and call-tree analysis for sampled performance
//! profiles.
//!
//! A captured profile (call stacks, samples, markers) is loaded once and
//! then explored through derived views: range filtering, a stack of
//! user-applied call-tree transforms (focus, merge, drop, collapse),
//! implementation and search filtering, and call-tree inversion. Each
//! stage is a pure function from thread to thread, memoized so that
//! incremental changes only recompute what they touch.
//!
//! This crate provides the core implementation for the `stacklens` CLI
//! tool.

pub mod calltree;
pub mod commands;
pub mod filters;
pub mod output;
pub mod profile;
pub mod selectors;
pub mod transforms;
pub mod utils;
