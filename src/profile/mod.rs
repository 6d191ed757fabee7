//! Profile data model: tables, markers, call nodes, and the document
//! schema they are loaded from.

pub mod call_node;
pub mod markers;
pub mod schema;
pub mod tables;

// Re-export main types
pub use call_node::{CallNodeInfo, CallNodePath, CallNodeTable, IndexIntoCallNodeTable};
pub use markers::{
    canonicalize_range_set, marker_ranges_matching_search, MarkerSchema, MarkerTable,
    SearchMatcher, StartEndRange,
};
pub use schema::{document_from_profile, profile_from_document, read_profile, Profile};
pub use tables::{
    default_category_index, Category, FrameTable, FuncTable, IndexIntoCategoryList,
    IndexIntoFrameTable, IndexIntoFuncTable, IndexIntoResourceTable, IndexIntoStackTable,
    IndexIntoStringTable, Milliseconds, ResourceKind, ResourceTable, SamplesTable, StackTable,
    StringTable, Thread,
};
