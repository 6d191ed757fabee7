//! Profile document schema: the JSON shape profiles are read from and
//! written to.
//!
//! The document keeps the struct-of-arrays table layout (one JSON array per
//! column) with a shared string array, so files stay compact even for
//! hundreds of thousands of stacks. `Document` structs are pure serde
//! mirrors; conversion into the in-memory [`Profile`] validates column
//! lengths and the stack-table forest invariant up front, so the transform
//! code never has to re-check them.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::profile::markers::{MarkerSchema, MarkerTable};
use crate::profile::tables::{
    Category, FrameTable, FuncTable, ResourceKind, ResourceTable, SamplesTable, StackTable,
    StringTable, Thread,
};
use crate::utils::config::SCHEMA_VERSION;
use crate::utils::error::ProfileError;

/// A loaded profile: category list, marker schemas, and threads, each
/// carrying its own interned string table.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub categories: Vec<Category>,
    pub marker_schemas: HashMap<String, MarkerSchema>,
    /// Sampling interval in milliseconds.
    pub interval: f64,
    pub threads: Vec<Thread>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDocument {
    pub meta: MetaDocument,
    pub shared: SharedDocument,
    pub threads: Vec<ThreadDocument>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaDocument {
    pub version: String,
    pub interval: f64,
    pub categories: Vec<CategoryDocument>,
    #[serde(default)]
    pub marker_schema: Vec<MarkerSchemaDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryDocument {
    pub name: String,
    pub color: String,
    pub subcategories: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerSchemaDocument {
    pub name: String,
    #[serde(default)]
    pub searchable_fields: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedDocument {
    pub string_array: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadDocument {
    pub name: String,
    pub stack_table: StackTableDocument,
    pub frame_table: FrameTableDocument,
    pub func_table: FuncTableDocument,
    pub resource_table: ResourceTableDocument,
    pub samples: SamplesDocument,
    #[serde(default)]
    pub markers: MarkersDocument,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StackTableDocument {
    pub prefix: Vec<Option<usize>>,
    pub frame: Vec<usize>,
    pub category: Vec<usize>,
    pub subcategory: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FrameTableDocument {
    pub func: Vec<usize>,
    pub line: Vec<Option<u32>>,
    pub column: Vec<Option<u32>>,
    pub address: Vec<Option<u64>>,
    pub category: Vec<Option<usize>>,
    pub subcategory: Vec<Option<usize>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuncTableDocument {
    pub name: Vec<usize>,
    pub resource: Vec<Option<usize>>,
    #[serde(rename = "isJS")]
    pub is_js: Vec<bool>,
    #[serde(rename = "relevantForJS")]
    pub relevant_for_js: Vec<bool>,
    pub file_name: Vec<Option<usize>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTableDocument {
    pub name: Vec<usize>,
    pub host: Vec<Option<usize>>,
    #[serde(rename = "type")]
    pub kind: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SamplesDocument {
    pub stack: Vec<Option<usize>>,
    pub time: Vec<f64>,
    pub weight: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MarkersDocument {
    pub name: Vec<usize>,
    pub start_time: Vec<Option<f64>>,
    pub end_time: Vec<Option<f64>>,
    pub data: Vec<Option<Value>>,
}

/// Read and validate a profile document from a file.
pub fn read_profile(path: impl AsRef<Path>) -> Result<Profile, ProfileError> {
    let text = fs::read_to_string(path.as_ref())?;
    let document: ProfileDocument = serde_json::from_str(&text)?;
    profile_from_document(document)
}

/// Convert a parsed document into the in-memory model, validating table
/// shapes as we go.
pub fn profile_from_document(document: ProfileDocument) -> Result<Profile, ProfileError> {
    let categories = document
        .meta
        .categories
        .into_iter()
        .map(|c| Category {
            name: c.name,
            color: c.color,
            subcategories: c.subcategories,
        })
        .collect();

    let marker_schemas = document
        .meta
        .marker_schema
        .into_iter()
        .map(|s| {
            (
                s.name.clone(),
                MarkerSchema {
                    name: s.name,
                    searchable_fields: s.searchable_fields,
                },
            )
        })
        .collect();

    let shared_strings = StringTable::from_strings(document.shared.string_array);

    let mut threads = Vec::with_capacity(document.threads.len());
    for thread_doc in document.threads {
        threads.push(thread_from_document(thread_doc, &shared_strings)?);
    }

    debug!("loaded profile with {} thread(s)", threads.len());
    Ok(Profile {
        categories,
        marker_schemas,
        interval: document.meta.interval,
        threads,
    })
}

fn thread_from_document(
    doc: ThreadDocument,
    shared_strings: &StringTable,
) -> Result<Thread, ProfileError> {
    let stack_table = StackTable {
        prefix: doc.stack_table.prefix,
        frame: doc.stack_table.frame,
        category: doc.stack_table.category,
        subcategory: doc.stack_table.subcategory,
    };
    check_columns(
        "stackTable",
        stack_table.len(),
        &[
            stack_table.frame.len(),
            stack_table.category.len(),
            stack_table.subcategory.len(),
        ],
    )?;
    stack_table.check_invariants()?;

    let frame_table = FrameTable {
        func: doc.frame_table.func,
        line: doc.frame_table.line,
        column: doc.frame_table.column,
        address: doc.frame_table.address,
        category: doc.frame_table.category,
        subcategory: doc.frame_table.subcategory,
    };
    check_columns(
        "frameTable",
        frame_table.len(),
        &[
            frame_table.line.len(),
            frame_table.column.len(),
            frame_table.address.len(),
            frame_table.category.len(),
            frame_table.subcategory.len(),
        ],
    )?;

    let func_table = FuncTable {
        name: doc.func_table.name,
        resource: doc.func_table.resource,
        is_js: doc.func_table.is_js,
        relevant_for_js: doc.func_table.relevant_for_js,
        file_name: doc.func_table.file_name,
    };
    check_columns(
        "funcTable",
        func_table.len(),
        &[
            func_table.resource.len(),
            func_table.is_js.len(),
            func_table.relevant_for_js.len(),
            func_table.file_name.len(),
        ],
    )?;

    let resource_table = ResourceTable {
        name: doc.resource_table.name,
        host: doc.resource_table.host,
        kind: doc
            .resource_table
            .kind
            .iter()
            .map(|k| resource_kind_from_str(k))
            .collect::<Result<Vec<_>, _>>()?,
    };

    let samples = SamplesTable {
        stack: doc.samples.stack,
        time: doc.samples.time,
        weight: doc.samples.weight,
    };
    check_columns(
        "samples",
        samples.len(),
        &[samples.time.len(), samples.weight.len()],
    )?;
    for stack in samples.stack.iter().flatten() {
        if *stack >= stack_table.len() {
            return Err(ProfileError::InvalidFormat(format!(
                "sample references stack {} past stack table length {}",
                stack,
                stack_table.len()
            )));
        }
    }

    let markers = MarkerTable {
        name: doc.markers.name,
        start: doc.markers.start_time,
        end: doc.markers.end_time,
        data: doc.markers.data,
    };
    check_columns(
        "markers",
        markers.len(),
        &[markers.start.len(), markers.end.len(), markers.data.len()],
    )?;

    Ok(Thread {
        name: doc.name,
        stack_table,
        frame_table,
        func_table,
        resource_table,
        samples,
        markers,
        string_table: shared_strings.clone(),
    })
}

fn check_columns(table: &str, expected: usize, lengths: &[usize]) -> Result<(), ProfileError> {
    if lengths.iter().any(|&l| l != expected) {
        return Err(ProfileError::InvalidFormat(format!(
            "{} columns disagree on length (expected {})",
            table, expected
        )));
    }
    Ok(())
}

fn resource_kind_from_str(kind: &str) -> Result<ResourceKind, ProfileError> {
    match kind {
        "library" => Ok(ResourceKind::Library),
        "addon" => Ok(ResourceKind::Addon),
        "webhost" => Ok(ResourceKind::Webhost),
        "otherhost" => Ok(ResourceKind::Otherhost),
        "url" => Ok(ResourceKind::Url),
        other => Err(ProfileError::InvalidFormat(format!(
            "unknown resource type: {}",
            other
        ))),
    }
}

fn resource_kind_to_str(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Library => "library",
        ResourceKind::Addon => "addon",
        ResourceKind::Webhost => "webhost",
        ResourceKind::Otherhost => "otherhost",
        ResourceKind::Url => "url",
    }
}

/// Convert the in-memory model back into a writable document. The shared
/// string array is taken from the first thread (threads that went through
/// transforms may have grown their copy; the longest wins so every index
/// resolves).
pub fn document_from_profile(profile: &Profile) -> ProfileDocument {
    let string_array = profile
        .threads
        .iter()
        .map(|t| t.string_table.strings())
        .max_by_key(|s| s.len())
        .unwrap_or(&[])
        .to_vec();

    ProfileDocument {
        meta: MetaDocument {
            version: SCHEMA_VERSION.to_string(),
            interval: profile.interval,
            categories: profile
                .categories
                .iter()
                .map(|c| CategoryDocument {
                    name: c.name.clone(),
                    color: c.color.clone(),
                    subcategories: c.subcategories.clone(),
                })
                .collect(),
            marker_schema: profile
                .marker_schemas
                .values()
                .map(|s| MarkerSchemaDocument {
                    name: s.name.clone(),
                    searchable_fields: s.searchable_fields.clone(),
                })
                .collect(),
            generated_at: Some(chrono::Utc::now().to_rfc3339()),
        },
        shared: SharedDocument { string_array },
        threads: profile.threads.iter().map(thread_to_document).collect(),
    }
}

fn thread_to_document(thread: &Thread) -> ThreadDocument {
    ThreadDocument {
        name: thread.name.clone(),
        stack_table: StackTableDocument {
            prefix: thread.stack_table.prefix.clone(),
            frame: thread.stack_table.frame.clone(),
            category: thread.stack_table.category.clone(),
            subcategory: thread.stack_table.subcategory.clone(),
        },
        frame_table: FrameTableDocument {
            func: thread.frame_table.func.clone(),
            line: thread.frame_table.line.clone(),
            column: thread.frame_table.column.clone(),
            address: thread.frame_table.address.clone(),
            category: thread.frame_table.category.clone(),
            subcategory: thread.frame_table.subcategory.clone(),
        },
        func_table: FuncTableDocument {
            name: thread.func_table.name.clone(),
            resource: thread.func_table.resource.clone(),
            is_js: thread.func_table.is_js.clone(),
            relevant_for_js: thread.func_table.relevant_for_js.clone(),
            file_name: thread.func_table.file_name.clone(),
        },
        resource_table: ResourceTableDocument {
            name: thread.resource_table.name.clone(),
            host: thread.resource_table.host.clone(),
            kind: thread
                .resource_table
                .kind
                .iter()
                .map(|&k| resource_kind_to_str(k).to_string())
                .collect(),
        },
        samples: SamplesDocument {
            stack: thread.samples.stack.clone(),
            time: thread.samples.time.clone(),
            weight: thread.samples.weight.clone(),
        },
        markers: MarkersDocument {
            name: thread.markers.name.clone(),
            start_time: thread.markers.start.clone(),
            end_time: thread.markers.end.clone(),
            data: thread.markers.data.clone(),
        },
    }
}
