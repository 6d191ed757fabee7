//! Transform stack <-> compact URL-safe string.
//!
//! Transforms are joined with `~`, fields within one transform with `-`.
//! Per-type layouts:
//!
//! ```text
//! f-{impl}-{path}[-i]      focus subtree (trailing -i iff inverted)
//! ff-{funcIndex}           focus function
//! fg-{categoryIndex}       focus category
//! mcn-{impl}-{path}        merge call node
//! mf-{funcIndex}           merge function
//! df-{funcIndex}           drop function
//! cr-{impl}-{resourceIndex}-{collapsedFuncIndex}
//! drec-{impl}-{funcIndex}  collapse direct recursion
//! rec-{funcIndex}          collapse recursion
//! cfs-{funcIndex}          collapse function subtree
//! fs-m-{filterString}      filter samples (marker search)
//! ```
//!
//! Parsing is lenient the way URL parsing has to be: an unknown short key
//! or a malformed numeric field drops that one transform with a logged
//! error and parsing continues. It never fails the whole string.

use log::error;

use crate::filters::implementation::ImplementationFilter;
use crate::transforms::{SampleFilterType, Transform, TransformStack};
use crate::utils::config::{FIELD_SEPARATOR, TRANSFORM_SEPARATOR};

// Uint-array codec: each value is written MSB-first in base 16, digits
// drawn from CONTINUATION except the last, drawn from TERMINATION. The
// alphabets are disjoint, so values need no separator, and neither
// contains '-' or '~'.
const CONTINUATION: &[u8; 16] = b"0123456789abcdef";
const TERMINATION: &[u8; 16] = b"ghijklmnopqrstuv";

/// Encode a uint array as a URL-safe string. Lossless and
/// order-preserving.
pub fn encode_uint_array(values: &[usize]) -> String {
    let mut out = String::new();
    for &value in values {
        let mut nibbles = Vec::new();
        let mut v = value;
        loop {
            nibbles.push(v & 0xf);
            v >>= 4;
            if v == 0 {
                break;
            }
        }
        nibbles.reverse();
        let last = nibbles.len() - 1;
        for (i, &n) in nibbles.iter().enumerate() {
            let alphabet = if i == last { TERMINATION } else { CONTINUATION };
            out.push(alphabet[n] as char);
        }
    }
    out
}

/// Decode a string produced by [`encode_uint_array`]. Returns `None` on
/// any character outside the codec alphabets or a dangling value.
pub fn decode_uint_array(s: &str) -> Option<Vec<usize>> {
    let mut values = Vec::new();
    let mut acc: usize = 0;
    let mut in_value = false;
    for b in s.bytes() {
        if let Some(d) = CONTINUATION.iter().position(|&c| c == b) {
            acc = (acc << 4) | d;
            in_value = true;
        } else if let Some(d) = TERMINATION.iter().position(|&c| c == b) {
            values.push((acc << 4) | d);
            acc = 0;
            in_value = false;
        } else {
            return None;
        }
    }
    if in_value {
        // Trailing continuation digits without a terminator.
        return None;
    }
    Some(values)
}

/// Serialize a transform stack.
pub fn stringify_transforms(transforms: &[Transform]) -> String {
    transforms
        .iter()
        .map(stringify_one)
        .collect::<Vec<_>>()
        .join(&TRANSFORM_SEPARATOR.to_string())
}

fn stringify_one(transform: &Transform) -> String {
    match transform {
        Transform::FocusSubtree {
            call_node_path,
            implementation,
            inverted,
        } => {
            let mut s = format!(
                "f-{}-{}",
                implementation.as_url_component(),
                encode_uint_array(call_node_path)
            );
            if *inverted {
                s.push_str("-i");
            }
            s
        }
        Transform::FocusFunction { func_index } => format!("ff-{}", func_index),
        Transform::FocusCategory { category } => format!("fg-{}", category),
        Transform::MergeCallNode {
            call_node_path,
            implementation,
        } => format!(
            "mcn-{}-{}",
            implementation.as_url_component(),
            encode_uint_array(call_node_path)
        ),
        Transform::MergeFunction { func_index } => format!("mf-{}", func_index),
        Transform::DropFunction { func_index } => format!("df-{}", func_index),
        Transform::CollapseResource {
            resource_index,
            collapsed_func_index,
            implementation,
        } => format!(
            "cr-{}-{}-{}",
            implementation.as_url_component(),
            resource_index,
            collapsed_func_index
        ),
        Transform::CollapseDirectRecursion {
            func_index,
            implementation,
        } => format!("drec-{}-{}", implementation.as_url_component(), func_index),
        Transform::CollapseRecursion { func_index } => format!("rec-{}", func_index),
        Transform::CollapseFunctionSubtree { func_index } => format!("cfs-{}", func_index),
        Transform::FilterSamples {
            filter_type,
            filter,
        } => {
            let short = match filter_type {
                SampleFilterType::MarkerSearch => "m",
            };
            format!("fs-{}-{}", short, filter)
        }
    }
}

/// Parse a serialized transform stack. Malformed entries are dropped,
/// never fatal.
pub fn parse_transforms(s: &str) -> TransformStack {
    if s.is_empty() {
        return Vec::new();
    }
    s.split(TRANSFORM_SEPARATOR)
        .filter_map(|segment| {
            let parsed = parse_one(segment);
            if parsed.is_none() {
                error!("dropping unrecognized transform segment: {:?}", segment);
            }
            parsed
        })
        .collect()
}

fn parse_one(segment: &str) -> Option<Transform> {
    let parts: Vec<&str> = segment.split(FIELD_SEPARATOR).collect();
    match *parts.first()? {
        "f" => {
            let inverted = match parts.len() {
                3 => false,
                4 if parts[3] == "i" => true,
                _ => return None,
            };
            Some(Transform::FocusSubtree {
                implementation: ImplementationFilter::from_url_component(parts[1]),
                call_node_path: decode_uint_array(parts[2])?,
                inverted,
            })
        }
        "ff" => Some(Transform::FocusFunction {
            func_index: parse_index(&parts, 1, 2)?,
        }),
        "fg" => Some(Transform::FocusCategory {
            category: parse_index(&parts, 1, 2)?,
        }),
        "mcn" => {
            if parts.len() != 3 {
                return None;
            }
            Some(Transform::MergeCallNode {
                implementation: ImplementationFilter::from_url_component(parts[1]),
                call_node_path: decode_uint_array(parts[2])?,
            })
        }
        "mf" => Some(Transform::MergeFunction {
            func_index: parse_index(&parts, 1, 2)?,
        }),
        "df" => Some(Transform::DropFunction {
            func_index: parse_index(&parts, 1, 2)?,
        }),
        "cr" => {
            if parts.len() != 4 {
                return None;
            }
            Some(Transform::CollapseResource {
                implementation: ImplementationFilter::from_url_component(parts[1]),
                resource_index: parts[2].parse().ok()?,
                collapsed_func_index: parts[3].parse().ok()?,
            })
        }
        "drec" => {
            if parts.len() != 3 {
                return None;
            }
            Some(Transform::CollapseDirectRecursion {
                implementation: ImplementationFilter::from_url_component(parts[1]),
                func_index: parts[2].parse().ok()?,
            })
        }
        "rec" => Some(Transform::CollapseRecursion {
            func_index: parse_index(&parts, 1, 2)?,
        }),
        "cfs" => Some(Transform::CollapseFunctionSubtree {
            func_index: parse_index(&parts, 1, 2)?,
        }),
        "fs" => {
            // The filter string may itself contain '-': everything after
            // the short filter type is rejoined.
            if parts.len() < 3 {
                return None;
            }
            let filter_type = match parts[1] {
                "m" => SampleFilterType::MarkerSearch,
                _ => return None,
            };
            Some(Transform::FilterSamples {
                filter_type,
                filter: parts[2..].join("-"),
            })
        }
        _ => None,
    }
}

fn parse_index(parts: &[&str], at: usize, expected_len: usize) -> Option<usize> {
    if parts.len() != expected_len {
        return None;
    }
    parts[at].parse().ok()
}
