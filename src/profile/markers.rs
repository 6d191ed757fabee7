//! Marker table and marker-derived time ranges.
//!
//! Markers annotate a thread's timeline. Interval markers (both start and
//! end present) can drive the `filter-samples` transform: a marker search
//! selects markers, their intervals become a canonical range set, and
//! samples outside that set are dropped.

use log::debug;
use regex::RegexBuilder;
use serde_json::Value;
use std::collections::HashMap;

use crate::profile::tables::{IndexIntoStringTable, Milliseconds, StringTable};
use crate::utils::error::TransformError;

/// One row per marker. Instant markers have only `start`; interval markers
/// have both `start` and `end`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerTable {
    pub name: Vec<IndexIntoStringTable>,
    pub start: Vec<Option<Milliseconds>>,
    pub end: Vec<Option<Milliseconds>>,
    pub data: Vec<Option<Value>>,
}

impl MarkerTable {
    pub fn len(&self) -> usize {
        self.name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    pub fn push(
        &mut self,
        name: IndexIntoStringTable,
        start: Option<Milliseconds>,
        end: Option<Milliseconds>,
        data: Option<Value>,
    ) {
        self.name.push(name);
        self.start.push(start);
        self.end.push(end);
        self.data.push(data);
    }
}

/// Which payload fields of one marker type may be matched by a search.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSchema {
    pub name: String,
    pub searchable_fields: Vec<String>,
}

/// A half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartEndRange {
    pub start: Milliseconds,
    pub end: Milliseconds,
}

/// Case-insensitive marker/stack search. The string is tried as a regular
/// expression first; when it doesn't compile it degrades to a plain
/// substring match. The empty string matches everything.
#[derive(Debug, Clone)]
pub struct SearchMatcher {
    regex: Option<regex::Regex>,
    needle: String,
}

impl SearchMatcher {
    pub fn new(search: &str) -> Self {
        let regex = if search.is_empty() {
            None
        } else {
            RegexBuilder::new(search)
                .case_insensitive(true)
                .build()
                .ok()
        };
        Self {
            regex,
            needle: search.to_lowercase(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    pub fn matches(&self, text: &str) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        match &self.regex {
            Some(re) => re.is_match(text),
            None => text.to_lowercase().contains(&self.needle),
        }
    }
}

/// Sort ranges, drop empty/invalid ones, and merge overlapping or adjacent
/// neighbors. The union of the output equals the union of the input.
pub fn canonicalize_range_set(mut ranges: Vec<StartEndRange>) -> Vec<StartEndRange> {
    ranges.retain(|r| r.start < r.end);
    ranges.sort_by(|a, b| {
        a.start
            .partial_cmp(&b.start)
            .expect("range bounds must not be NaN")
    });

    let mut canonical: Vec<StartEndRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match canonical.last_mut() {
            Some(last) if range.start <= last.end => {
                if range.end > last.end {
                    last.end = range.end;
                }
            }
            _ => canonical.push(range),
        }
    }
    canonical
}

/// Collect the canonical set of time ranges covered by interval markers
/// matching `matcher`.
///
/// The search looks at the marker name and, through the schema named by the
/// payload's `type` field, at the payload's searchable fields. A payload
/// naming a schema that isn't in `schema_by_name` is a profile/schema
/// mismatch and a hard error.
pub fn marker_ranges_matching_search(
    markers: &MarkerTable,
    string_table: &StringTable,
    schema_by_name: &HashMap<String, MarkerSchema>,
    matcher: &SearchMatcher,
) -> Result<Vec<StartEndRange>, TransformError> {
    let mut ranges = Vec::new();
    for i in 0..markers.len() {
        // Only interval markers produce a range.
        let (start, end) = match (markers.start[i], markers.end[i]) {
            (Some(start), Some(end)) => (start, end),
            _ => continue,
        };
        if marker_matches(markers, string_table, schema_by_name, matcher, i)? {
            ranges.push(StartEndRange { start, end });
        }
    }
    debug!(
        "marker search selected {} interval ranges out of {} markers",
        ranges.len(),
        markers.len()
    );
    Ok(canonicalize_range_set(ranges))
}

fn marker_matches(
    markers: &MarkerTable,
    string_table: &StringTable,
    schema_by_name: &HashMap<String, MarkerSchema>,
    matcher: &SearchMatcher,
    index: usize,
) -> Result<bool, TransformError> {
    if matcher.matches(string_table.get(markers.name[index])) {
        return Ok(true);
    }

    let payload = match &markers.data[index] {
        Some(Value::Object(fields)) => fields,
        _ => return Ok(false),
    };
    let schema_name = match payload.get("type").and_then(Value::as_str) {
        Some(name) => name,
        None => return Ok(false),
    };
    let schema = schema_by_name
        .get(schema_name)
        .ok_or_else(|| TransformError::MissingMarkerSchema(schema_name.to_string()))?;

    for field in &schema.searchable_fields {
        let matched = match payload.get(field) {
            Some(Value::String(s)) => matcher.matches(s),
            Some(Value::Number(n)) => matcher.matches(&n.to_string()),
            _ => false,
        };
        if matched {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: f64, end: f64) -> StartEndRange {
        StartEndRange { start, end }
    }

    #[test]
    fn canonicalize_merges_overlapping() {
        assert_eq!(
            canonicalize_range_set(vec![range(1.0, 6.0), range(3.0, 6.0)]),
            vec![range(1.0, 6.0)]
        );
    }

    #[test]
    fn canonicalize_merges_adjacent() {
        assert_eq!(
            canonicalize_range_set(vec![range(1.0, 3.0), range(3.0, 6.0)]),
            vec![range(1.0, 6.0)]
        );
    }

    #[test]
    fn canonicalize_drops_empty() {
        assert_eq!(
            canonicalize_range_set(vec![range(1.0, 3.0), range(6.0, 6.0)]),
            vec![range(1.0, 3.0)]
        );
    }

    #[test]
    fn canonicalize_sorts_by_start() {
        assert_eq!(
            canonicalize_range_set(vec![range(5.0, 7.0), range(0.0, 2.0)]),
            vec![range(0.0, 2.0), range(5.0, 7.0)]
        );
    }

    #[test]
    fn search_matcher_substring_and_regex() {
        let plain = SearchMatcher::new("paint");
        assert!(plain.matches("RefreshDriver Paint"));
        assert!(!plain.matches("GC Slice"));

        let re = SearchMatcher::new("^GC.*Slice$");
        assert!(re.matches("GC Minor Slice"));
        assert!(!re.matches("Slice GC"));

        let empty = SearchMatcher::new("");
        assert!(empty.matches("anything"));
    }

    #[test]
    fn missing_schema_is_an_error() {
        let mut strings = StringTable::new();
        let name = strings.index_for_string("DOMEvent");
        let mut markers = MarkerTable::default();
        markers.push(
            name,
            Some(1.0),
            Some(2.0),
            Some(serde_json::json!({ "type": "DOMEvent", "eventType": "click" })),
        );

        let schemas = HashMap::new();
        let matcher = SearchMatcher::new("click");
        let result = marker_ranges_matching_search(&markers, &strings, &schemas, &matcher);
        assert!(matches!(
            result,
            Err(TransformError::MissingMarkerSchema(_))
        ));
    }

    #[test]
    fn payload_fields_are_searched_through_schema() {
        let mut strings = StringTable::new();
        let name = strings.index_for_string("DOMEvent");
        let mut markers = MarkerTable::default();
        markers.push(
            name,
            Some(1.0),
            Some(2.0),
            Some(serde_json::json!({ "type": "DOMEvent", "eventType": "click" })),
        );

        let mut schemas = HashMap::new();
        schemas.insert(
            "DOMEvent".to_string(),
            MarkerSchema {
                name: "DOMEvent".to_string(),
                searchable_fields: vec!["eventType".to_string()],
            },
        );
        let matcher = SearchMatcher::new("click");
        let ranges =
            marker_ranges_matching_search(&markers, &strings, &schemas, &matcher).unwrap();
        assert_eq!(ranges, vec![range(1.0, 2.0)]);
    }
}
