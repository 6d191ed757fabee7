//! Normalization of demangled function names for transform labels.
//!
//! Native function names come out of symbolication with full argument
//! lists and template parameters attached. When we label a transform
//! ("Merge: nsThread::ThreadFunc") only the bare qualified name is
//! useful, so these helpers strip the rest.

/// Remove a trailing parenthesized argument list from a function name,
/// plus the known decorations around it (` const`, ` [clone …]`,
/// leading `static `).
///
/// Scans from the end tracking parenthesis depth so that nested
/// function-pointer arguments don't confuse the cut point. A name that
/// doesn't end in `)` is returned unchanged: it isn't call-shaped.
pub fn strip_function_arguments(name: &str) -> &str {
    // Trailing decorations come after the argument list.
    let mut s = name;
    if s.ends_with(']') {
        if let Some(pos) = s.rfind(" [clone ") {
            s = &s[..pos];
        }
    }
    s = s.strip_suffix(" const").unwrap_or(s);

    if !s.ends_with(')') {
        return s;
    }

    let bytes = s.as_bytes();
    let mut depth = 0usize;
    for i in (1..bytes.len()).rev() {
        match bytes[i] {
            b')' => depth += 1,
            b'(' => {
                depth -= 1;
                if depth == 0 {
                    let stripped = &s[..i];
                    return stripped.strip_prefix("static ").unwrap_or(stripped);
                }
            }
            _ => {}
        }
    }
    s
}

/// Remove angle-bracket-delimited template argument lists, tracking
/// nesting depth.
///
/// A `<` only opens a template when it is not at position 0 and not
/// preceded by a space or a dot; this keeps HTML-looking strings and
/// `<init>`-style method names intact. An unclosed `<` is not a
/// template either: everything from it to the end is kept literally.
pub fn remove_template_information(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut result = String::with_capacity(name.len());
    let mut depth = 0usize;
    // Start of the next literal segment to copy out.
    let mut segment_start = 0usize;
    // Position of the outermost unmatched '<', for the unbalanced case.
    let mut template_start = 0usize;

    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'<' if i > 0 && bytes[i - 1] != b' ' && bytes[i - 1] != b'.' => {
                if depth == 0 {
                    result.push_str(&name[segment_start..i]);
                    template_start = i;
                }
                depth += 1;
            }
            b'>' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    segment_start = i + 1;
                }
            }
            _ => {}
        }
    }

    if depth > 0 {
        result.push_str(&name[template_start..]);
    } else {
        result.push_str(&name[segment_start..]);
    }
    result
}

/// Full normalization: arguments stripped first, then templates.
pub fn get_function_name(name: &str) -> String {
    remove_template_information(strip_function_arguments(name))
}
