//! Literal-accurate parsing of rule-invocation metadata blocks.
//!
//! Package metadata files contain one or two rule-invocation shaped blocks:
//!
//! ```text
//! artifact(
//!     group_id = "com.blah",
//!     artifact_id = "base",
//!     version = "1.2.3",
//! )
//!
//! artifact_update(
//!     version_increment_strategy = "minor",
//! )
//! ```
//!
//! [`parse_artifact_attributes`] extracts the attribute values of both blocks
//! (the update block wins on conflicts) together with the exact byte span of
//! each literal in the original buffer, so a consumer can later replace an
//! individual value without reparsing. Spans are inclusive and absolute.
//!
//! Consumers that edit the buffer through those spans must go through
//! [`apply_edits`], which applies replacements highest-offset-first against
//! the original immutable buffer - editing lowest-first would invalidate
//! every span after the first edit.

pub mod artifact;
pub mod literal;

use std::collections::HashMap;

use crate::core::RelgenError;
pub use literal::LiteralValue;

/// Current and legacy names of the artifact definition block.
const ARTIFACT_BLOCK_NAMES: [&str; 2] = ["artifact", "maven_artifact"];
/// Current and legacy names of the artifact update block.
const ARTIFACT_UPDATE_BLOCK_NAMES: [&str; 2] = ["artifact_update", "maven_artifact_update"];

/// Attribute values and the byte spans of their literal text.
#[derive(Debug, Default, Clone)]
pub struct ParsedAttributes {
    values: HashMap<String, LiteralValue>,
    spans: HashMap<String, (usize, usize)>,
}

impl ParsedAttributes {
    pub fn get(&self, name: &str) -> Option<&LiteralValue> {
        self.values.get(name)
    }

    /// The inclusive, absolute byte span of the attribute's literal text in
    /// the buffer the attributes were parsed from.
    pub fn span(&self, name: &str) -> Option<(usize, usize)> {
        self.spans.get(name).copied()
    }

    pub fn str_value(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(LiteralValue::as_str)
    }

    pub fn bool_value(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(LiteralValue::as_bool)
    }

    pub fn str_list_value(&self, name: &str) -> Option<Vec<String>> {
        let items = self.get(name)?.as_str_list()?;
        Some(items.into_iter().map(str::to_string).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Merges `other` into `self`; attributes in `other` win.
    fn merge(&mut self, other: ParsedAttributes) {
        self.values.extend(other.values);
        self.spans.extend(other.spans);
    }

    /// Shifts every span by `offset`, moving block-relative spans into the
    /// coordinate space of the original buffer.
    fn shift(&mut self, offset: usize) {
        for span in self.spans.values_mut() {
            *span = (span.0 + offset, span.1 + offset);
        }
    }
}

/// A located function-call block: the byte offset of the name and the block
/// text through the terminating `)`.
#[derive(Debug)]
pub struct FunctionBlock<'a> {
    pub start: usize,
    pub text: &'a str,
}

/// Finds the block for the given function name: the name must sit at the
/// start of a line (preceded only by whitespace), followed by optional
/// whitespace and `(`.
///
/// The block terminator is the first `)` after the function name, found by a
/// naive forward scan. This is a known, deliberate limitation: the scan is
/// not depth-aware across nested call arguments, so a nested function-call
/// literal containing `)` truncates the block early. Do not "fix" this
/// without treating it as a behavior change in its own right.
pub fn find_function_block<'a>(
    content: &'a str,
    function_name: &str,
) -> Result<Option<FunctionBlock<'a>>, RelgenError> {
    let bytes = content.as_bytes();
    let mut from = 0;
    while let Some(rel) = content[from..].find(function_name) {
        let start = from + rel;
        from = start + 1;
        if !preceded_only_by_whitespace(bytes, start) {
            continue;
        }
        // optional whitespace, then the opening paren
        let mut i = start + function_name.len();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'(' {
            continue;
        }
        let name_end = start + function_name.len();
        return match content[name_end..].find(')') {
            Some(rel_end) => Ok(Some(FunctionBlock {
                start,
                text: &content[start..=name_end + rel_end],
            })),
            None => Err(RelgenError::UnterminatedBlock {
                name: function_name.to_string(),
            }),
        };
    }
    Ok(None)
}

fn preceded_only_by_whitespace(bytes: &[u8], start: usize) -> bool {
    let mut i = start;
    while i > 0 {
        i -= 1;
        match bytes[i] {
            b'\n' => return true,
            b' ' | b'\t' | b'\r' => {}
            _ => return false,
        }
    }
    true
}

/// Parses `name = literal` attributes out of the given content.
///
/// The scan maintains four independent counters/flags: inside-string (toggled
/// on an unescaped quote while all nesting counters are zero), list depth,
/// mapping depth and call depth. A value ends at a top-level `,` or at the
/// `)` that closes the enclosing rule call; trailing whitespace before the
/// delimiter is excluded from the recorded span.
pub fn parse_attributes(content: &str) -> Result<ParsedAttributes, RelgenError> {
    let mut result = ParsedAttributes::default();
    let mut search_from = 0;
    while let Some(rel) = content[search_from..].find('=') {
        let equals = search_from + rel;
        let name_start = find_name_start(content.as_bytes(), equals);
        let name = content[name_start..equals].trim();
        let (value_start, value_end, next) = find_value_span(content, equals)?;
        let literal_text = &content[value_start..=value_end];
        let value = literal::evaluate(literal_text)?;
        result.values.insert(name.to_string(), value);
        result.spans.insert(name.to_string(), (value_start, value_end));
        search_from = next;
    }
    Ok(result)
}

/// Parses the `artifact(...)` block (legacy alias `maven_artifact`) and, if
/// present, the `artifact_update(...)` block (legacy alias
/// `maven_artifact_update`). Update attributes overwrite base attributes;
/// all spans are absolute in `content`.
///
/// Fails when neither the current nor the legacy definition block is found.
pub fn parse_artifact_attributes(content: &str) -> Result<ParsedAttributes, RelgenError> {
    let mut base = None;
    for name in ARTIFACT_BLOCK_NAMES {
        if let Some(block) = find_function_block(content, name)? {
            base = Some(block);
            break;
        }
    }
    let Some(block) = base else {
        return Err(RelgenError::MetadataBlockNotFound {
            expected: ARTIFACT_BLOCK_NAMES[0],
            legacy: ARTIFACT_BLOCK_NAMES[1],
        });
    };
    let mut attributes = parse_attributes(block.text)?;
    attributes.shift(block.start);

    for name in ARTIFACT_UPDATE_BLOCK_NAMES {
        if let Some(update_block) = find_function_block(content, name)? {
            let mut update_attributes = parse_attributes(update_block.text)?;
            update_attributes.shift(update_block.start);
            attributes.merge(update_attributes);
            break;
        }
    }
    Ok(attributes)
}

/// Applies span replacements against the original immutable buffer.
///
/// Edits are applied highest-offset-first so that every span, all computed
/// against the same original buffer, stays valid while earlier text is
/// rewritten. Spans are inclusive, as produced by [`parse_attributes`].
pub fn apply_edits(content: &str, edits: &[((usize, usize), String)]) -> String {
    let mut sorted: Vec<&((usize, usize), String)> = edits.iter().collect();
    sorted.sort_by(|a, b| b.0.0.cmp(&a.0.0));
    let mut result = content.to_string();
    for ((start, end), replacement) in sorted {
        result = format!("{}{}{}", &result[..*start], replacement, &result[end + 1..]);
    }
    result
}

fn find_name_start(bytes: &[u8], equals: usize) -> usize {
    let mut within_name = false;
    let mut i = equals;
    while i > 0 {
        i -= 1;
        match bytes[i] {
            b' ' | b'\t' | b'\n' | b'\r' => {
                if within_name {
                    return i + 1;
                }
            }
            _ => within_name = true,
        }
    }
    0
}

/// Returns the inclusive span of the value following the `=` at `equals`,
/// plus the offset to continue scanning from.
fn find_value_span(
    content: &str,
    equals: usize,
) -> Result<(usize, usize, usize), RelgenError> {
    let bytes = content.as_bytes();
    let mut within_string = false;
    let mut list_level: u32 = 0;
    let mut dict_level: u32 = 0;
    let mut call_level: u32 = 0;
    let mut value_start = None;
    let mut delimiter = None;
    let mut i = equals + 1;
    while i < bytes.len() {
        let c = bytes[i];
        if value_start.is_none() {
            if c.is_ascii_whitespace() {
                i += 1;
                continue;
            }
            value_start = Some(i);
        }
        let nesting = list_level + dict_level + call_level;
        let mut is_target_end = false;
        match c {
            b'"' | b'\'' => {
                if nesting == 0 && bytes[i - 1] != b'\\' {
                    within_string = !within_string;
                }
            }
            b'[' if !within_string && dict_level + call_level == 0 => list_level += 1,
            b']' if !within_string && dict_level + call_level == 0 => {
                list_level = decrement(list_level, content, equals)?;
            }
            b'{' if !within_string && list_level + call_level == 0 => dict_level += 1,
            b'}' if !within_string && list_level + call_level == 0 => {
                dict_level = decrement(dict_level, content, equals)?;
            }
            b'(' if !within_string && list_level + dict_level == 0 => call_level += 1,
            b')' if !within_string && list_level + dict_level == 0 => {
                if call_level > 0 {
                    call_level -= 1;
                } else {
                    // the paren that closes the enclosing rule call
                    is_target_end = true;
                }
            }
            _ => {}
        }
        if (c == b',' || is_target_end)
            && !within_string
            && list_level + dict_level + call_level == 0
        {
            delimiter = Some(i);
            break;
        }
        i += 1;
    }

    let start = value_start.ok_or_else(|| empty_value_error(content, equals))?;
    let delim = delimiter.unwrap_or(bytes.len());
    // exclude trailing whitespace from the span
    let mut end = delim;
    loop {
        if end == start {
            return Err(empty_value_error(content, equals));
        }
        end -= 1;
        if !bytes[end].is_ascii_whitespace() {
            break;
        }
    }
    // keep the span on a character boundary for multi-byte text
    while !content.is_char_boundary(end + 1) {
        end += 1;
    }
    Ok((start, end, delim))
}

fn decrement(level: u32, content: &str, equals: usize) -> Result<u32, RelgenError> {
    level
        .checked_sub(1)
        .ok_or_else(|| RelgenError::InvalidLiteral {
            text: content[equals..].trim().chars().take(60).collect(),
            reason: "unbalanced closing delimiter".to_string(),
        })
}

fn empty_value_error(content: &str, equals: usize) -> RelgenError {
    RelgenError::InvalidLiteral {
        text: content[equals..].trim().chars().take(60).collect(),
        reason: "attribute has no value".to_string(),
    }
}
