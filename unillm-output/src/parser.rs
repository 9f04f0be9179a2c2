//! Locating JSON inside model text.
//!
//! Text-mode replies tend to wrap the object in prose or a markdown fence.
//! [`extract_json_from_text`] finds the payload, [`json_candidates`] lists
//! every plausible one, and [`json_start`] finds where a still-growing
//! payload begins, for streaming.

use serde_json::Value as JsonValue;

use crate::error::ObjectError;

/// Extract the JSON payload from model text.
///
/// Tried in order: the whole text, a fenced code block, then the first
/// balanced `{...}` or `[...]` that parses.
///
/// # Example
///
/// ```rust
/// use unillm_output::parser::extract_json_from_text;
///
/// let text = "Sure! ```json\n{\"name\": \"Alice\"}\n``` Anything else?";
/// assert_eq!(extract_json_from_text(text).unwrap(), r#"{"name": "Alice"}"#);
/// ```
pub fn extract_json_from_text(text: &str) -> Result<&str, ObjectError> {
    json_candidates(text)
        .into_iter()
        .next()
        .ok_or_else(no_json)
}

/// Every parseable JSON payload in model text, in preference order.
///
/// The whole text comes first, then a fenced code block, then each balanced
/// `{...}` or `[...]` run by position. Nested runs are candidates too.
#[must_use]
pub fn json_candidates(text: &str) -> Vec<&str> {
    let text = text.trim();
    if parses(text) {
        return vec![text];
    }
    let mut candidates = Vec::new();
    if let Some(body) = fenced_block(text).filter(|b| parses(b)) {
        candidates.push(body);
    }
    let mut runs: Vec<&str> = balanced_runs(text, '{')
        .into_iter()
        .chain(balanced_runs(text, '['))
        .collect();
    runs.sort_by_key(|run| run.as_ptr() as usize);
    for run in runs {
        if !candidates.contains(&run) {
            candidates.push(run);
        }
    }
    candidates
}

/// Parse the JSON payload of model text.
pub fn parse_json_from_text(text: &str) -> Result<JsonValue, ObjectError> {
    let payload = extract_json_from_text(text)?;
    serde_json::from_str(payload).map_err(|e| ObjectError::parse(e.to_string()))
}

/// Parse the first payload of model text that `accept` takes.
///
/// When no candidate is accepted, the error for the first one is returned.
pub fn parse_json_from_text_with<F>(text: &str, accept: F) -> Result<JsonValue, ObjectError>
where
    F: Fn(&JsonValue) -> Result<(), ObjectError>,
{
    let mut first_error = None;
    for candidate in json_candidates(text) {
        let outcome = serde_json::from_str::<JsonValue>(candidate)
            .map_err(|e| ObjectError::parse(e.to_string()))
            .and_then(|value| accept(&value).map(|()| value));
        match outcome {
            Ok(value) => return Ok(value),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    Err(first_error.unwrap_or_else(no_json))
}

/// Slice of `text` from where a JSON payload starts.
///
/// Skips prose and an opening fence; `None` until an opening bracket shows
/// up. With `object_root`, only `{` opens a payload, so bracketed prose
/// ahead of the object is skipped.
#[must_use]
pub fn json_start(text: &str, object_root: bool) -> Option<&str> {
    let start = if object_root {
        text.find('{')?
    } else {
        text.find(['{', '['])?
    };
    let payload = &text[start..];
    // A closing fence may already have arrived.
    Some(payload.find("```").map_or(payload, |end| &payload[..end]))
}

fn no_json() -> ObjectError {
    ObjectError::parse("no JSON object or array found in text")
}

fn parses(text: &str) -> bool {
    serde_json::from_str::<JsonValue>(text).is_ok()
}

/// Body of the first ``` fence, language tag skipped.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after = &text[open + 3..];
    let body_start = after.find('\n').map_or(0, |i| i + 1);
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// Balanced, parseable runs opening with `open`, by start position.
fn balanced_runs(text: &str, open: char) -> Vec<&str> {
    let close = if open == '{' { '}' } else { ']' };
    let mut runs = Vec::new();

    for (start, _) in text.match_indices(open) {
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for (offset, c) in text[start..].char_indices() {
            if in_string {
                match c {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match c {
                '"' => in_string = true,
                c if c == open => depth += 1,
                c if c == close => {
                    depth -= 1;
                    if depth == 0 {
                        let candidate = &text[start..=start + offset];
                        if parses(candidate) {
                            runs.push(candidate);
                        }
                        break;
                    }
                }
                _ => {}
            }
        }
    }
    runs
}
