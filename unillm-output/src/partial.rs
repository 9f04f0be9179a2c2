//! Best-effort parsing of JSON that is still streaming in.
//!
//! Repair closes brackets that are still open and drops a dangling comma or
//! colon. It never closes an unterminated string: a string cut mid-token
//! would surface as a wrong value (`"Lasa"` for `"Lasagna"`), so such input
//! stays [`PartialParse::Failed`] until the closing quote arrives. A number
//! at the very end is held back the same way (`3` may become `30`).

use serde_json::Value as JsonValue;

/// Outcome of [`parse_partial_json`].
#[derive(Debug, Clone, PartialEq)]
pub enum PartialParse {
    /// The text is complete, valid JSON.
    Successful(JsonValue),
    /// The text parsed after closing open containers.
    Repaired(JsonValue),
    /// The text cannot be interpreted yet.
    Failed(String),
}

impl PartialParse {
    /// The parsed value, repaired or not.
    #[must_use]
    pub fn value(&self) -> Option<&JsonValue> {
        match self {
            Self::Successful(v) | Self::Repaired(v) => Some(v),
            Self::Failed(_) => None,
        }
    }

    /// Consume into the parsed value.
    #[must_use]
    pub fn into_value(self) -> Option<JsonValue> {
        match self {
            Self::Successful(v) | Self::Repaired(v) => Some(v),
            Self::Failed(_) => None,
        }
    }

    /// Whether nothing could be parsed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Parse possibly truncated JSON.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use unillm_output::{parse_partial_json, PartialParse};
///
/// assert!(parse_partial_json(r#"{"name": "Lasa"#).is_failed());
/// assert_eq!(
///     parse_partial_json(r#"{"name": "Lasagna", "tags": ["pasta""#),
///     PartialParse::Repaired(json!({"name": "Lasagna", "tags": ["pasta"]})),
/// );
/// ```
#[must_use]
pub fn parse_partial_json(text: &str) -> PartialParse {
    let text = text.trim();
    if text.is_empty() {
        return PartialParse::Failed("empty input".to_string());
    }
    let strict_error = match serde_json::from_str::<JsonValue>(text) {
        Ok(value) => return PartialParse::Successful(value),
        Err(e) => e.to_string(),
    };

    match repair(text) {
        Some(fixed) => match serde_json::from_str::<JsonValue>(&fixed) {
            Ok(value) => PartialParse::Repaired(value),
            Err(_) => PartialParse::Failed(strict_error),
        },
        None => PartialParse::Failed(strict_error),
    }
}

/// Close open containers; `None` when the text ends inside a string or a
/// number.
fn repair(text: &str) -> Option<String> {
    let mut closers = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
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
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                closers.pop()?;
            }
            _ => {}
        }
    }
    if in_string || closers.is_empty() || ends_in_number(text) {
        return None;
    }

    let mut fixed = text.trim_end().trim_end_matches([',', ':']).trim_end();
    // A key with no value yet: `{"a": 1, "b"`.
    if closers.last() == Some(&'}') {
        if let Some(key_start) = dangling_key(fixed) {
            fixed = fixed[..key_start].trim_end().trim_end_matches(',').trim_end();
        }
    }

    let mut fixed = fixed.to_string();
    fixed.extend(closers.iter().rev());
    Some(fixed)
}

/// Whether `text` ends with a number that more input could extend.
fn ends_in_number(text: &str) -> bool {
    let text = text.trim_end();
    let token_start = text
        .rfind(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')))
        .map_or(0, |i| i + 1);
    let token = &text[token_start..];
    let starts_number = token.starts_with(|c: char| c.is_ascii_digit() || c == '-');
    let in_value_position = matches!(text[..token_start].trim_end().chars().last(), Some(':' | ',' | '['));
    starts_number && in_value_position
}

/// Start of the trailing string of `text` if it sits in key position.
fn dangling_key(text: &str) -> Option<usize> {
    let body = text.strip_suffix('"')?;
    let open = body.rfind('"')?;
    matches!(text[..open].trim_end().chars().last(), Some('{' | ',')).then_some(open)
}
