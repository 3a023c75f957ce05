//! Value transformations, template rendering and validation.
//!
//! Transformations run after extraction and before validation, in the fixed
//! order the pipeline applies them. All functions are pure; template
//! rendering sees the context only through the lookup closure it is given.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};

use crate::config::{Transformation, ValueAs};

/// Failure of a single transformation or rendering step.
pub struct TransformError(pub String);

impl std::fmt::Display for TransformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for TransformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for TransformError {}

/// Apply one canonical transformation.
///
/// `CUSTOM` renders `expression` as a template; `#fieldName` placeholders
/// resolve through `lookup` (previously stored fields only) and undefined
/// placeholders render empty.
pub fn apply(
    transformation: Transformation,
    value: &str,
    expression: Option<&str>,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<String, TransformError> {
    match transformation {
        Transformation::Uppercase => Ok(value.to_uppercase()),
        Transformation::Lowercase => Ok(value.to_lowercase()),
        Transformation::Trim => Ok(value.trim().to_string()),
        Transformation::Base64Encode => Ok(BASE64.encode(value.as_bytes())),
        Transformation::Base64Decode => {
            let bytes = BASE64
                .decode(value.as_bytes())
                .map_err(|e| TransformError(format!("invalid base64: {e}")))?;
            String::from_utf8(bytes).map_err(|e| TransformError(format!("invalid utf-8: {e}")))
        }
        Transformation::UrlEncode => Ok(url_encode(value)),
        Transformation::UrlDecode => url_decode(value),
        Transformation::HashSha256 => Ok(sha256_hex(value)),
        Transformation::Custom => {
            let template = expression
                .ok_or_else(|| TransformError("CUSTOM transformation without expression".into()))?;
            Ok(render_template(template, lookup))
        }
    }
}

/// UTF-8 percent-encoding; every non-alphanumeric byte is escaped.
pub fn url_encode(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

/// Percent-decoding back to UTF-8.
pub fn url_decode(value: &str) -> Result<String, TransformError> {
    percent_decode_str(value)
        .decode_utf8()
        .map(|c| c.into_owned())
        .map_err(|e| TransformError(format!("invalid percent-encoding: {e}")))
}

/// Lowercase hex SHA-256 digest.
pub fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Render a template, replacing `#fieldName` placeholders via `lookup`.
///
/// Placeholder names are runs of `[A-Za-z0-9_]` following a `#`. A `#` not
/// followed by such a character is kept literally. Undefined placeholders
/// render as the empty string.
pub fn render_template(template: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if c != '#' {
            out.push(c);
            continue;
        }
        let mut name = String::new();
        while let Some(&(_, next)) = chars.peek() {
            if next.is_ascii_alphanumeric() || next == '_' {
                name.push(next);
                chars.next();
            } else {
                break;
            }
        }
        if name.is_empty() {
            out.push('#');
        } else if let Some(value) = lookup(&name) {
            out.push_str(&value);
        }
    }
    out
}

/// Evaluate a condition template: truthy when the rendered text is non-empty
/// and not the literal `false`.
pub fn evaluate_condition(
    condition: Option<&str>,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> bool {
    match condition {
        None => true,
        Some(template) => {
            let rendered = render_template(template, lookup);
            !rendered.is_empty() && rendered != "false"
        }
    }
}

/// Render a value for enrichment according to its declared type.
///
/// `EXPRESSION` must be rendered by the caller beforehand (it needs the
/// template, not the resolved value); here it passes through like `STRING`.
pub fn render_value_as(value_as: ValueAs, value: &str) -> Result<String, TransformError> {
    match value_as {
        ValueAs::String | ValueAs::Expression => Ok(value.to_string()),
        ValueAs::Base64 => Ok(BASE64.encode(value.as_bytes())),
        ValueAs::UrlEncoded => Ok(url_encode(value)),
        ValueAs::JsonArray => Ok(serde_json::Value::Array(vec![serde_json::Value::String(
            value.to_string(),
        )])
        .to_string()),
        ValueAs::JsonObject => {
            let mut map = serde_json::Map::new();
            map.insert(
                "value".to_string(),
                serde_json::Value::String(value.to_string()),
            );
            Ok(serde_json::Value::Object(map).to_string())
        }
        ValueAs::Number => {
            value
                .parse::<f64>()
                .map_err(|_| TransformError(format!("not a number: '{value}'")))?;
            Ok(value.to_string())
        }
        ValueAs::Boolean => match value {
            "true" | "false" => Ok(value.to_string()),
            other => Err(TransformError(format!("not a boolean: '{other}'"))),
        },
    }
}

/// Match `value` in full against a compiled validation pattern.
pub fn matches_fully(pattern: &regex::Regex, value: &str) -> bool {
    match pattern.find(value) {
        Some(m) => m.start() == 0 && m.end() == value.len(),
        None => false,
    }
}
