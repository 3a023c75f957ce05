//! Path-based access to parsed JSON trees.
//!
//! Bodies and claims are handed to the core as already-parsed trees; the
//! core never deserializes payloads itself. Hosts with their own body
//! representation implement [`JsonTree`]; [`serde_json::Value`] carries the
//! reference implementation.

use crate::config::ClaimDefaults;

/// Traversal syntax for dotted paths with array indices, e.g.
/// `items[2].id` with the default syntax.
#[derive(Debug, Clone)]
pub struct PathSyntax {
    pub separator: String,
    pub array_open: char,
    pub array_close: char,
}

impl Default for PathSyntax {
    fn default() -> Self {
        PathSyntax {
            separator: ".".to_string(),
            array_open: '[',
            array_close: ']',
        }
    }
}

impl From<&ClaimDefaults> for PathSyntax {
    fn from(defaults: &ClaimDefaults) -> Self {
        PathSyntax {
            separator: defaults.nested_separator.clone(),
            array_open: defaults.array_index_open,
            array_close: defaults.array_index_close,
        }
    }
}

/// A parsed request/response body (or claim set) the core can read paths
/// from. Results are strings or absent; scalars render unquoted, arrays and
/// objects render as JSON text.
pub trait JsonTree {
    fn get_path(&self, path: &str, syntax: &PathSyntax) -> Option<String>;
}

impl JsonTree for serde_json::Value {
    fn get_path(&self, path: &str, syntax: &PathSyntax) -> Option<String> {
        resolve(self, path, syntax).map(render)
    }
}

/// Walk `root` along `path`, honoring nested separators and array markers.
pub fn resolve<'a>(
    root: &'a serde_json::Value,
    path: &str,
    syntax: &PathSyntax,
) -> Option<&'a serde_json::Value> {
    let mut current = root;
    for segment in path.split(syntax.separator.as_str()) {
        if segment.is_empty() {
            return None;
        }
        let (key, indices) = split_indices(segment, syntax)?;
        if !key.is_empty() {
            current = current.as_object()?.get(key)?;
        }
        for index in indices {
            current = current.as_array()?.get(index)?;
        }
    }
    Some(current)
}

/// Render a JSON value the way extraction results are stored: strings
/// unquoted, other scalars via their JSON text, compounds as JSON.
pub fn render(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Split `items[2][0]` into (`items`, [2, 0]). Returns `None` on malformed
/// index markers.
fn split_indices<'a>(segment: &'a str, syntax: &PathSyntax) -> Option<(&'a str, Vec<usize>)> {
    let Some(open) = segment.find(syntax.array_open) else {
        return Some((segment, Vec::new()));
    };
    let key = &segment[..open];
    let mut indices = Vec::new();
    let mut rest = &segment[open..];
    while !rest.is_empty() {
        let inner = rest
            .strip_prefix(syntax.array_open)?
            .split_once(syntax.array_close)?;
        indices.push(inner.0.parse().ok()?);
        rest = inner.1;
    }
    Some((key, indices))
}
