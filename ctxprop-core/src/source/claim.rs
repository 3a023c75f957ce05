//! CLAIM source: nested traversal of an already-parsed claim set.

use crate::json::{JsonTree, PathSyntax};

pub fn extract(claims: &serde_json::Value, path: &str, syntax: &PathSyntax) -> Option<String> {
    claims.get_path(path, syntax)
}
