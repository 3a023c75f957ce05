//! BODY source: dotted-path reads from an already-parsed body tree.
//!
//! Body extraction never runs before the host has deserialized the body;
//! non-JSON bodies reach this handler only after the host converted them to
//! a JSON tree.

use crate::json::{JsonTree, PathSyntax};

pub fn extract(tree: &dyn JsonTree, path: &str, syntax: &PathSyntax) -> Option<String> {
    tree.get_path(path, syntax)
}
