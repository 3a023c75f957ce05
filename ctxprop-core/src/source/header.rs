//! HEADER source: case-insensitive reads, override-aware writes.

use crate::config::HeaderDefaults;

use super::{RequestSurface, ResponseSurface};

/// Read a header value. Excluded names never extract; overlong values are
/// truncated to the configured limit and the truncated value is
/// authoritative.
pub fn extract(req: &dyn RequestSurface, name: &str, defaults: &HeaderDefaults) -> Option<String> {
    if defaults
        .excluded
        .iter()
        .any(|excluded| excluded.eq_ignore_ascii_case(name))
    {
        return None;
    }
    let value = req.header(name)?;
    if value.len() > defaults.max_value_length {
        let mut end = defaults.max_value_length;
        while end > 0 && !value.is_char_boundary(end) {
            end -= 1;
        }
        return Some(value[..end].to_string());
    }
    Some(value)
}

/// Write a response header. With `overwrite` the value replaces any existing
/// one; otherwise it appends, except that an existing header suppresses the
/// write entirely.
pub fn enrich_response(resp: &mut dyn ResponseSurface, name: &str, value: &str, overwrite: bool) {
    if overwrite {
        resp.insert_header(name, value);
    } else if !resp.has_header(name) {
        resp.append_header(name, value);
    }
}
