//! TOKEN source: the full bearer token string from the configured header.

use crate::config::TokenDefaults;

use super::RequestSurface;

/// Read the bearer token, stripping the configured scheme prefix
/// case-insensitively. Returns absent when the header is missing or carries
/// a different scheme.
pub fn extract(req: &dyn RequestSurface, defaults: &TokenDefaults) -> Option<String> {
    let raw = req.header(&defaults.header_name)?;
    strip_prefix_ignore_case(&raw, &defaults.prefix).map(|token| token.trim().to_string())
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(value);
    }
    if value.len() >= prefix.len() && value[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&value[prefix.len()..])
    } else {
        None
    }
}
