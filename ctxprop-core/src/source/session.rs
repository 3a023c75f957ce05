//! SESSION source: reads under the globally configured attribute prefix.

use crate::config::SessionDefaults;

use super::RequestSurface;

pub fn extract(
    req: &dyn RequestSurface,
    key: &str,
    defaults: &SessionDefaults,
) -> Option<String> {
    let prefixed = format!("{}{key}", defaults.attribute_prefix);
    req.session_attribute(&prefixed)
}
