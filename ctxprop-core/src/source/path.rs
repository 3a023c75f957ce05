//! PATH source: match the request path against the spec's URL pattern and
//! extract the placeholder segment.

use crate::index::CompiledExtraction;

use super::RequestSurface;

/// Placeholder resolution order: the placeholder named like the field when
/// one exists, otherwise the first placeholder in the pattern.
pub fn extract(
    req: &dyn RequestSurface,
    ext: &CompiledExtraction,
    field_name: &str,
) -> Option<String> {
    let pattern = ext.path_pattern.as_ref()?;
    pattern.extract(req.path(), field_name)
}
