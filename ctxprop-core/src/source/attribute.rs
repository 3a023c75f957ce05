//! ATTRIBUTE source: host-managed per-request attribute map.

use super::RequestSurface;

pub fn extract(req: &dyn RequestSurface, key: &str) -> Option<String> {
    req.attribute(key)
}
