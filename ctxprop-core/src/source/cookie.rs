//! COOKIE source: exact name match on read; attribute policy applied on
//! write by the response surface.

use super::RequestSurface;

pub fn extract(req: &dyn RequestSurface, name: &str) -> Option<String> {
    req.cookie(name)
}
