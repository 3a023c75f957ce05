//! QUERY source: percent-decoded reads; multi-valued keys read first.

use super::RequestSurface;

pub fn extract(req: &dyn RequestSurface, name: &str) -> Option<String> {
    req.query_param(name)
}
