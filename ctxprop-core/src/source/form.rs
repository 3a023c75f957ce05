//! FORM source: parameters of an already-parsed form-encoded body.

use super::RequestSurface;

pub fn extract(req: &dyn RequestSurface, name: &str) -> Option<String> {
    req.form_param(name)
}
