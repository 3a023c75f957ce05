//! Adapters binding the core's outbound traits to reqwest types.

use ctxprop_core::json::JsonTree;
use ctxprop_core::source::{DownstreamResponse, OutboundSurface};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use tracing::debug;

/// Mutable view of a built `reqwest::Request` for the propagation filter.
pub(crate) struct RequestSurface<'a> {
    request: &'a mut reqwest::Request,
}

impl<'a> RequestSurface<'a> {
    pub(crate) fn new(request: &'a mut reqwest::Request) -> Self {
        RequestSurface { request }
    }

    fn parse(name: &str, value: &str) -> Option<(HeaderName, HeaderValue)> {
        let name = match HeaderName::from_bytes(name.as_bytes()) {
            Ok(name) => name,
            Err(_) => {
                debug!(header = name, "invalid outbound header name");
                return None;
            }
        };
        let value = match HeaderValue::from_str(value) {
            Ok(value) => value,
            Err(_) => {
                debug!(header = %name, "invalid outbound header value");
                return None;
            }
        };
        Some((name, value))
    }
}

impl OutboundSurface for RequestSurface<'_> {
    fn insert_header(&mut self, name: &str, value: &str) {
        if let Some((name, value)) = Self::parse(name, value) {
            self.request.headers_mut().insert(name, value);
        }
    }

    fn append_header(&mut self, name: &str, value: &str) {
        if let Some((name, value)) = Self::parse(name, value) {
            self.request.headers_mut().append(name, value);
        }
    }

    fn add_query_param(&mut self, name: &str, value: &str) {
        self.request
            .url_mut()
            .query_pairs_mut()
            .append_pair(name, value);
    }

    fn add_cookie(&mut self, name: &str, value: &str) {
        let pair = format!("{name}={value}");
        let merged = match self
            .request
            .headers()
            .get(COOKIE)
            .and_then(|existing| existing.to_str().ok())
        {
            Some(existing) if !existing.is_empty() => format!("{existing}; {pair}"),
            _ => pair,
        };
        if let Ok(value) = HeaderValue::from_str(&merged) {
            self.request.headers_mut().insert(COOKIE, value);
        }
    }
}

/// Read view over a completed response for the capture filter.
pub(crate) struct ResponseSurface<'a> {
    headers: &'a HeaderMap,
    body: Option<&'a serde_json::Value>,
}

impl<'a> ResponseSurface<'a> {
    pub(crate) fn new(headers: &'a HeaderMap, body: Option<&'a serde_json::Value>) -> Self {
        ResponseSurface { headers, body }
    }
}

impl DownstreamResponse for ResponseSurface<'_> {
    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    fn body_tree(&self) -> Option<&dyn JsonTree> {
        self.body.map(|v| v as &dyn JsonTree)
    }
}
