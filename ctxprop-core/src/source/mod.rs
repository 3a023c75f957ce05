//! Source handlers: one extractor/enricher per request surface.
//!
//! The set of surfaces is closed; dispatch is a `match` over [`Source`] /
//! [`EnrichAs`]. Handlers are pure functions of their inputs and never touch
//! the context store. Operations that make no sense for a surface (e.g.
//! enriching a response query string) are explicit no-ops logged at trace.

pub mod attribute;
pub mod body;
pub mod claim;
pub mod cookie;
pub mod form;
pub mod header;
pub mod path;
pub mod query;
pub mod session;
pub mod token;

use tracing::trace;

use crate::config::{CookieDefaults, EnrichAs, Source, SourceConfiguration};
use crate::index::CompiledExtraction;
use crate::json::{JsonTree, PathSyntax};

/// Read access to the inbound (upstream) request. Implemented by the host
/// integration over its request type.
pub trait RequestSurface {
    /// First value of a header, case-insensitively.
    fn header(&self, name: &str) -> Option<String>;
    /// First value of a query parameter, percent-decoded.
    fn query_param(&self, name: &str) -> Option<String>;
    /// Value of a cookie by exact name.
    fn cookie(&self, name: &str) -> Option<String>;
    /// Request path, used for PATH pattern matching.
    fn path(&self) -> &str;
    /// Session attribute, already prefixed by the caller.
    fn session_attribute(&self, key: &str) -> Option<String>;
    /// Request attribute (host-specific per-request map).
    fn attribute(&self, key: &str) -> Option<String>;
    /// Parsed form-body parameter, when the host has parsed one.
    fn form_param(&self, name: &str) -> Option<String>;
}

/// Write access to the upstream response being sent back to the caller.
pub trait ResponseSurface {
    fn has_header(&self, name: &str) -> bool;
    fn insert_header(&mut self, name: &str, value: &str);
    fn append_header(&mut self, name: &str, value: &str);
    /// Add a `Set-Cookie`, applying the global cookie attribute policy.
    fn add_cookie(&mut self, name: &str, value: &str, defaults: &CookieDefaults);
    fn set_attribute(&mut self, key: &str, value: &str);
}

/// Write access to an outbound (downstream) request under construction.
pub trait OutboundSurface {
    fn insert_header(&mut self, name: &str, value: &str);
    fn append_header(&mut self, name: &str, value: &str);
    fn add_query_param(&mut self, name: &str, value: &str);
    fn add_cookie(&mut self, name: &str, value: &str);
}

/// Read access to a downstream response during capture.
pub trait DownstreamResponse {
    fn header(&self, name: &str) -> Option<String>;
    /// The buffered, parsed body; `None` when the body was not captured.
    fn body_tree(&self) -> Option<&dyn JsonTree>;
}

/// Extract a field from the inbound request (stages 1 and 2).
///
/// CLAIM sources read from `claims`, which the pipeline resolves once per
/// request; BODY sources always return absent here — they only run at stage 3.
pub fn extract_from_request(
    ext: &CompiledExtraction,
    field_name: &str,
    req: &dyn RequestSurface,
    globals: &SourceConfiguration,
    claims: Option<&serde_json::Value>,
    syntax: &PathSyntax,
) -> Option<String> {
    match ext.source {
        Source::Header => header::extract(req, &ext.key, &globals.header),
        Source::Query => query::extract(req, &ext.key),
        Source::Cookie => cookie::extract(req, &ext.key),
        Source::Path => path::extract(req, ext, field_name),
        Source::Session => session::extract(req, &ext.key, &globals.session),
        Source::Attribute => attribute::extract(req, &ext.key),
        Source::Token => token::extract(req, &globals.token),
        Source::Claim => claims.and_then(|c| claim::extract(c, ext.effective_claim_path(), syntax)),
        Source::Form => form::extract(req, &ext.key),
        Source::Body => None,
    }
}

/// Extract a BODY field from the parsed request body (stage 3).
pub fn extract_from_body(
    ext: &CompiledExtraction,
    tree: &dyn JsonTree,
    syntax: &PathSyntax,
) -> Option<String> {
    match ext.source {
        Source::Body => body::extract(tree, &ext.key, syntax),
        _ => None,
    }
}

/// Extract a field from a downstream response during capture.
pub fn extract_from_downstream(
    ext: &CompiledExtraction,
    resp: &dyn DownstreamResponse,
    syntax: &PathSyntax,
) -> Option<String> {
    match ext.source {
        Source::Header => resp.header(&ext.key),
        Source::Body => resp
            .body_tree()
            .and_then(|tree| body::extract(tree, &ext.key, syntax)),
        other => {
            trace!(source = ?other, "source not readable from a downstream response");
            None
        }
    }
}

/// Write one enrichment onto the upstream response.
pub fn enrich_upstream_response(
    resp: &mut dyn ResponseSurface,
    enrich_as: EnrichAs,
    key: &str,
    value: &str,
    overwrite: bool,
    cookie_defaults: &CookieDefaults,
) {
    match enrich_as {
        EnrichAs::Header => header::enrich_response(resp, key, value, overwrite),
        EnrichAs::Cookie => resp.add_cookie(key, value, cookie_defaults),
        EnrichAs::Attribute => resp.set_attribute(key, value),
        EnrichAs::Query | EnrichAs::Path | EnrichAs::Body => {
            trace!(target_surface = ?enrich_as, "surface not writable on an upstream response");
        }
    }
}

/// Write one enrichment onto an outbound request.
pub fn enrich_outbound_request(
    out: &mut dyn OutboundSurface,
    enrich_as: EnrichAs,
    key: &str,
    value: &str,
    overwrite: bool,
) {
    match enrich_as {
        EnrichAs::Header => {
            if overwrite {
                out.insert_header(key, value);
            } else {
                out.append_header(key, value);
            }
        }
        EnrichAs::Query => out.add_query_param(key, value),
        EnrichAs::Cookie => out.add_cookie(key, value),
        EnrichAs::Attribute | EnrichAs::Path | EnrichAs::Body => {
            trace!(target_surface = ?enrich_as, "surface not writable on an outbound request");
        }
    }
}
