//! Core engine for ctxprop — declarative request-context propagation.
//!
//! For every inbound HTTP request, a configured set of named fields is
//! extracted from the request's surfaces (headers, query, cookies, path,
//! session, bearer token, claims, body), stored in a per-request context,
//! projected into logs/metrics/traces, written back onto the response, and
//! propagated onto every outbound call made on the request's behalf.
//!
//! This crate is host-agnostic: it consumes narrow surface traits and is
//! driven through five hooks (see [`pipeline::ContextEngine`]). The
//! `ctxprop-axum` and `ctxprop-client` crates bind those hooks to axum and
//! reqwest.
//!
//! ```ignore
//! let config = RequestContextConfig::from_yaml_str(yaml)?;
//! let engine = Arc::new(ContextEngine::new(config)?);
//!
//! // host request handling:
//! let ctx = engine.on_request_received(&request_surface)?;   // stage 1
//! engine.on_authenticated(&ctx, &request_surface)?;          // stage 2
//! engine.on_body_parsed(&ctx, &parsed_body)?;                // stage 3
//! engine.on_before_response_write(&ctx, &mut response)?;     // stage 4
//! engine.on_request_complete(&ctx);                          // stage 5
//! ```

pub mod claims;
pub mod config;
pub mod context;
pub mod error;
pub mod generate;
pub mod index;
pub mod json;
pub mod mask;
pub mod pattern;
pub mod pipeline;
pub mod scope;
pub mod source;
pub mod transform;

pub use config::{
    EnrichAs, EnrichmentSpec, ExtractionSpec, FieldConfig, Generator, RequestContextConfig,
    Source, Transformation, ValueAs,
};
pub use context::{ContextStore, PipelineState, RequestContext};
pub use error::{ConfigError, ContextError};
pub use index::{FieldEntry, FieldIndex};
pub use json::{JsonTree, PathSyntax};
pub use pipeline::{
    ContextEngine, CORRELATION_ID_FIELD, CORRELATION_ID_HEADER, REQUEST_ID_FIELD,
    REQUEST_ID_HEADER,
};
pub use scope::{current, scope as scope_context, spawn_scoped};
