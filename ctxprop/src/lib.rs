//! Declarative HTTP request-context propagation.
//!
//! Configure named fields once; for every request the framework extracts
//! them from the configured surfaces, stores them in a per-request context,
//! projects them into logs/metrics/traces, enriches the response, and
//! propagates them onto every outbound call — capturing downstream response
//! fields back into the same context.
//!
//! This crate re-exports the family:
//!
//! - [`core`] — configuration model, field index, context store, pipeline.
//! - [`axum`] (feature `axum`) — tower layers and extractors for axum hosts.
//! - [`client`] (feature `client`) — the reqwest client with the outbound
//!   filters.
//! - [`observability`] (feature `observability`) — metrics/logging/tracing
//!   projections and the task-local logging scope.

pub use ctxprop_core as core;

pub use ctxprop_core::{
    ContextEngine, ContextError, ContextStore, FieldConfig, FieldIndex, PipelineState,
    RequestContext, RequestContextConfig,
};

#[cfg(feature = "axum")]
pub use ctxprop_axum as axum;

#[cfg(feature = "axum")]
pub use ctxprop_axum::{ContextHandle, ContextJson, ContextLayer, PostAuthLayer};

#[cfg(feature = "client")]
pub use ctxprop_client as client;

#[cfg(feature = "client")]
pub use ctxprop_client::{CapturedResponse, ContextClient, ContextClientBuilder};

#[cfg(feature = "observability")]
pub use ctxprop_observability as observability;
