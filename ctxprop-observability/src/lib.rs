//! Observability projections of the request context.
//!
//! Metrics, logging and tracing sinks each pull their own view of the
//! context at whatever cadence suits them. Every view uses the custom names
//! cached in the field index and — for sensitive fields — the masked
//! rendering, never the raw value.
//!
//! The [`mdc`] module holds the per-task logging scope the inbound layer
//! and the outbound logging filter write into.

pub mod mdc;
mod projection;

pub use projection::{
    logging_fields, logging_fields_at, logging_fields_nested, metrics_fields, nested_from_dotted,
    tracing_fields, tracing_tags_nested,
};
