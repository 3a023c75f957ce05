//! Outbound HTTP client integration for ctxprop.
//!
//! [`ContextClientBuilder`] produces [`ContextClient`]s wrapping a shared
//! `reqwest::Client` with up to three filters, applied in order on every
//! call:
//!
//! 1. **propagation** — writes the core tracing headers and every
//!    `downstream.outbound` field onto the request;
//! 2. **capture** — reads `downstream.inbound` fields from the response back
//!    into the request's context, buffering the body when a BODY field
//!    requires it;
//! 3. **logging** — refreshes the task-local logging scope and emits one
//!    structured line per call direction.
//!
//! Filters find the initiating request through the ambient context scope, so
//! a client built once at startup serves every request. Tasks spawned for
//! fan-out must be scoped with `ctxprop_core::spawn_scoped` (or an explicit
//! `scope`) for the filters to see the context.
//!
//! ```ignore
//! let builder = ContextClientBuilder::new(engine.clone());
//! let users = builder.create_for_system("user-service");
//! let resp = users.get("http://users.internal/v1/me").send().await?;
//! ```

mod client;
mod error;
mod response;
mod surface;

pub use client::{ContextClient, ContextClientBuilder, OutboundRequest};
pub use error::ClientError;
pub use response::CapturedResponse;
