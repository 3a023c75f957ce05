//! Axum/tower integration for ctxprop.
//!
//! Three pieces drive the core pipeline for an axum application:
//!
//! - [`ContextLayer`] — outermost layer; runs pre-auth extraction when a
//!   request arrives (stage 1), makes the context ambient to the handler,
//!   enriches the response (stage 4) and tears the context down (stage 5).
//!   Missing required fields short-circuit with a 400 listing their names.
//! - [`PostAuthLayer`] — placed inside the host's authentication layer; runs
//!   post-auth extraction (stage 2) over PATH/TOKEN/CLAIM/SESSION/ATTRIBUTE/
//!   FORM sources.
//! - [`ContextJson`] — drop-in replacement for `axum::Json` that runs BODY
//!   extraction (stage 3) right after deserializing the payload.
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/orders", post(create_order))
//!     .layer(PostAuthLayer::new(engine.clone()))
//!     .layer(ContextLayer::new(engine));
//!
//! async fn create_order(ctx: ContextHandle, ContextJson(order): ContextJson<Order>) { ... }
//! ```

mod extract;
mod layer;
mod post_auth;
mod surface;

pub use extract::{ContextHandle, ContextJson, FormParams, RequestAttributes, SessionAttributes};
pub use layer::{ContextLayer, ContextService};
pub use post_auth::{PostAuthLayer, PostAuthService};
pub use surface::ResponseAttributes;
