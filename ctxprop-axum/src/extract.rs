//! Extractors and request-extension types.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::response::{IntoResponse, Response};
use axum::Json;
use ctxprop_core::pipeline::ContextEngine;
use ctxprop_core::RequestContext;
use http::request::Parts;
use http::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

/// The request's context handle, stored in the request extensions by
/// [`ContextLayer`](crate::ContextLayer) and extractable in handlers.
///
/// ```ignore
/// async fn handler(ctx: ContextHandle) -> impl IntoResponse {
///     format!("tenant = {:?}", ctx.get("tenantId"))
/// }
/// ```
#[derive(Clone)]
pub struct ContextHandle(pub Arc<RequestContext>);

impl Deref for ContextHandle {
    type Target = RequestContext;

    fn deref(&self) -> &RequestContext {
        &self.0
    }
}

impl<S> FromRequestParts<S> for ContextHandle
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<ContextHandle>().cloned().ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "request context not initialized; is ContextLayer installed?"
                })),
            )
                .into_response()
        })
    }
}

/// Engine handle the layers stash in the request extensions so extractors
/// can reach the pipeline.
#[derive(Clone)]
pub(crate) struct EngineHandle(pub(crate) Arc<ContextEngine>);

/// Session attributes exposed to SESSION sources. The host's session layer
/// inserts this extension before [`PostAuthLayer`](crate::PostAuthLayer)
/// runs.
#[derive(Clone, Debug, Default)]
pub struct SessionAttributes(pub HashMap<String, String>);

impl SessionAttributes {
    pub fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

/// Per-request attribute map exposed to ATTRIBUTE sources.
#[derive(Clone, Debug, Default)]
pub struct RequestAttributes(pub HashMap<String, String>);

impl RequestAttributes {
    pub fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

/// Parsed form-body parameters exposed to FORM sources. Inserted by the
/// host after it parsed a form payload.
#[derive(Clone, Debug, Default)]
pub struct FormParams(pub HashMap<String, String>);

impl FormParams {
    pub fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

/// JSON body extractor that feeds BODY fields.
///
/// Deserializes like `axum::Json`, then runs the body-extraction stage over
/// the parsed tree before the handler sees the payload. Requests without a
/// context (excluded paths, missing layer) still deserialize normally.
pub struct ContextJson<T>(pub T);

impl<T, S> FromRequest<S> for ContextJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = req.extensions().get::<ContextHandle>().cloned();
        let engine = req.extensions().get::<EngineHandle>().cloned();

        let bytes = bytes::Bytes::from_request(req, state)
            .await
            .map_err(|e| bad_request(&format!("failed to read body: {e}")))?;
        let tree: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| bad_request(&format!("invalid JSON body: {e}")))?;

        if let (Some(ctx), Some(engine)) = (ctx, engine) {
            if let Err(e) = engine.0.on_body_parsed(&ctx.0, &tree) {
                debug!(error = %e, "body extraction failed");
            }
        }

        let value: T =
            serde_json::from_value(tree).map_err(|e| bad_request(&format!("invalid body: {e}")))?;
        Ok(ContextJson(value))
    }
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}
