//! The outermost context layer: stages 1, 4 and 5 around the inner service.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ctxprop_core::pipeline::ContextEngine;
use ctxprop_core::{ContextError, RequestContext};
use ctxprop_observability::{logging_fields, mdc};
use http::{Request, StatusCode};
use tower::{Layer, Service};
use tracing::debug;

use crate::extract::{ContextHandle, EngineHandle};
use crate::surface::{HttpRequestSurface, HttpResponseSurface};

/// Tower layer installing the request-context pipeline around a service.
///
/// Install it as the outermost layer so every other layer and the handler
/// run inside the context scope:
///
/// ```ignore
/// Router::new()
///     .route("/", get(handler))
///     .layer(PostAuthLayer::new(engine.clone()))
///     .layer(ContextLayer::new(engine));
/// ```
#[derive(Clone)]
pub struct ContextLayer {
    engine: Arc<ContextEngine>,
}

impl ContextLayer {
    pub fn new(engine: Arc<ContextEngine>) -> Self {
        ContextLayer { engine }
    }
}

impl<S> Layer<S> for ContextLayer {
    type Service = ContextService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ContextService {
            inner,
            engine: self.engine.clone(),
        }
    }
}

/// Service produced by [`ContextLayer`].
#[derive(Clone)]
pub struct ContextService<S> {
    inner: S,
    engine: Arc<ContextEngine>,
}

impl<S> Service<Request<Body>> for ContextService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let engine = self.engine.clone();
        // Take the ready service; leave the clone for the next call.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            if engine.is_excluded(req.uri().path()) {
                return inner.call(req).await;
            }

            let ctx = {
                let surface =
                    HttpRequestSurface::new(req.headers(), req.uri(), req.extensions());
                match engine.on_request_received(&surface) {
                    Ok(ctx) => ctx,
                    Err(e) => {
                        let response = missing_fields_response(&e);
                        return Ok(response);
                    }
                }
            };
            req.extensions_mut().insert(ContextHandle(ctx.clone()));
            req.extensions_mut().insert(EngineHandle(engine.clone()));

            // Teardown must run even when the host cancels the request and
            // drops this future mid-flight.
            let teardown = TeardownGuard {
                engine: engine.clone(),
                ctx: Some(ctx.clone()),
            };

            let scope_ctx = ctx.clone();
            let outcome = run_scoped(&engine, ctx.clone(), async move {
                mdc::extend(&logging_fields(&scope_ctx));
                inner.call(req).await
            })
            .await;
            let mut response = match outcome {
                Ok(response) => response,
                Err(e) => return Err(e),
            };

            let mut surface = HttpResponseSurface::new(&mut response);
            if let Err(e) = engine.on_before_response_write(&ctx, &mut surface) {
                debug!(error = %e, "response enrichment failed");
            }
            drop(teardown);
            Ok(response)
        })
    }
}

struct TeardownGuard {
    engine: Arc<ContextEngine>,
    ctx: Option<Arc<RequestContext>>,
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            self.engine.on_request_complete(&ctx);
        }
    }
}

/// Run the inner service inside the logging scope and, when configured, the
/// ambient context scope.
async fn run_scoped<F>(engine: &ContextEngine, ctx: Arc<RequestContext>, future: F) -> F::Output
where
    F: Future,
{
    if engine.filter_config().propagate_to_async {
        mdc::scope(ctxprop_core::scope::scope(ctx, future)).await
    } else {
        mdc::scope(future).await
    }
}

/// The 400 rendered for required-field violations, naming every missing
/// field so the caller can fix them all at once.
pub(crate) fn missing_fields_response(error: &ContextError) -> Response {
    let missing = error.missing_fields().unwrap_or_default();
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": "Missing required request fields",
            "missing": missing,
        })),
    )
        .into_response()
}
