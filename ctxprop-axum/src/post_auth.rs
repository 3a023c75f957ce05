//! The post-authentication layer: stage 2.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::Response;
use ctxprop_core::pipeline::ContextEngine;
use ctxprop_observability::{logging_fields, mdc};
use http::Request;
use tower::{Layer, Service};

use crate::extract::ContextHandle;
use crate::layer::missing_fields_response;
use crate::surface::HttpRequestSurface;

/// Tower layer running post-auth extraction (PATH/TOKEN/CLAIM/SESSION/
/// ATTRIBUTE/FORM sources).
///
/// Place it *inside* the host's authentication layer, so the sources it
/// reads — the verified bearer token, session attributes set by the auth
/// code — are available. Requests without a context (excluded paths) pass
/// through untouched.
#[derive(Clone)]
pub struct PostAuthLayer {
    engine: Arc<ContextEngine>,
}

impl PostAuthLayer {
    pub fn new(engine: Arc<ContextEngine>) -> Self {
        PostAuthLayer { engine }
    }
}

impl<S> Layer<S> for PostAuthLayer {
    type Service = PostAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PostAuthService {
            inner,
            engine: self.engine.clone(),
        }
    }
}

/// Service produced by [`PostAuthLayer`].
#[derive(Clone)]
pub struct PostAuthService<S> {
    inner: S,
    engine: Arc<ContextEngine>,
}

impl<S> Service<Request<Body>> for PostAuthService<S>
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

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let engine = self.engine.clone();
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let Some(handle) = req.extensions().get::<ContextHandle>().cloned() else {
                return inner.call(req).await;
            };
            {
                let surface =
                    HttpRequestSurface::new(req.headers(), req.uri(), req.extensions());
                if let Err(e) = engine.on_authenticated(&handle.0, &surface) {
                    return Ok(missing_fields_response(&e));
                }
            }
            mdc::extend(&logging_fields(&handle.0));
            inner.call(req).await
        })
    }
}
