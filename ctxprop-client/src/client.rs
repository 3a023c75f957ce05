//! Client builder, client, and the per-call filter chain.

use std::sync::Arc;
use std::time::Instant;

use ctxprop_core::pipeline::ContextEngine;
use ctxprop_core::{scope, RequestContext};
use ctxprop_observability::{logging_fields, mdc};
use reqwest::Method;
use tracing::{debug, error, info, warn};

use crate::error::ClientError;
use crate::response::CapturedResponse;
use crate::surface::{RequestSurface, ResponseSurface};

const DURATION_KEY: &str = "duration_ms";

#[derive(Clone, Copy, Debug)]
struct FilterSelection {
    propagate: bool,
    capture: bool,
    log: bool,
}

impl Default for FilterSelection {
    fn default() -> Self {
        FilterSelection {
            propagate: true,
            capture: true,
            log: true,
        }
    }
}

/// Produces [`ContextClient`]s sharing one connection pool and one engine.
///
/// Builders are cheap to clone; clones share the filters and the underlying
/// `reqwest::Client`.
#[derive(Clone)]
pub struct ContextClientBuilder {
    engine: Arc<ContextEngine>,
    http: reqwest::Client,
}

impl ContextClientBuilder {
    pub fn new(engine: Arc<ContextEngine>) -> Self {
        ContextClientBuilder {
            engine,
            http: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured `reqwest::Client` (timeouts, proxies, TLS). The
    /// core imposes no outbound timeouts of its own.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Generic client with all three filters.
    pub fn create(&self) -> ContextClient {
        ContextClient {
            engine: self.engine.clone(),
            http: self.http.clone(),
            filters: FilterSelection::default(),
            system_id: None,
        }
    }

    /// Client tagged with a target-system identifier, engaging the
    /// per-field `ext-sys-ids` gates.
    pub fn create_for_system(&self, system_id: impl Into<String>) -> ContextClient {
        ContextClient {
            system_id: Some(system_id.into()),
            ..self.create()
        }
    }

    /// Client with any subset of the filters (e.g. capture-only for a
    /// health-check client).
    pub fn create_with_selective_filters(
        &self,
        propagate: bool,
        capture: bool,
        log: bool,
    ) -> ContextClient {
        ContextClient {
            filters: FilterSelection {
                propagate,
                capture,
                log,
            },
            ..self.create()
        }
    }
}

/// An HTTP client that applies the context filters around every call.
#[derive(Clone)]
pub struct ContextClient {
    engine: Arc<ContextEngine>,
    http: reqwest::Client,
    filters: FilterSelection,
    system_id: Option<String>,
}

impl ContextClient {
    pub fn request(&self, method: Method, url: impl reqwest::IntoUrl) -> OutboundRequest {
        OutboundRequest {
            client: self.clone(),
            inner: self.http.request(method, url),
        }
    }

    pub fn get(&self, url: impl reqwest::IntoUrl) -> OutboundRequest {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: impl reqwest::IntoUrl) -> OutboundRequest {
        self.request(Method::POST, url)
    }

    pub fn put(&self, url: impl reqwest::IntoUrl) -> OutboundRequest {
        self.request(Method::PUT, url)
    }

    pub fn delete(&self, url: impl reqwest::IntoUrl) -> OutboundRequest {
        self.request(Method::DELETE, url)
    }

    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    /// Run the filter chain around one already-built request.
    pub async fn execute(
        &self,
        mut request: reqwest::Request,
    ) -> Result<CapturedResponse, ClientError> {
        let ctx = scope::current();

        if self.filters.propagate {
            if let Some(ctx) = ctx.as_deref() {
                let mut surface = RequestSurface::new(&mut request);
                self.engine
                    .propagate_downstream(ctx, &mut surface, self.system_id.as_deref());
            }
        }

        let method = request.method().clone();
        let url = request.url().clone();
        if self.filters.log {
            self.log_request_out(ctx.as_deref(), &method, url.as_str());
        }

        let started = Instant::now();
        let outcome = self.http.execute(request).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                if self.filters.log {
                    error!(method = %method, url = %url, elapsed_ms, error = %e, "← outbound call failed");
                    mdc::remove(DURATION_KEY);
                }
                return Err(ClientError::from(e));
            }
        };

        if self.filters.log {
            self.log_response_in(ctx.as_deref(), response.status(), elapsed_ms);
        }

        let captured = match ctx {
            Some(ctx) if self.filters.capture => self.capture(&ctx, response).await,
            _ => CapturedResponse::streaming(response),
        };
        Ok(captured)
    }

    /// Capture filter: read configured fields from the response, buffering
    /// the body first when a BODY field requires it. Capture problems leave
    /// the response intact and are only logged.
    async fn capture(
        &self,
        ctx: &Arc<RequestContext>,
        response: reqwest::Response,
    ) -> CapturedResponse {
        let index = self.engine.index();
        if index.downstream_inbound().is_empty() {
            return CapturedResponse::streaming(response);
        }

        if !index.requires_body_capture() {
            let surface = ResponseSurface::new(response.headers(), None);
            self.engine.capture_downstream(ctx, &surface);
            return CapturedResponse::streaming(response);
        }

        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let max = self.engine.max_body_capture_bytes();

        let declared_len = response.content_length();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "downstream body buffering failed, capture skipped");
                let surface = ResponseSurface::new(&headers, None);
                self.engine.capture_downstream(ctx, &surface);
                return CapturedResponse::buffered(status, headers, url, bytes::Bytes::new());
            }
        };

        let body = if bytes.len() > max {
            warn!(
                len = bytes.len(),
                max, "downstream body exceeds the capture limit, body fields skipped"
            );
            None
        } else {
            match serde_json::from_slice::<serde_json::Value>(&bytes) {
                Ok(tree) => Some(tree),
                Err(e) => {
                    debug!(error = %e, declared_len, "downstream body is not JSON, body fields skipped");
                    None
                }
            }
        };

        let surface = ResponseSurface::new(&headers, body.as_ref());
        self.engine.capture_downstream(ctx, &surface);
        CapturedResponse::buffered(status, headers, url, bytes)
    }

    /// Logging filter, request-out half: refresh the scope from the context
    /// and emit one structured line.
    fn log_request_out(&self, ctx: Option<&RequestContext>, method: &Method, url: &str) {
        if let Some(ctx) = ctx {
            mdc::extend(&logging_fields(ctx));
        }
        info!(method = %method, url = %url, "→ outbound");
    }

    /// Logging filter, response-in half: level follows the status class;
    /// transient keys are removed before returning to the caller.
    fn log_response_in(
        &self,
        ctx: Option<&RequestContext>,
        status: reqwest::StatusCode,
        elapsed_ms: u64,
    ) {
        if let Some(ctx) = ctx {
            mdc::extend(&logging_fields(ctx));
        }
        mdc::insert(DURATION_KEY, &elapsed_ms.to_string());
        if status.is_server_error() {
            error!(status = status.as_u16(), duration_ms = elapsed_ms, "← response");
        } else if status.is_client_error() {
            warn!(status = status.as_u16(), duration_ms = elapsed_ms, "← response");
        } else {
            info!(status = status.as_u16(), duration_ms = elapsed_ms, "← response");
        }
        mdc::remove(DURATION_KEY);
    }
}

/// Builder for one outbound call, wrapping `reqwest::RequestBuilder`.
pub struct OutboundRequest {
    client: ContextClient,
    inner: reqwest::RequestBuilder,
}

impl OutboundRequest {
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.inner = self.inner.header(name, value);
        self
    }

    pub fn query<T: serde::Serialize + ?Sized>(mut self, query: &T) -> Self {
        self.inner = self.inner.query(query);
        self
    }

    pub fn json<T: serde::Serialize + ?Sized>(mut self, body: &T) -> Self {
        self.inner = self.inner.json(body);
        self
    }

    pub fn body(mut self, body: impl Into<reqwest::Body>) -> Self {
        self.inner = self.inner.body(body.into());
        self
    }

    pub fn bearer_auth(mut self, token: &str) -> Self {
        self.inner = self.inner.bearer_auth(token);
        self
    }

    /// Build the request and run it through the filter chain.
    pub async fn send(self) -> Result<CapturedResponse, ClientError> {
        let request = self.inner.build()?;
        self.client.execute(request).await
    }
}
