//! The per-request extraction pipeline and its host-facing hooks.
//!
//! The engine is built once at startup and shared by every request. Hosts
//! call the five hooks in order:
//!
//! 1. [`on_request_received`](ContextEngine::on_request_received) — pre-auth
//!    extraction; an `Err` short-circuits the request with a client error.
//! 2. [`on_authenticated`](ContextEngine::on_authenticated) — post-auth
//!    extraction, excluding BODY fields.
//! 3. [`on_body_parsed`](ContextEngine::on_body_parsed) — BODY extraction
//!    over the parsed body tree.
//! 4. [`on_before_response_write`](ContextEngine::on_before_response_write)
//!    — upstream response enrichment.
//! 5. [`on_request_complete`](ContextEngine::on_request_complete) — teardown;
//!    always invoked.
//!
//! The downstream half — [`propagate_downstream`](ContextEngine::propagate_downstream)
//! and [`capture_downstream`](ContextEngine::capture_downstream) — is driven
//! by the outbound client filters.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::claims::TokenCache;
use crate::config::{RequestContextConfig, Source, SourceConfiguration, ValueAs};
use crate::context::{PipelineState, RequestContext};
use crate::error::{ConfigError, ContextError};
use crate::index::{CompiledExtraction, FieldEntry, FieldIndex};
use crate::json::{JsonTree, PathSyntax};
use crate::mask;
use crate::pattern;
use crate::source::{
    self, DownstreamResponse, OutboundSurface, RequestSurface, ResponseSurface,
};
use crate::transform;
use crate::{generate, scope};

/// Context field names backing the core tracing headers.
pub const REQUEST_ID_FIELD: &str = "requestId";
pub const CORRELATION_ID_FIELD: &str = "correlationId";

/// Outbound header names for the core tracing fields.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-Id";

/// Process-wide engine: the immutable field index plus the global source
/// configuration and the parsed-token cache.
pub struct ContextEngine {
    index: Arc<FieldIndex>,
    globals: SourceConfiguration,
    filter: crate::config::FilterConfig,
    syntax: PathSyntax,
    token_cache: TokenCache,
}

impl ContextEngine {
    /// Validate the configuration and build the engine.
    pub fn new(config: RequestContextConfig) -> Result<Self, ConfigError> {
        let index = Arc::new(FieldIndex::build(&config)?);
        let syntax = PathSyntax::from(&config.source_configuration.claim);
        Ok(ContextEngine {
            index,
            syntax,
            token_cache: TokenCache::new(config.token_cache.clone()),
            globals: config.source_configuration,
            filter: config.filter_config,
        })
    }

    pub fn index(&self) -> &Arc<FieldIndex> {
        &self.index
    }

    pub fn globals(&self) -> &SourceConfiguration {
        &self.globals
    }

    pub fn filter_config(&self) -> &crate::config::FilterConfig {
        &self.filter
    }

    pub fn path_syntax(&self) -> &PathSyntax {
        &self.syntax
    }

    /// True when the pipeline must not run for this path. Excluded requests
    /// never allocate a context.
    pub fn is_excluded(&self, path: &str) -> bool {
        if pattern::matches_any(&self.filter.exclude_patterns, path) {
            return true;
        }
        !self.filter.include_patterns.is_empty()
            && !pattern::matches_any(&self.filter.include_patterns, path)
    }

    /// Largest downstream response body the capture filter may buffer.
    pub fn max_body_capture_bytes(&self) -> usize {
        self.filter.max_body_capture_bytes
    }

    // ── Stage 1 ────────────────────────────────────────────────────────────

    /// Create the request's context and run pre-auth extraction over the
    /// HEADER/QUERY/COOKIE fields.
    pub fn on_request_received(
        &self,
        req: &dyn RequestSurface,
    ) -> Result<Arc<RequestContext>, ContextError> {
        let ctx = Arc::new(RequestContext::new(self.index.clone()));
        self.extract_stage(&ctx, self.index.pre_auth_inbound(), req, None)?;
        ctx.set_state(PipelineState::PreAuthExtracted);
        Ok(ctx)
    }

    // ── Stage 2 ────────────────────────────────────────────────────────────

    /// Run post-auth extraction (PATH/TOKEN/CLAIM/SESSION/ATTRIBUTE/FORM).
    ///
    /// Claims are decoded once per request from the bearer token when
    /// `extract-unverified-claims` allows it, consulting the token cache.
    pub fn on_authenticated(
        &self,
        ctx: &Arc<RequestContext>,
        req: &dyn RequestSurface,
    ) -> Result<(), ContextError> {
        let fields = self.index.post_auth_inbound_no_body();
        if fields.is_empty() {
            ctx.set_state(PipelineState::PostAuthExtracted);
            return Ok(());
        }
        let claims = self.resolve_claims(fields, req);
        self.extract_stage(ctx, fields, req, claims.as_deref())?;
        ctx.set_state(PipelineState::PostAuthExtracted);
        Ok(())
    }

    // ── Stage 3 ────────────────────────────────────────────────────────────

    /// Run BODY extraction over the parsed body tree. Failures of
    /// non-required fields are swallowed; BODY fields cannot be required.
    pub fn on_body_parsed(
        &self,
        ctx: &Arc<RequestContext>,
        body: &dyn JsonTree,
    ) -> Result<(), ContextError> {
        for entry in self.index.post_auth_inbound_body() {
            let Some(ext) = entry.inbound.as_ref() else {
                continue;
            };
            let extracted = source::extract_from_body(ext, body, &self.syntax);
            match self.finish_value(ctx, entry, ext, extracted.map(|value| (ext, value))) {
                Ok(Some(value)) => self.store(ctx, entry, value),
                Ok(None) => {}
                Err(err) => {
                    debug!(field = %entry.name, error = %err, "body extraction failed");
                }
            }
        }
        ctx.set_state(PipelineState::BodyExtracted);
        Ok(())
    }

    // ── Stage 4 ────────────────────────────────────────────────────────────

    /// Enrich the upstream response from the context. Running this twice
    /// with the same context produces identical output.
    pub fn on_before_response_write(
        &self,
        ctx: &Arc<RequestContext>,
        resp: &mut dyn ResponseSurface,
    ) -> Result<(), ContextError> {
        let snapshot = ctx.store().snapshot();
        let lookup = |name: &str| snapshot.get(name).cloned();
        for entry in self.index.upstream_outbound() {
            let Some(spec) = entry.upstream_outbound.as_ref() else {
                continue;
            };
            let value = match self.render_enrichment(&entry.name, spec, &lookup) {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(err) => {
                    debug!(error = %err, "response enrichment skipped");
                    continue;
                }
            };
            source::enrich_upstream_response(
                resp,
                spec.enrich_as,
                &spec.key,
                &value,
                spec.overwrite,
                &self.globals.cookie,
            );
        }
        ctx.set_state(PipelineState::ResponseEnriched);
        Ok(())
    }

    // ── Stage 5 ────────────────────────────────────────────────────────────

    /// Tear the context down. Idempotent; always called, including after a
    /// stage-1/2 failure or cancellation.
    pub fn on_request_complete(&self, ctx: &Arc<RequestContext>) {
        ctx.store().clear();
        ctx.set_state(PipelineState::TornDown);
    }

    // ── Downstream: propagation ────────────────────────────────────────────

    /// Write context fields onto an outbound request. Best-effort: a field
    /// that fails to render is logged and skipped, never failing the call.
    ///
    /// `system_id` engages the per-field `ext-sys-ids` gate when the client
    /// was built for a named target system.
    pub fn propagate_downstream(
        &self,
        ctx: &RequestContext,
        out: &mut dyn OutboundSurface,
        system_id: Option<&str>,
    ) {
        if let Some(request_id) = ctx.store().get(REQUEST_ID_FIELD) {
            out.insert_header(REQUEST_ID_HEADER, &request_id);
        }
        if let Some(correlation_id) = ctx.store().get(CORRELATION_ID_FIELD) {
            out.insert_header(CORRELATION_ID_HEADER, &correlation_id);
        }

        let snapshot = ctx.store().snapshot();
        let lookup = |name: &str| snapshot.get(name).cloned();
        for entry in self.index.downstream_outbound() {
            let Some(spec) = entry.downstream_outbound.as_ref() else {
                continue;
            };
            if let Some(system) = system_id {
                if !spec.ext_sys_ids.is_empty()
                    && !spec.ext_sys_ids.iter().any(|id| id == system)
                {
                    continue;
                }
            }
            match self.render_enrichment(&entry.name, spec, &lookup) {
                Ok(Some(value)) => {
                    source::enrich_outbound_request(
                        out,
                        spec.enrich_as,
                        &spec.key,
                        &value,
                        spec.overwrite,
                    );
                }
                Ok(None) => continue,
                Err(err) => {
                    // Propagation is best-effort: this field is dropped, the
                    // call and the remaining fields proceed.
                    error!(error = %err, "downstream propagation failed");
                    continue;
                }
            }
        }
    }

    // ── Downstream: capture ────────────────────────────────────────────────

    /// Read configured fields out of a downstream response into the context.
    /// Downstream values overwrite earlier upstream-derived values for the
    /// same names; concurrent captures are last-writer-wins.
    pub fn capture_downstream(&self, ctx: &RequestContext, resp: &dyn DownstreamResponse) {
        for entry in self.index.downstream_inbound() {
            let Some(ext) = entry.downstream_inbound.as_ref() else {
                continue;
            };
            let extracted = source::extract_from_downstream(ext, resp, &self.syntax);
            let snapshot = ctx.store().snapshot();
            let arc_ctx_value = |name: &str| snapshot.get(name).cloned();
            let finished = self.transform_and_validate(entry, ext, extracted, &arc_ctx_value);
            match finished {
                Ok(Some(value)) => {
                    match entry.mask_pattern.as_deref() {
                        Some(pattern) => {
                            let masked = mask::render(pattern, &value);
                            ctx.store().put_with_mask(&entry.name, value, masked);
                        }
                        None => ctx.store().put(&entry.name, value),
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(field = %entry.name, error = %err, "downstream capture failed");
                }
            }
        }
    }

    // ── Shared extraction machinery ────────────────────────────────────────

    /// Run one stage over `fields`, collecting every missing required name
    /// so the host can report them all in a single 400.
    fn extract_stage(
        &self,
        ctx: &Arc<RequestContext>,
        fields: &[Arc<FieldEntry>],
        req: &dyn RequestSurface,
        claims: Option<&serde_json::Value>,
    ) -> Result<(), ContextError> {
        let mut missing = Vec::new();
        for entry in fields {
            let Some(ext) = entry.inbound.as_ref() else {
                continue;
            };
            let extracted = self.extract_with_fallback(entry, ext, req, claims);
            match self.finish_value(ctx, entry, ext, extracted) {
                Ok(Some(value)) => self.store(ctx, entry, value),
                Ok(None) => {
                    if ext.required {
                        missing.push(entry.name.clone());
                    }
                }
                Err(err) => {
                    if ext.required {
                        debug!(field = %entry.name, error = %err, "required field invalid");
                        missing.push(entry.name.clone());
                    } else {
                        debug!(field = %entry.name, error = %err, "field skipped");
                    }
                }
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ContextError::MissingRequiredFields(missing))
        }
    }

    /// Walk the primary spec and its fallback chain until one yields a
    /// value. Returns the producing spec alongside the value so its
    /// transformation applies, not the root's.
    fn extract_with_fallback<'a>(
        &self,
        entry: &FieldEntry,
        ext: &'a CompiledExtraction,
        req: &dyn RequestSurface,
        claims: Option<&serde_json::Value>,
    ) -> Option<(&'a CompiledExtraction, String)> {
        let mut cursor = Some(ext);
        while let Some(spec) = cursor {
            if let Some(value) =
                source::extract_from_request(spec, &entry.name, req, &self.globals, claims, &self.syntax)
            {
                return Some((spec, value));
            }
            cursor = spec.fallback.as_deref();
        }
        None
    }

    /// Apply generation, default, transformation and validation to an
    /// extraction outcome, per the fixed ordering.
    fn finish_value(
        &self,
        ctx: &Arc<RequestContext>,
        entry: &FieldEntry,
        root: &CompiledExtraction,
        extracted: Option<(&CompiledExtraction, String)>,
    ) -> Result<Option<String>, ContextError> {
        let snapshot = ctx.store().snapshot();
        let lookup = |name: &str| snapshot.get(name).cloned();
        let (producer, value, from_default) = match extracted {
            Some((producer, value)) => (producer, value, false),
            None => {
                if root.generate_if_absent {
                    if let Some(generator) = root.generator {
                        (root, generate::generate(generator), false)
                    } else if let Some(default) = root.default_value.clone() {
                        (root, default, true)
                    } else {
                        return Ok(None);
                    }
                } else if let Some(default) = root.default_value.clone() {
                    (root, default, true)
                } else {
                    return Ok(None);
                }
            }
        };
        self.transform_one(entry, producer, value, from_default, &lookup)
    }

    /// Same ordering for a spec that extracts outside the staged flow
    /// (downstream capture).
    fn transform_and_validate(
        &self,
        entry: &FieldEntry,
        ext: &CompiledExtraction,
        extracted: Option<String>,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Option<String>, ContextError> {
        let (value, from_default) = match extracted {
            Some(value) => (value, false),
            None => match ext.default_value.clone() {
                Some(default) => (default, true),
                None => return Ok(None),
            },
        };
        self.transform_one(entry, ext, value, from_default, lookup)
    }

    fn transform_one(
        &self,
        entry: &FieldEntry,
        spec: &CompiledExtraction,
        value: String,
        from_default: bool,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Option<String>, ContextError> {
        // Defaults are stored verbatim; transformation and validation only
        // apply to values that actually came off a surface or generator.
        if from_default {
            return Ok(Some(value));
        }
        let value = match spec.transformation {
            Some(transformation) => transform::apply(
                transformation,
                &value,
                spec.transform_expression.as_deref(),
                lookup,
            )
            .map_err(|e| ContextError::TransformFailed {
                field: entry.name.clone(),
                reason: e.to_string(),
            })?,
            None => value,
        };
        if let Some(pattern) = spec.validation.as_ref() {
            if !transform::matches_fully(pattern, &value) {
                if spec.required {
                    return Err(ContextError::ValidationFailed {
                        field: entry.name.clone(),
                    });
                }
                debug!(field = %entry.name, "value failed validation, treated as absent");
                return Ok(None);
            }
        }
        Ok(Some(value))
    }

    fn store(&self, ctx: &Arc<RequestContext>, entry: &FieldEntry, value: String) {
        match entry.mask_pattern.as_deref() {
            Some(pattern) => {
                let masked = mask::render(pattern, &value);
                ctx.store().put_with_mask(&entry.name, value, masked);
            }
            None => ctx.store().put(&entry.name, value),
        }
    }

    /// Resolve the claim set once per request when any stage-2 field needs
    /// it: TOKEN header → strip prefix → parse (cached), gated by
    /// `extract-unverified-claims`.
    fn resolve_claims(
        &self,
        fields: &[Arc<FieldEntry>],
        req: &dyn RequestSurface,
    ) -> Option<Arc<serde_json::Value>> {
        let needs_claims = fields.iter().any(|e| {
            e.inbound
                .as_ref()
                .is_some_and(|ext| ext.source == Source::Claim)
        });
        if !needs_claims || !self.globals.token.extract_unverified_claims {
            return None;
        }
        let token = source::token::extract(req, &self.globals.token)?;
        self.token_cache.claims_for(&token)
    }

    /// Resolve and render one enrichment value. `Ok(None)` means skip: the
    /// field is absent or the condition is false.
    fn render_enrichment(
        &self,
        field: &str,
        spec: &crate::config::EnrichmentSpec,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Option<String>, ContextError> {
        let base = match spec.value_as {
            ValueAs::Expression => {
                if lookup(field).is_none() {
                    return Ok(None);
                }
                transform::render_template(spec.value.as_deref().unwrap_or_default(), lookup)
            }
            _ => match (spec.value.clone(), lookup(field)) {
                (Some(literal), Some(_)) => literal,
                (None, Some(value)) => value,
                (_, None) => return Ok(None),
            },
        };
        if !transform::evaluate_condition(spec.condition.as_deref(), lookup) {
            return Ok(None);
        }
        transform::render_value_as(spec.value_as, &base)
            .map(Some)
            .map_err(|e| ContextError::PropagationFailed {
                field: field.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Run `future` with `ctx` ambient, honoring `propagate-to-async`.
pub async fn with_ambient_context<F>(
    engine: &ContextEngine,
    ctx: Arc<RequestContext>,
    future: F,
) -> F::Output
where
    F: std::future::Future,
{
    if engine.filter_config().propagate_to_async {
        scope::scope(ctx, future).await
    } else {
        future.await
    }
}
