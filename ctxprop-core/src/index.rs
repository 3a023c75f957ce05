//! Precomputed projections of the field configuration.
//!
//! The index is built once at startup and shared read-only by every request.
//! All per-request work iterates these tables; nothing on the hot path
//! re-parses configuration, compiles regexes or resolves custom names.

use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;

use crate::config::{
    CardinalityTier, EnrichmentSpec, ExtractionSpec, FieldConfig, FieldLogLevel, Generator,
    RequestContextConfig, Source, Transformation, MAX_FALLBACK_DEPTH,
};
use crate::error::ConfigError;
use crate::mask::DEFAULT_MASK;
use crate::pattern::PathPattern;

/// Extraction phase a field belongs to. Each field is in exactly one phase;
/// fields with no inbound spec are context-generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PreAuth,
    PostAuth,
    Body,
    Generated,
}

/// An extraction spec with everything expensive resolved ahead of time.
#[derive(Debug)]
pub struct CompiledExtraction {
    pub source: Source,
    pub key: String,
    pub token_type: Option<String>,
    pub claim_path: Option<String>,
    pub generate_if_absent: bool,
    pub generator: Option<Generator>,
    pub transformation: Option<Transformation>,
    pub transform_expression: Option<String>,
    pub validation: Option<Regex>,
    pub path_pattern: Option<PathPattern>,
    pub required: bool,
    pub default_value: Option<String>,
    pub fallback: Option<Box<CompiledExtraction>>,
}

impl CompiledExtraction {
    fn compile(field: &str, spec: &ExtractionSpec, allow_required: bool) -> Result<Self, ConfigError> {
        if spec.chain_depth() > MAX_FALLBACK_DEPTH {
            return Err(ConfigError::FallbackTooDeep {
                field: field.to_string(),
                depth: MAX_FALLBACK_DEPTH,
            });
        }
        Self::compile_inner(field, spec, allow_required)
    }

    fn compile_inner(
        field: &str,
        spec: &ExtractionSpec,
        allow_required: bool,
    ) -> Result<Self, ConfigError> {
        if spec.required && !allow_required {
            return Err(ConfigError::RequiredWithoutInbound(field.to_string()));
        }
        let validation = match &spec.validation_pattern {
            Some(pattern) => Some(Regex::new(pattern).map_err(|e| {
                ConfigError::InvalidValidationPattern {
                    field: field.to_string(),
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };
        let path_pattern = match spec.source {
            Source::Path => {
                if spec.key.is_empty() {
                    return Err(ConfigError::MissingKey {
                        field: field.to_string(),
                        source: "PATH",
                    });
                }
                Some(
                    PathPattern::parse(&spec.key).map_err(|reason| {
                        ConfigError::InvalidPathPattern {
                            field: field.to_string(),
                            reason,
                        }
                    })?,
                )
            }
            _ => None,
        };
        if spec.source == Source::Claim && spec.key.is_empty() && spec.claim_path.is_none() {
            return Err(ConfigError::MissingKey {
                field: field.to_string(),
                source: "CLAIM",
            });
        }
        if spec.transformation == Some(Transformation::Custom)
            && spec.transform_expression.is_none()
        {
            return Err(ConfigError::MissingTransformExpression(field.to_string()));
        }
        let fallback = match &spec.fallback {
            Some(inner) => Some(Box::new(Self::compile_inner(field, inner, allow_required)?)),
            None => None,
        };
        Ok(CompiledExtraction {
            source: spec.source,
            key: spec.key.clone(),
            token_type: spec.token_type.clone(),
            claim_path: spec.claim_path.clone(),
            generate_if_absent: spec.generate_if_absent,
            generator: spec.generator,
            transformation: spec.transformation,
            transform_expression: spec.transform_expression.clone(),
            validation,
            path_pattern,
            required: spec.required,
            default_value: spec.default_value.clone(),
            fallback,
        })
    }

    /// The claim path to traverse for CLAIM sources.
    pub fn effective_claim_path(&self) -> &str {
        self.claim_path.as_deref().unwrap_or(&self.key)
    }
}

/// Everything the pipeline needs to know about one field, resolved once.
#[derive(Debug)]
pub struct FieldEntry {
    pub name: String,
    pub phase: Phase,
    pub inbound: Option<CompiledExtraction>,
    pub upstream_outbound: Option<EnrichmentSpec>,
    pub downstream_outbound: Option<EnrichmentSpec>,
    pub downstream_inbound: Option<CompiledExtraction>,

    pub sensitive: bool,
    /// Present iff the field gets masked renderings on write.
    pub mask_pattern: Option<String>,
    pub audit_on_access: bool,
    pub deprecated: bool,

    pub metrics_enabled: bool,
    pub cardinality: CardinalityTier,
    pub histogram: bool,
    pub metric_tag: String,
    pub metric_name: Option<String>,

    pub logging_enabled: bool,
    pub mdc_key: String,
    pub min_log_level: FieldLogLevel,
    pub nested_mdc: bool,

    pub tracing_enabled: bool,
    pub trace_tag: String,
    pub nested_trace_tags: bool,
}

impl FieldEntry {
    /// Whether this field is required on the upstream inbound side.
    pub fn required(&self) -> bool {
        self.inbound.as_ref().is_some_and(|e| e.required)
    }
}

/// The immutable, process-wide index over all configured fields.
#[derive(Debug)]
pub struct FieldIndex {
    fields: IndexMap<String, Arc<FieldEntry>>,
    pre_auth_inbound: Vec<Arc<FieldEntry>>,
    post_auth_inbound_no_body: Vec<Arc<FieldEntry>>,
    post_auth_inbound_body: Vec<Arc<FieldEntry>>,
    upstream_outbound: Vec<Arc<FieldEntry>>,
    downstream_outbound: Vec<Arc<FieldEntry>>,
    downstream_inbound: Vec<Arc<FieldEntry>>,
    requires_body_capture: bool,
    metrics_low: Vec<Arc<FieldEntry>>,
    metrics_medium: Vec<Arc<FieldEntry>>,
    metrics_high: Vec<Arc<FieldEntry>>,
    logging_fields: Vec<Arc<FieldEntry>>,
    tracing_fields: Vec<Arc<FieldEntry>>,
    sensitive_fields: Vec<Arc<FieldEntry>>,
}

impl FieldIndex {
    /// Walk the configuration once and build every lookup table.
    pub fn build(config: &RequestContextConfig) -> Result<Self, ConfigError> {
        let mut fields = IndexMap::with_capacity(config.fields.len());
        for (name, field) in &config.fields {
            if name.is_empty() {
                return Err(ConfigError::Parse("field with empty name".to_string()));
            }
            let entry = Arc::new(Self::build_entry(name, field)?);
            fields.insert(name.clone(), entry);
        }

        let all: Vec<Arc<FieldEntry>> = fields.values().cloned().collect();
        let by_phase = |phase: Phase| -> Vec<Arc<FieldEntry>> {
            all.iter().filter(|e| e.phase == phase).cloned().collect()
        };
        let metrics_tier = |tier: CardinalityTier| -> Vec<Arc<FieldEntry>> {
            all.iter()
                .filter(|e| e.metrics_enabled && e.cardinality == tier)
                .cloned()
                .collect()
        };

        let downstream_inbound: Vec<Arc<FieldEntry>> = all
            .iter()
            .filter(|e| e.downstream_inbound.is_some())
            .cloned()
            .collect();
        let requires_body_capture = downstream_inbound
            .iter()
            .any(|e| e.downstream_inbound.as_ref().is_some_and(|s| s.source == Source::Body));

        Ok(FieldIndex {
            pre_auth_inbound: by_phase(Phase::PreAuth),
            post_auth_inbound_no_body: by_phase(Phase::PostAuth),
            post_auth_inbound_body: by_phase(Phase::Body),
            upstream_outbound: all
                .iter()
                .filter(|e| e.upstream_outbound.is_some())
                .cloned()
                .collect(),
            downstream_outbound: all
                .iter()
                .filter(|e| e.downstream_outbound.is_some())
                .cloned()
                .collect(),
            downstream_inbound,
            requires_body_capture,
            metrics_low: metrics_tier(CardinalityTier::Low),
            metrics_medium: metrics_tier(CardinalityTier::Medium),
            metrics_high: metrics_tier(CardinalityTier::High),
            logging_fields: all.iter().filter(|e| e.logging_enabled).cloned().collect(),
            tracing_fields: all.iter().filter(|e| e.tracing_enabled).cloned().collect(),
            sensitive_fields: all
                .iter()
                .filter(|e| e.mask_pattern.is_some())
                .cloned()
                .collect(),
            fields,
        })
    }

    fn build_entry(name: &str, field: &FieldConfig) -> Result<FieldEntry, ConfigError> {
        let inbound = match field.inbound() {
            Some(spec) => Some(CompiledExtraction::compile(name, spec, true)?),
            None => None,
        };
        let phase = match inbound.as_ref().map(|e| e.source) {
            None => Phase::Generated,
            Some(Source::Body) => Phase::Body,
            Some(source) if source.is_pre_auth() => Phase::PreAuth,
            Some(_) => Phase::PostAuth,
        };
        let downstream_inbound = match field.downstream_inbound() {
            Some(spec) => Some(CompiledExtraction::compile(name, spec, false)?),
            None => None,
        };

        let security = field.security.clone().unwrap_or_default();
        let mask_pattern = if security.sensitive {
            Some(
                security
                    .mask_pattern
                    .clone()
                    .unwrap_or_else(|| DEFAULT_MASK.to_string()),
            )
        } else {
            security.mask_pattern.clone()
        };

        let observability = field.observability.clone().unwrap_or_default();
        let metrics = observability.metrics.unwrap_or_default();
        let logging = observability.logging.unwrap_or_default();
        let tracing = observability.tracing.unwrap_or_default();

        // A sub-section that exists participates unless it explicitly says
        // `enabled: false`; custom names, non-default tiers and flags count
        // as implicit enablement. Explicit `false` always wins.
        let metrics_enabled = match field
            .observability
            .as_ref()
            .and_then(|o| o.metrics.as_ref())
        {
            None => false,
            Some(m) => m.enabled.unwrap_or(true),
        } && metrics.cardinality != CardinalityTier::None;
        let logging_enabled = match field
            .observability
            .as_ref()
            .and_then(|o| o.logging.as_ref())
        {
            None => false,
            Some(l) => l.enabled.unwrap_or(true),
        };
        let tracing_enabled = match field
            .observability
            .as_ref()
            .and_then(|o| o.tracing.as_ref())
        {
            None => false,
            Some(t) => t.enabled.unwrap_or(true),
        };

        let metadata = field.metadata.clone().unwrap_or_default();

        Ok(FieldEntry {
            name: name.to_string(),
            phase,
            inbound,
            upstream_outbound: field.upstream_outbound().cloned(),
            downstream_outbound: field.downstream_outbound().cloned(),
            downstream_inbound,
            sensitive: security.sensitive,
            mask_pattern,
            audit_on_access: security.audit_on_access,
            deprecated: metadata.deprecated,
            metrics_enabled,
            cardinality: metrics.cardinality,
            histogram: metrics.histogram,
            metric_tag: metrics.tag_name.unwrap_or_else(|| name.to_string()),
            metric_name: metrics.metric_name,
            logging_enabled,
            mdc_key: logging.mdc_key.unwrap_or_else(|| name.to_string()),
            min_log_level: logging.level,
            nested_mdc: logging.nested_from_dotted_key,
            tracing_enabled,
            trace_tag: tracing.tag_name.unwrap_or_else(|| name.to_string()),
            nested_trace_tags: tracing.nested_tags,
        })
    }

    // ── Table accessors ────────────────────────────────────────────────────

    pub fn entry(&self, name: &str) -> Option<&Arc<FieldEntry>> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn pre_auth_inbound(&self) -> &[Arc<FieldEntry>] {
        &self.pre_auth_inbound
    }

    pub fn post_auth_inbound_no_body(&self) -> &[Arc<FieldEntry>] {
        &self.post_auth_inbound_no_body
    }

    pub fn post_auth_inbound_body(&self) -> &[Arc<FieldEntry>] {
        &self.post_auth_inbound_body
    }

    pub fn upstream_outbound(&self) -> &[Arc<FieldEntry>] {
        &self.upstream_outbound
    }

    pub fn downstream_outbound(&self) -> &[Arc<FieldEntry>] {
        &self.downstream_outbound
    }

    pub fn downstream_inbound(&self) -> &[Arc<FieldEntry>] {
        &self.downstream_inbound
    }

    /// True when any downstream-inbound field reads the response body, which
    /// obliges the capture filter to buffer it.
    pub fn requires_body_capture(&self) -> bool {
        self.requires_body_capture
    }

    /// Metric-tagged fields safe at the given cardinality ceiling. Tiers are
    /// cumulative: requesting MEDIUM also returns LOW fields.
    pub fn metrics_fields(&self, ceiling: CardinalityTier) -> Vec<&Arc<FieldEntry>> {
        let mut out = Vec::new();
        if ceiling >= CardinalityTier::Low {
            out.extend(self.metrics_low.iter());
        }
        if ceiling >= CardinalityTier::Medium {
            out.extend(self.metrics_medium.iter());
        }
        if ceiling >= CardinalityTier::High {
            out.extend(self.metrics_high.iter());
        }
        out
    }

    pub fn logging_fields(&self) -> &[Arc<FieldEntry>] {
        &self.logging_fields
    }

    pub fn tracing_fields(&self) -> &[Arc<FieldEntry>] {
        &self.tracing_fields
    }

    pub fn sensitive_fields(&self) -> &[Arc<FieldEntry>] {
        &self.sensitive_fields
    }

    // ── Scalar lookups ─────────────────────────────────────────────────────

    pub fn mdc_key(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|e| e.mdc_key.as_str())
    }

    pub fn metric_tag_name(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|e| e.metric_tag.as_str())
    }

    pub fn trace_tag_name(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|e| e.trace_tag.as_str())
    }

    pub fn mask_pattern(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|e| e.mask_pattern.as_deref())
    }

    pub fn audit_on_access(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(|e| e.audit_on_access)
    }

    pub fn upstream_outbound_key(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|e| e.upstream_outbound.as_ref())
            .map(|s| s.key.as_str())
    }

    pub fn upstream_outbound_type(&self, name: &str) -> Option<crate::config::EnrichAs> {
        self.fields
            .get(name)
            .and_then(|e| e.upstream_outbound.as_ref())
            .map(|s| s.enrich_as)
    }
}
