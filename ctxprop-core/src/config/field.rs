//! Per-field configuration: what to extract, where from, how to transform,
//! validate, mask and propagate it.

use serde::Deserialize;

/// Request surface a field is extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Source {
    Header,
    Query,
    Cookie,
    Path,
    Session,
    Attribute,
    Token,
    Claim,
    Body,
    Form,
}

impl Source {
    /// Sources readable before authentication has run.
    pub fn is_pre_auth(self) -> bool {
        matches!(self, Source::Header | Source::Query | Source::Cookie)
    }
}

/// Value generator used when a field is absent and `generate-if-absent` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Generator {
    Uuid,
    Ulid,
    Timestamp,
    Sequence,
    Random,
    Nanoid,
}

/// Canonical transformation applied to an extracted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Transformation {
    Uppercase,
    Lowercase,
    Trim,
    Base64Encode,
    Base64Decode,
    UrlEncode,
    UrlDecode,
    HashSha256,
    Custom,
}

/// How an enrichment value is rendered onto the target surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueAs {
    #[default]
    String,
    Expression,
    JsonArray,
    JsonObject,
    Number,
    Boolean,
    Base64,
    UrlEncoded,
}

/// Target surface of an enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrichAs {
    Header,
    Query,
    Cookie,
    Path,
    Attribute,
    Body,
}

/// Coarse bound on how many distinct values a field may take. Governs
/// whether the field is safe to emit as a metric tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardinalityTier {
    None,
    #[default]
    Low,
    Medium,
    High,
}

/// Minimum log level at which a field is attached to log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldLogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// PII sensitivity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PiiLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
}

/// One extraction: read `key` from `source`, optionally falling back to
/// another extraction when absent. Fallback chains are finite; depth is
/// enforced at index build time.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExtractionSpec {
    pub source: Source,
    /// Surface-specific identifier: header name, query/cookie/form key,
    /// claim path, body path, URL pattern for PATH.
    #[serde(default)]
    pub key: String,
    /// Token flavor for TOKEN sources (informational).
    #[serde(default)]
    pub token_type: Option<String>,
    /// Claim path override for CLAIM sources; defaults to `key`.
    #[serde(default)]
    pub claim_path: Option<String>,
    #[serde(default)]
    pub generate_if_absent: bool,
    #[serde(default)]
    pub generator: Option<Generator>,
    #[serde(default)]
    pub transformation: Option<Transformation>,
    /// Template for `transformation = CUSTOM`; `#fieldName` placeholders
    /// resolve against previously stored fields.
    #[serde(default)]
    pub transform_expression: Option<String>,
    /// Regex the whole value must match.
    #[serde(default)]
    pub validation_pattern: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub fallback: Option<Box<ExtractionSpec>>,
    /// Outbound only: restrict propagation to these target systems.
    #[serde(default)]
    pub ext_sys_ids: Vec<String>,
}

impl ExtractionSpec {
    /// Minimal spec reading `key` from `source`, everything else defaulted.
    pub fn new(source: Source, key: impl Into<String>) -> Self {
        ExtractionSpec {
            source,
            key: key.into(),
            token_type: None,
            claim_path: None,
            generate_if_absent: false,
            generator: None,
            transformation: None,
            transform_expression: None,
            validation_pattern: None,
            required: false,
            default_value: None,
            fallback: None,
            ext_sys_ids: Vec::new(),
        }
    }

    /// Depth of the fallback chain rooted at this spec (1 = no fallback).
    pub fn chain_depth(&self) -> usize {
        let mut depth = 1;
        let mut cursor = self.fallback.as_deref();
        while let Some(spec) = cursor {
            depth += 1;
            cursor = spec.fallback.as_deref();
        }
        depth
    }
}

/// One enrichment: write `key` onto the target surface, rendering the value
/// according to `value-as`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EnrichmentSpec {
    pub enrich_as: EnrichAs,
    pub key: String,
    #[serde(default)]
    pub value_as: ValueAs,
    /// Literal value or template (`value-as = EXPRESSION`). When absent, the
    /// field's own context value is used.
    #[serde(default)]
    pub value: Option<String>,
    /// Replace an existing value instead of appending / skipping.
    #[serde(default, rename = "override")]
    pub overwrite: bool,
    /// Template predicate; the enrichment is skipped unless the rendered
    /// text is non-empty and not the literal `"false"`.
    #[serde(default)]
    pub condition: Option<String>,
    /// Downstream only: restrict to these target systems.
    #[serde(default)]
    pub ext_sys_ids: Vec<String>,
}

impl EnrichmentSpec {
    pub fn new(enrich_as: EnrichAs, key: impl Into<String>) -> Self {
        EnrichmentSpec {
            enrich_as,
            key: key.into(),
            value_as: ValueAs::String,
            value: None,
            overwrite: false,
            condition: None,
            ext_sys_ids: Vec::new(),
        }
    }
}

/// Upstream side of a field: inbound extraction from the caller's request,
/// outbound enrichment of the response written back to the caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UpstreamConfig {
    #[serde(default)]
    pub inbound: Option<ExtractionSpec>,
    #[serde(default)]
    pub outbound: Option<EnrichmentSpec>,
}

/// Downstream side of a field: outbound enrichment of requests to other
/// services, inbound capture from their responses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DownstreamConfig {
    #[serde(default)]
    pub outbound: Option<EnrichmentSpec>,
    #[serde(default)]
    pub inbound: Option<ExtractionSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub cardinality: CardinalityTier,
    #[serde(default)]
    pub tag_name: Option<String>,
    #[serde(default)]
    pub metric_name: Option<String>,
    #[serde(default)]
    pub histogram: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoggingConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub mdc_key: Option<String>,
    #[serde(default)]
    pub level: FieldLogLevel,
    /// Render a dotted MDC key (`user.id`) as a nested object in structured
    /// log output.
    #[serde(default)]
    pub nested_from_dotted_key: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TracingFieldConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub tag_name: Option<String>,
    #[serde(default)]
    pub nested_tags: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub metrics: Option<MetricsConfig>,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub tracing: Option<TracingFieldConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FieldSecurityConfig {
    #[serde(default)]
    pub sensitive: bool,
    /// Masking pattern: `***`, `*-N`, or an e-mail style pattern.
    #[serde(default)]
    pub mask_pattern: Option<String>,
    #[serde(default)]
    pub pii_level: PiiLevel,
    /// Emit an audit event whenever the raw value is read.
    #[serde(default)]
    pub audit_on_access: bool,
    #[serde(default)]
    pub encrypt_at_rest: bool,
    #[serde(default)]
    pub encrypt_in_transit: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FieldMetadata {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub since_version: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
}

/// Full declarative configuration of one named context field.
///
/// A field with no `upstream.inbound` spec is context-generated: it is
/// populated programmatically (e.g. the handler name) and still participates
/// in observability and enrichment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FieldConfig {
    #[serde(default)]
    pub upstream: Option<UpstreamConfig>,
    #[serde(default)]
    pub downstream: Option<DownstreamConfig>,
    #[serde(default)]
    pub observability: Option<ObservabilityConfig>,
    #[serde(default)]
    pub security: Option<FieldSecurityConfig>,
    #[serde(default)]
    pub metadata: Option<FieldMetadata>,
}

impl FieldConfig {
    pub fn inbound(&self) -> Option<&ExtractionSpec> {
        self.upstream.as_ref().and_then(|u| u.inbound.as_ref())
    }

    pub fn upstream_outbound(&self) -> Option<&EnrichmentSpec> {
        self.upstream.as_ref().and_then(|u| u.outbound.as_ref())
    }

    pub fn downstream_outbound(&self) -> Option<&EnrichmentSpec> {
        self.downstream.as_ref().and_then(|d| d.outbound.as_ref())
    }

    pub fn downstream_inbound(&self) -> Option<&ExtractionSpec> {
        self.downstream.as_ref().and_then(|d| d.inbound.as_ref())
    }

    pub fn sensitive(&self) -> bool {
        self.security.as_ref().is_some_and(|s| s.sensitive)
    }
}
