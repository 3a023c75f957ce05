//! Configuration model for the `request-context` document.
//!
//! Loading (files, profiles, env overlay) is the host's concern; this module
//! only defines the deserializable shape and the global source defaults. Use
//! [`RequestContextConfig::from_yaml_str`] / [`from_json_str`] to parse a
//! document in tests or hosts without a config framework.

mod field;

pub use field::{
    CardinalityTier, DownstreamConfig, EnrichAs, EnrichmentSpec, ExtractionSpec, FieldConfig,
    FieldLogLevel, FieldMetadata, FieldSecurityConfig, Generator, LoggingConfig, MetricsConfig,
    ObservabilityConfig, PiiLevel, Source, Transformation, TracingFieldConfig, UpstreamConfig,
    ValueAs,
};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::ConfigError;

/// Maximum fallback chain depth accepted at index build time.
pub const MAX_FALLBACK_DEPTH: usize = 8;

/// Global defaults for the TOKEN and CLAIM sources.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TokenDefaults {
    /// Header carrying the bearer token.
    pub header_name: String,
    /// Scheme prefix stripped from the header value.
    pub prefix: String,
    /// Allow CLAIM extraction from tokens the host has not verified.
    pub extract_unverified_claims: bool,
}

impl Default for TokenDefaults {
    fn default() -> Self {
        TokenDefaults {
            header_name: "Authorization".to_string(),
            prefix: "Bearer ".to_string(),
            extract_unverified_claims: true,
        }
    }
}

/// Cookie attribute policy applied to every cookie the framework writes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CookieDefaults {
    pub path: String,
    pub domain: Option<String>,
    /// `Strict`, `Lax`, or `None`.
    pub same_site: String,
    pub http_only: bool,
    pub secure: bool,
    pub max_age_seconds: Option<i64>,
}

impl Default for CookieDefaults {
    fn default() -> Self {
        CookieDefaults {
            path: "/".to_string(),
            domain: None,
            same_site: "Lax".to_string(),
            http_only: true,
            secure: true,
            max_age_seconds: None,
        }
    }
}

/// Session access defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SessionDefaults {
    /// Prefix prepended to every session attribute key the framework touches.
    pub attribute_prefix: String,
    /// Create a session on write when none exists.
    pub create_if_missing: bool,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        SessionDefaults {
            attribute_prefix: "ctx.".to_string(),
            create_if_missing: false,
        }
    }
}

/// Claim-path traversal syntax.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ClaimDefaults {
    /// Separator between nested object keys.
    pub nested_separator: String,
    /// Opening marker of an array index segment.
    pub array_index_open: char,
    /// Closing marker of an array index segment.
    pub array_index_close: char,
}

impl Default for ClaimDefaults {
    fn default() -> Self {
        ClaimDefaults {
            nested_separator: ".".to_string(),
            array_index_open: '[',
            array_index_close: ']',
        }
    }
}

/// Header hygiene limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HeaderDefaults {
    /// Values longer than this are truncated before storage; the truncated
    /// value is authoritative.
    pub max_value_length: usize,
    /// Header names that must never be extracted, compared case-insensitively.
    pub excluded: Vec<String>,
}

impl Default for HeaderDefaults {
    fn default() -> Self {
        HeaderDefaults {
            max_value_length: 4096,
            excluded: Vec::new(),
        }
    }
}

/// Global per-surface defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SourceConfiguration {
    pub token: TokenDefaults,
    pub cookie: CookieDefaults,
    pub session: SessionDefaults,
    pub claim: ClaimDefaults,
    pub header: HeaderDefaults,
}

/// Placement and scoping of the inbound filter chain.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FilterConfig {
    /// Run pre-auth extraction before the host's security filter.
    pub run_before_security: bool,
    /// Relative order among the host's filters.
    pub order: i32,
    /// Ant-style globs a path must match to be processed.
    pub include_patterns: Vec<String>,
    /// Ant-style globs that bypass the pipeline entirely. No context is
    /// created for excluded paths.
    pub exclude_patterns: Vec<String>,
    /// Make the context ambient to tasks spawned on behalf of the request.
    pub propagate_to_async: bool,
    /// Request-attribute key under which the context handle is stored.
    pub context_attribute_key: String,
    /// Largest downstream response body the capture filter will buffer.
    pub max_body_capture_bytes: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            run_before_security: true,
            order: -100,
            include_patterns: vec!["/**".to_string()],
            exclude_patterns: Vec::new(),
            propagate_to_async: true,
            context_attribute_key: "ctxprop.context".to_string(),
            max_body_capture_bytes: 256 * 1024,
        }
    }
}

/// Cache settings for parsed bearer tokens.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TokenCacheConfig {
    pub enabled: bool,
    pub ttl_seconds: u64,
    pub max_size: usize,
}

impl Default for TokenCacheConfig {
    fn default() -> Self {
        TokenCacheConfig {
            enabled: true,
            ttl_seconds: 300,
            max_size: 1024,
        }
    }
}

/// Root of the `request-context` configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RequestContextConfig {
    /// Configured fields, keyed by field name. Order is preserved and is the
    /// deterministic iteration order of every pipeline stage.
    pub fields: IndexMap<String, FieldConfig>,
    pub source_configuration: SourceConfiguration,
    pub filter_config: FilterConfig,
    pub token_cache: TokenCacheConfig,
}

impl RequestContextConfig {
    /// Parse a YAML document whose root holds the `request-context` section,
    /// or the section itself.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let root: serde_yaml::Value =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let section = root
            .get("request-context")
            .cloned()
            .unwrap_or(root);
        serde_yaml::from_value(section).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parse a JSON document, with the same `request-context` unwrapping.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let root: serde_json::Value =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let section = root
            .get("request-context")
            .cloned()
            .unwrap_or(root);
        serde_json::from_value(section).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Add a field programmatically. Only meaningful before the index is
    /// built; the index itself is immutable.
    pub fn with_field(mut self, name: impl Into<String>, field: FieldConfig) -> Self {
        self.fields.insert(name.into(), field);
        self
    }
}
