use ctxprop_core::config::{CardinalityTier, RequestContextConfig};
use ctxprop_core::error::ConfigError;
use ctxprop_core::index::{FieldIndex, Phase};

fn build(yaml: &str) -> FieldIndex {
    let config = RequestContextConfig::from_yaml_str(yaml).unwrap();
    FieldIndex::build(&config).unwrap()
}

fn build_err(yaml: &str) -> ConfigError {
    let config = RequestContextConfig::from_yaml_str(yaml).unwrap();
    FieldIndex::build(&config).unwrap_err()
}

#[test]
fn fields_partition_into_phases() {
    let index = build(
        r#"
fields:
  fromHeader:
    upstream:
      inbound: { source: HEADER, key: X-A }
  fromQuery:
    upstream:
      inbound: { source: QUERY, key: q }
  fromCookie:
    upstream:
      inbound: { source: COOKIE, key: sid }
  fromClaim:
    upstream:
      inbound: { source: CLAIM, key: sub }
  fromPath:
    upstream:
      inbound: { source: PATH, key: "/users/{fromPath}" }
  fromBody:
    upstream:
      inbound: { source: BODY, key: data.id }
  apiHandler:
    observability:
      logging: {}
"#,
    );
    let names = |entries: &[std::sync::Arc<ctxprop_core::FieldEntry>]| -> Vec<String> {
        entries.iter().map(|e| e.name.clone()).collect()
    };
    assert_eq!(
        names(index.pre_auth_inbound()),
        vec!["fromHeader", "fromQuery", "fromCookie"]
    );
    assert_eq!(
        names(index.post_auth_inbound_no_body()),
        vec!["fromClaim", "fromPath"]
    );
    assert_eq!(names(index.post_auth_inbound_body()), vec!["fromBody"]);
    assert_eq!(index.entry("apiHandler").unwrap().phase, Phase::Generated);
    assert_eq!(index.len(), 7);
}

#[test]
fn outbound_tables_track_configured_directions() {
    let index = build(
        r#"
fields:
  partyId:
    upstream:
      inbound: { source: HEADER, key: X-Party-ID }
      outbound: { enrich-as: HEADER, key: X-Party-ID }
    downstream:
      outbound: { enrich-as: HEADER, key: X-Party-ID }
  serviceVersion:
    downstream:
      inbound: { source: HEADER, key: X-Service-Version }
"#,
    );
    assert_eq!(index.upstream_outbound().len(), 1);
    assert_eq!(index.downstream_outbound().len(), 1);
    assert_eq!(index.downstream_inbound().len(), 1);
    assert!(!index.requires_body_capture());
    assert_eq!(index.upstream_outbound_key("partyId"), Some("X-Party-ID"));
}

#[test]
fn body_sourced_capture_sets_the_buffer_flag() {
    let index = build(
        r#"
fields:
  downstreamStatus:
    downstream:
      inbound: { source: BODY, key: status.code }
"#,
    );
    assert!(index.requires_body_capture());
}

#[test]
fn observability_sections_enable_implicitly() {
    let index = build(
        r#"
fields:
  tenantId:
    upstream:
      inbound: { source: HEADER, key: X-Tenant-ID }
    observability:
      metrics: { cardinality: LOW }
      logging: { mdc-key: tenant }
      tracing: { tag-name: tenant.id }
"#,
    );
    let entry = index.entry("tenantId").unwrap();
    assert!(entry.metrics_enabled);
    assert!(entry.logging_enabled);
    assert!(entry.tracing_enabled);
    assert_eq!(index.mdc_key("tenantId"), Some("tenant"));
    assert_eq!(index.trace_tag_name("tenantId"), Some("tenant.id"));
    assert_eq!(index.metric_tag_name("tenantId"), Some("tenantId"));
}

#[test]
fn explicit_disable_beats_implicit_signals() {
    let index = build(
        r#"
fields:
  noisy:
    upstream:
      inbound: { source: HEADER, key: X-Noisy }
    observability:
      metrics: { enabled: false, cardinality: HIGH, tag-name: custom }
      logging: { enabled: false, mdc-key: custom }
"#,
    );
    let entry = index.entry("noisy").unwrap();
    assert!(!entry.metrics_enabled);
    assert!(!entry.logging_enabled);
    assert!(index.metrics_fields(CardinalityTier::High).is_empty());
    assert!(index.logging_fields().is_empty());
}

#[test]
fn metrics_tiers_are_cumulative() {
    let index = build(
        r#"
fields:
  low:
    observability:
      metrics: { cardinality: LOW }
  medium:
    observability:
      metrics: { cardinality: MEDIUM }
  high:
    observability:
      metrics: { cardinality: HIGH }
  untagged:
    observability:
      metrics: { cardinality: NONE }
"#,
    );
    assert_eq!(index.metrics_fields(CardinalityTier::Low).len(), 1);
    assert_eq!(index.metrics_fields(CardinalityTier::Medium).len(), 2);
    assert_eq!(index.metrics_fields(CardinalityTier::High).len(), 3);
    assert_eq!(index.metrics_fields(CardinalityTier::None).len(), 0);
}

#[test]
fn sensitive_fields_get_a_mask_pattern() {
    let index = build(
        r#"
fields:
  token:
    security:
      sensitive: true
  email:
    security:
      sensitive: true
      mask-pattern: "***@***.***"
"#,
    );
    assert_eq!(index.sensitive_fields().len(), 2);
    assert_eq!(index.mask_pattern("token"), Some("***"));
    assert_eq!(index.mask_pattern("email"), Some("***@***.***"));
}

#[test]
fn fallback_depth_is_bounded() {
    let mut spec = String::from("{ source: HEADER, key: h0");
    for i in 1..=9 {
        spec.push_str(&format!(", fallback: {{ source: HEADER, key: h{i}"));
    }
    spec.push_str(&"}".repeat(10));
    let err = build_err(&format!(
        "fields:\n  deep:\n    upstream:\n      inbound: {spec}\n"
    ));
    assert!(matches!(err, ConfigError::FallbackTooDeep { .. }), "got: {err}");
}

#[test]
fn invalid_validation_pattern_is_rejected() {
    let err = build_err(
        r#"
fields:
  bad:
    upstream:
      inbound: { source: HEADER, key: X-A, validation-pattern: "([" }
"#,
    );
    assert!(matches!(err, ConfigError::InvalidValidationPattern { .. }), "got: {err}");
}

#[test]
fn path_source_requires_a_placeholder_pattern() {
    let err = build_err(
        r#"
fields:
  noPlaceholder:
    upstream:
      inbound: { source: PATH, key: /users/list }
"#,
    );
    assert!(matches!(err, ConfigError::InvalidPathPattern { .. }), "got: {err}");
}

#[test]
fn required_downstream_inbound_is_rejected() {
    let err = build_err(
        r#"
fields:
  captured:
    downstream:
      inbound: { source: HEADER, key: X-V, required: true }
"#,
    );
    assert!(matches!(err, ConfigError::RequiredWithoutInbound(_)), "got: {err}");
}

#[test]
fn custom_transform_requires_an_expression() {
    let err = build_err(
        r#"
fields:
  combined:
    upstream:
      inbound: { source: HEADER, key: X-A, transformation: CUSTOM }
"#,
    );
    assert!(matches!(err, ConfigError::MissingTransformExpression(_)), "got: {err}");
}
