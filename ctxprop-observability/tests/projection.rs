use std::sync::Arc;

use ctxprop_core::config::{CardinalityTier, FieldLogLevel, RequestContextConfig};
use ctxprop_core::index::FieldIndex;
use ctxprop_core::RequestContext;
use ctxprop_observability::{
    logging_fields, logging_fields_at, logging_fields_nested, metrics_fields, nested_from_dotted,
    tracing_fields, tracing_tags_nested,
};
use indexmap::IndexMap;

const CONFIG: &str = r#"
fields:
  tenantId:
    observability:
      metrics: { cardinality: LOW, tag-name: tenant }
      logging: { mdc-key: tenant_id }
      tracing: { tag-name: tenant.id, nested-tags: true }
  userId:
    observability:
      metrics: { cardinality: HIGH }
      logging: { level: DEBUG }
      tracing: {}
  userEmail:
    observability:
      logging: {}
      metrics: { cardinality: MEDIUM }
    security:
      sensitive: true
      mask-pattern: "***@***.***"
  userName:
    observability:
      logging: { mdc-key: user.name, nested-from-dotted-key: true }
  silent:
    observability:
      metrics: { enabled: false, cardinality: LOW }
"#;

fn context() -> Arc<RequestContext> {
    let config = RequestContextConfig::from_yaml_str(CONFIG).unwrap();
    let index = Arc::new(FieldIndex::build(&config).unwrap());
    let ctx = Arc::new(RequestContext::new(index));
    ctx.set_field("tenantId", "acme");
    ctx.set_field("userId", "u-42");
    ctx.set_field("userEmail", "x@y.com");
    ctx.set_field("silent", "hidden");
    ctx
}

#[test]
fn metrics_projection_respects_tiers_and_custom_names() {
    let ctx = context();
    let low = metrics_fields(&ctx, CardinalityTier::Low);
    assert_eq!(low.len(), 1);
    assert_eq!(low.get("tenant"), Some(&"acme".to_string()));

    let medium = metrics_fields(&ctx, CardinalityTier::Medium);
    assert_eq!(medium.len(), 2);

    let high = metrics_fields(&ctx, CardinalityTier::High);
    assert_eq!(high.len(), 3);
    assert_eq!(high.get("userId"), Some(&"u-42".to_string()));
}

#[test]
fn sensitive_fields_project_masked_everywhere() {
    let ctx = context();
    let metrics = metrics_fields(&ctx, CardinalityTier::High);
    assert_eq!(metrics.get("userEmail"), Some(&"***@***.***".to_string()));

    let logs = logging_fields(&ctx);
    assert_eq!(logs.get("userEmail"), Some(&"***@***.***".to_string()));
}

#[test]
fn explicitly_disabled_fields_never_project() {
    let ctx = context();
    assert!(!metrics_fields(&ctx, CardinalityTier::High).contains_key("silent"));
}

#[test]
fn logging_projection_uses_mdc_keys() {
    let ctx = context();
    let logs = logging_fields(&ctx);
    assert_eq!(logs.get("tenant_id"), Some(&"acme".to_string()));
    assert_eq!(logs.get("userId"), Some(&"u-42".to_string()));
}

#[test]
fn logging_projection_filters_by_minimum_level() {
    let ctx = context();
    let info = logging_fields_at(&ctx, FieldLogLevel::Debug);
    assert!(info.contains_key("userId"));
    let trace_only = logging_fields_at(&ctx, FieldLogLevel::Trace);
    assert!(!trace_only.contains_key("userId"));
    assert!(!trace_only.contains_key("tenant_id"));
}

#[test]
fn absent_fields_are_omitted_from_projections() {
    let config = RequestContextConfig::from_yaml_str(CONFIG).unwrap();
    let index = Arc::new(FieldIndex::build(&config).unwrap());
    let ctx = Arc::new(RequestContext::new(index));
    ctx.set_field("tenantId", "acme");
    let logs = logging_fields(&ctx);
    assert_eq!(logs.len(), 1);
    assert!(tracing_fields(&ctx).contains_key("tenant.id"));
}

#[test]
fn tracing_projection_supports_nested_tags() {
    let ctx = context();
    let flat = tracing_fields(&ctx);
    assert_eq!(flat.get("tenant.id"), Some(&"acme".to_string()));

    let nested = tracing_tags_nested(&ctx);
    assert_eq!(nested["tenant"]["id"], "acme");
    assert_eq!(nested["userId"], "u-42");
}

#[test]
fn logging_projection_can_nest_dotted_mdc_keys() {
    let ctx = context();
    ctx.set_field("userName", "ada");
    let tree = logging_fields_nested(&ctx);
    assert_eq!(tree["user"]["name"], "ada");
    assert_eq!(tree["tenant_id"], "acme");
}

#[test]
fn dotted_keys_expand_into_objects() {
    let mut map = IndexMap::new();
    map.insert("user.id".to_string(), "1".to_string());
    map.insert("user.org.name".to_string(), "acme".to_string());
    map.insert("plain".to_string(), "v".to_string());
    let tree = nested_from_dotted(&map);
    assert_eq!(tree["user"]["id"], "1");
    assert_eq!(tree["user"]["org"]["name"], "acme");
    assert_eq!(tree["plain"], "v");
}
