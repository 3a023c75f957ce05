//! Pull-APIs shaping the context for metrics, logging and tracing sinks.

use ctxprop_core::config::{CardinalityTier, FieldLogLevel};
use ctxprop_core::RequestContext;
use indexmap::IndexMap;

/// Metric tags for every field within the cardinality ceiling.
///
/// Tiers are cumulative: a `MEDIUM` ceiling includes `LOW` fields. Sensitive
/// fields render their mask.
pub fn metrics_fields(
    ctx: &RequestContext,
    ceiling: CardinalityTier,
) -> IndexMap<String, String> {
    let mut out = IndexMap::new();
    for entry in ctx.index().metrics_fields(ceiling) {
        if let Some(value) = ctx.get_display(&entry.name) {
            out.insert(entry.metric_tag.clone(), value);
        }
    }
    out
}

/// MDC entries for every logging-enabled field present in the context.
pub fn logging_fields(ctx: &RequestContext) -> IndexMap<String, String> {
    let mut out = IndexMap::new();
    for entry in ctx.index().logging_fields() {
        if let Some(value) = ctx.get_display(&entry.name) {
            out.insert(entry.mdc_key.clone(), value);
        }
    }
    out
}

/// MDC entries restricted to fields whose minimum level is at or below
/// `level`.
pub fn logging_fields_at(ctx: &RequestContext, level: FieldLogLevel) -> IndexMap<String, String> {
    let mut out = IndexMap::new();
    for entry in ctx.index().logging_fields() {
        if entry.min_log_level > level {
            continue;
        }
        if let Some(value) = ctx.get_display(&entry.name) {
            out.insert(entry.mdc_key.clone(), value);
        }
    }
    out
}

/// MDC entries as a JSON tree, expanding dotted keys into nested objects
/// for the fields configured with `nested-from-dotted-key`.
pub fn logging_fields_nested(ctx: &RequestContext) -> serde_json::Value {
    let mut flat = IndexMap::new();
    let mut nested = IndexMap::new();
    for entry in ctx.index().logging_fields() {
        if let Some(value) = ctx.get_display(&entry.name) {
            if entry.nested_mdc {
                nested.insert(entry.mdc_key.clone(), value);
            } else {
                flat.insert(entry.mdc_key.clone(), value);
            }
        }
    }
    let mut tree = nested_from_dotted(&nested);
    if let Some(object) = tree.as_object_mut() {
        for (key, value) in flat {
            object.insert(key, serde_json::Value::String(value));
        }
    }
    tree
}

/// Span tags for every tracing-enabled field present in the context.
pub fn tracing_fields(ctx: &RequestContext) -> IndexMap<String, String> {
    let mut out = IndexMap::new();
    for entry in ctx.index().tracing_fields() {
        if let Some(value) = ctx.get_display(&entry.name) {
            out.insert(entry.trace_tag.clone(), value);
        }
    }
    out
}

/// Span tags as a JSON tree, expanding dotted tag names into nested objects
/// for the fields that ask for it.
pub fn tracing_tags_nested(ctx: &RequestContext) -> serde_json::Value {
    let mut flat = IndexMap::new();
    let mut nested = IndexMap::new();
    for entry in ctx.index().tracing_fields() {
        if let Some(value) = ctx.get_display(&entry.name) {
            if entry.nested_trace_tags {
                nested.insert(entry.trace_tag.clone(), value);
            } else {
                flat.insert(entry.trace_tag.clone(), value);
            }
        }
    }
    let mut tree = nested_from_dotted(&nested);
    if let Some(object) = tree.as_object_mut() {
        for (tag, value) in flat {
            object.insert(tag, serde_json::Value::String(value));
        }
    }
    tree
}

/// Expand dotted keys (`user.id`) into nested JSON objects. Later entries
/// win on collision.
pub fn nested_from_dotted(map: &IndexMap<String, String>) -> serde_json::Value {
    let mut root = serde_json::Map::new();
    for (key, value) in map {
        let mut cursor = &mut root;
        let mut segments = key.split('.').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                cursor.insert(
                    segment.to_string(),
                    serde_json::Value::String(value.clone()),
                );
            } else {
                let slot = cursor
                    .entry(segment.to_string())
                    .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
                if !slot.is_object() {
                    *slot = serde_json::Value::Object(serde_json::Map::new());
                }
                let Some(next) = slot.as_object_mut() else {
                    break;
                };
                cursor = next;
            }
        }
    }
    serde_json::Value::Object(root)
}
