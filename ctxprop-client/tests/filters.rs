use std::sync::Arc;

use ctxprop_core::config::RequestContextConfig;
use ctxprop_core::pipeline::ContextEngine;
use ctxprop_core::{scope, RequestContext};
use ctxprop_client::ContextClientBuilder;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CONFIG: &str = r#"
fields:
  requestId:
    upstream:
      inbound:
        source: HEADER
        key: X-Request-Id
        generate-if-absent: true
        generator: UUID
  partyId:
    upstream:
      inbound: { source: HEADER, key: X-Party-ID }
    downstream:
      outbound: { enrich-as: HEADER, key: X-Party-ID }
  userToken:
    upstream:
      inbound: { source: HEADER, key: X-User-Token }
    downstream:
      outbound:
        enrich-as: HEADER
        key: X-User-Token
        ext-sys-ids: [user-service]
  downstreamServiceVersion:
    downstream:
      inbound: { source: HEADER, key: X-Service-Version }
"#;

const BODY_CAPTURE_CONFIG: &str = r#"
fields:
  downstreamStatus:
    downstream:
      inbound: { source: BODY, key: result.status }
"#;

fn engine(yaml: &str) -> Arc<ContextEngine> {
    let config = RequestContextConfig::from_yaml_str(yaml).unwrap();
    Arc::new(ContextEngine::new(config).unwrap())
}

fn context(engine: &Arc<ContextEngine>) -> Arc<RequestContext> {
    Arc::new(RequestContext::new(engine.index().clone()))
}

async fn mounted_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/downstream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Service-Version", "v2.1.0")
                .set_body_json(serde_json::json!({"ok": true})),
        )
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn propagation_carries_fields_and_tracing_headers() {
    let engine = engine(CONFIG);
    let server = mounted_server().await;
    let ctx = context(&engine);
    ctx.set_field("requestId", "r-123");
    ctx.set_field("partyId", "p1");

    let client = ContextClientBuilder::new(engine).create();
    let url = format!("{}/downstream", server.uri());
    let resp = scope::scope(ctx, async move { client.get(&url).send().await })
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let headers = &requests[0].headers;
    assert_eq!(headers.get("x-party-id").unwrap(), "p1");
    assert_eq!(headers.get("x-request-id").unwrap(), "r-123");
}

#[tokio::test]
async fn no_context_means_passthrough() {
    let engine = engine(CONFIG);
    let server = mounted_server().await;

    let client = ContextClientBuilder::new(engine).create();
    let resp = client
        .get(format!("{}/downstream", server.uri()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("x-request-id").is_none());
    assert!(requests[0].headers.get("x-party-id").is_none());
}

#[tokio::test]
async fn request_id_header_tracks_context_presence() {
    let engine = engine(CONFIG);
    let server = mounted_server().await;
    let ctx = context(&engine);
    ctx.set_field("partyId", "p1"); // no requestId set

    let client = ContextClientBuilder::new(engine).create();
    let url = format!("{}/downstream", server.uri());
    scope::scope(ctx, async move { client.get(&url).send().await })
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("x-request-id").is_none());
    assert_eq!(requests[0].headers.get("x-party-id").unwrap(), "p1");
}

#[tokio::test]
async fn ext_sys_ids_gate_selects_target_systems() {
    let engine = engine(CONFIG);
    let server = mounted_server().await;
    let ctx = context(&engine);
    ctx.set_field("requestId", "r-5");
    ctx.set_field("userToken", "tok-9");

    let builder = ContextClientBuilder::new(engine);
    let user_client = builder.create_for_system("user-service");
    let payment_client = builder.create_for_system("payment-service");

    let url = format!("{}/downstream", server.uri());
    scope::scope(ctx, async move {
        user_client.get(&url).send().await.unwrap();
        payment_client.get(&url).send().await.unwrap();
    })
    .await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].headers.get("x-user-token").unwrap(), "tok-9");
    assert!(requests[1].headers.get("x-user-token").is_none());
    assert_eq!(requests[0].headers.get("x-request-id").unwrap(), "r-5");
    assert_eq!(requests[1].headers.get("x-request-id").unwrap(), "r-5");
}

#[tokio::test]
async fn capture_stores_downstream_header_fields() {
    let engine = engine(CONFIG);
    let server = mounted_server().await;
    let ctx = context(&engine);
    ctx.set_field("requestId", "r-7");

    let client = ContextClientBuilder::new(engine).create();
    let url = format!("{}/downstream", server.uri());
    scope::scope(ctx.clone(), async move { client.get(&url).send().await })
        .await
        .unwrap();

    assert_eq!(
        ctx.get("downstreamServiceVersion"),
        Some("v2.1.0".to_string())
    );
}

#[tokio::test]
async fn body_capture_buffers_and_still_serves_the_caller() {
    let engine = engine(BODY_CAPTURE_CONFIG);
    assert!(engine.index().requires_body_capture());

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/job"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"result": {"status": "DONE", "id": 4}})),
        )
        .mount(&server)
        .await;

    let ctx = context(&engine);
    let client = ContextClientBuilder::new(engine).create();
    let url = format!("{}/job", server.uri());
    let body: serde_json::Value = scope::scope(ctx.clone(), async move {
        client.get(&url).send().await.unwrap().json().await
    })
    .await
    .unwrap();

    // The caller sees the body unchanged even though it was buffered.
    assert_eq!(body["result"]["id"], 4);
    assert_eq!(ctx.get("downstreamStatus"), Some("DONE".to_string()));
}

#[tokio::test]
async fn oversized_bodies_skip_capture_but_not_the_caller() {
    let yaml = format!(
        "{BODY_CAPTURE_CONFIG}\nfilter-config:\n  max-body-capture-bytes: 16\n"
    );
    let engine = engine(&yaml);

    let server = MockServer::start().await;
    let large = serde_json::json!({"result": {"status": "DONE", "padding": "x".repeat(64)}});
    Mock::given(method("GET"))
        .and(path("/job"))
        .respond_with(ResponseTemplate::new(200).set_body_json(large))
        .mount(&server)
        .await;

    let ctx = context(&engine);
    let client = ContextClientBuilder::new(engine).create();
    let url = format!("{}/job", server.uri());
    let text = scope::scope(ctx.clone(), async move {
        client.get(&url).send().await.unwrap().text().await
    })
    .await
    .unwrap();

    assert!(text.contains("padding"));
    assert_eq!(ctx.get("downstreamStatus"), None);
}

#[tokio::test]
async fn selective_filters_disable_propagation() {
    let engine = engine(CONFIG);
    let server = mounted_server().await;
    let ctx = context(&engine);
    ctx.set_field("requestId", "r-9");
    ctx.set_field("partyId", "p1");

    let client = ContextClientBuilder::new(engine)
        .create_with_selective_filters(false, true, false);
    let url = format!("{}/downstream", server.uri());
    scope::scope(ctx.clone(), async move { client.get(&url).send().await })
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("x-request-id").is_none());
    assert!(requests[0].headers.get("x-party-id").is_none());
    // Capture still ran.
    assert_eq!(
        ctx.get("downstreamServiceVersion"),
        Some("v2.1.0".to_string())
    );
}

#[tokio::test]
async fn error_statuses_pass_through_unchanged() {
    let engine = engine(CONFIG);
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let ctx = context(&engine);
    ctx.set_field("requestId", "r-11");
    let client = ContextClientBuilder::new(engine).create();
    let url = format!("{}/broken", server.uri());
    let resp = scope::scope(ctx, async move { client.get(&url).send().await })
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 502);
    assert_eq!(resp.text().await.unwrap(), "bad gateway");
}
