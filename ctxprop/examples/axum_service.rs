//! A small axum service with the full context pipeline installed.
//!
//! Run with `cargo run --example axum_service`, then:
//!
//! ```text
//! curl -H 'X-Party-ID: p1' http://localhost:3000/orders
//! ```
//!
//! The response carries a generated `X-Request-Id`; every outbound call the
//! handler makes through the context client would carry it too.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use ctxprop::axum::{ContextHandle, ContextLayer, PostAuthLayer};
use ctxprop::client::ContextClientBuilder;
use ctxprop::core::pipeline::ContextEngine;
use ctxprop::RequestContextConfig;

const CONFIG: &str = r#"
request-context:
  fields:
    requestId:
      upstream:
        inbound:
          source: HEADER
          key: X-Request-Id
          generate-if-absent: true
          generator: UUID
        outbound:
          enrich-as: HEADER
          key: X-Request-Id
          override: true
      observability:
        logging: { mdc-key: request_id }
    partyId:
      upstream:
        inbound: { source: HEADER, key: X-Party-ID }
      downstream:
        outbound: { enrich-as: HEADER, key: X-Party-ID }
      observability:
        metrics: { cardinality: MEDIUM }
        logging: {}
    tenantId:
      upstream:
        inbound:
          source: HEADER
          key: X-Tenant-ID
          fallback: { source: QUERY, key: tenant }
          default-value: default-tenant
  filter-config:
    exclude-patterns: ["/health"]
"#;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ctxprop=debug".into()),
        )
        .init();

    let config = RequestContextConfig::from_yaml_str(CONFIG).expect("config parses");
    let engine = Arc::new(ContextEngine::new(config).expect("config is consistent"));
    let clients = ContextClientBuilder::new(engine.clone());

    let app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route(
            "/orders",
            get({
                let clients = clients.clone();
                move |ctx: ContextHandle| {
                    let _downstream = clients.create_for_system("order-service");
                    async move {
                        // `_downstream.get(...).send().await` would carry
                        // X-Request-Id and X-Party-ID automatically here.
                        format!(
                            "tenant={} party={}",
                            ctx.get("tenantId").unwrap_or_default(),
                            ctx.get("partyId").unwrap_or_default(),
                        )
                    }
                }
            }),
        )
        .layer(PostAuthLayer::new(engine.clone()))
        .layer(ContextLayer::new(engine));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000")
        .await
        .expect("bind");
    tracing::info!("listening on http://127.0.0.1:3000");
    axum::serve(listener, app).await.expect("serve");
}
