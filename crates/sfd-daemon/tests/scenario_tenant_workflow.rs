//! Per-tenant workflows loaded from layered config.
//!
//! Tenant `express` skips confirmation: pending -> processing -> shipped.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sfd_daemon::{routes, settings::DaemonSettings, state};
use tower::ServiceExt;

const CONFIG: &str = r#"
tenants:
  express:
    workflow:
      transitions:
        pending: [processing, cancelled]
        processing: [shipped, cancelled]
        shipped: [delivered]
        delivered: []
        cancelled: []
      cancel_status: cancelled
      cancel_exempt: [delivered]
"#;

fn make_router() -> (axum::Router, String) {
    let loaded = sfd_config::load_layered_yaml_from_strings(&[CONFIG]).unwrap();
    let settings = DaemonSettings::from_config(&loaded).unwrap();
    let st = Arc::new(state::AppState::from_settings(&settings));
    (routes::build_router(st), loaded.config_hash)
}

async fn call_json(
    router: axum::Router,
    req: Request<axum::body::Body>,
) -> (StatusCode, serde_json::Value) {
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

fn request(
    method: &str,
    uri: &str,
    tenant: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<axum::body::Body> {
    let mut b = Request::builder().method(method).uri(uri);
    if let Some(t) = tenant {
        b = b.header(routes::TENANT_HEADER, t);
    }
    match body {
        Some(v) => b
            .header("content-type", "application/json")
            .body(axum::body::Body::from(v.to_string()))
            .unwrap(),
        None => b.body(axum::body::Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn health_reports_config_hash() {
    let (router, hash) = make_router();
    let (status, json) = call_json(router, request("GET", "/v1/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["config_hash"], hash);
    assert_eq!(hash.len(), 64);
}

#[tokio::test]
async fn tenant_header_selects_workflow() {
    let (router, _) = make_router();

    let (_, json) = call_json(
        router.clone(),
        request("GET", "/v1/workflow/next?from=pending", Some("express"), None),
    )
    .await;
    assert_eq!(json["next"], serde_json::json!(["processing", "cancelled"]));

    // Unknown tenant falls back to the standard workflow.
    let (_, json) = call_json(
        router,
        request("GET", "/v1/workflow/next?from=pending", Some("other"), None),
    )
    .await;
    assert_eq!(
        json["next"],
        serde_json::json!(["confirmed", "processing", "cancelled"])
    );
}

#[tokio::test]
async fn workflow_endpoint_echoes_tenant() {
    let (router, _) = make_router();
    let (status, json) = call_json(
        router,
        request("GET", "/v1/workflow", Some("express"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["tenant"], "express");
    assert_eq!(json["workflow"]["transitions"]["confirmed"], serde_json::json!([]));
}

#[tokio::test]
async fn order_keeps_its_tenant_workflow() {
    let (router, _) = make_router();

    let (status, json) = call_json(
        router.clone(),
        request(
            "POST",
            "/v1/orders",
            Some("express"),
            Some(serde_json::json!({ "order_id": "x-1" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["tenant"], "express");

    // No header on the update: the order's own tenant still governs.
    let (status, json) = call_json(
        router.clone(),
        request(
            "POST",
            "/v1/orders/x-1/status",
            None,
            Some(serde_json::json!({ "status": "confirmed" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["path"], serde_json::json!([]));

    let (status, json) = call_json(
        router,
        request(
            "POST",
            "/v1/orders/x-1/status",
            None,
            Some(serde_json::json!({ "status": "processing" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "processing");
}
