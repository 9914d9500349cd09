//! Axum router and all HTTP handlers for sfd-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Tests compose the bare router directly.
//!
//! Workflow endpoints resolve the tenant from the `x-tenant-id` header.
//! Order endpoints use the tenant the order was created under, so an order
//! is always validated against the same workflow.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use sfd_orders::{
    check_status_update, OrderStatus, StatusUpdateRequest, TransitionVerdict, UpdateRefusal,
    WorkflowSpec,
};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    api_types::{
        CreateOrderRequest, ErrorResponse, HealthResponse, NextStatusesQuery,
        NextStatusesResponse, StatusUpdateBody, TransitionCheckRequest, TransitionCheckResponse,
        TransitionRefusedResponse, WorkflowResponse,
    },
    state::{uptime_secs, AppState, BusMsg, OrderRecord},
};

pub const TENANT_HEADER: &str = "x-tenant-id";

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/stream", get(stream))
        .route("/v1/workflow", get(workflow))
        .route("/v1/workflow/next", get(workflow_next))
        .route("/v1/workflow/check", post(workflow_check))
        .route("/v1/orders", post(create_order))
        .route("/v1/orders/:order_id", get(get_order))
        .route("/v1/orders/:order_id/status", post(update_order_status))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn tenant_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn error(status: StatusCode, code: &str, detail: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: code.to_string(),
            detail: detail.into(),
        }),
    )
        .into_response()
}

fn parse_status(label: &str) -> Result<OrderStatus, Response> {
    label
        .parse::<OrderStatus>()
        .map_err(|e| error(StatusCode::BAD_REQUEST, "UNKNOWN_STATUS", e.to_string()))
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            uptime_secs: uptime_secs(),
            config_hash: st.config_hash.clone(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/workflow
// ---------------------------------------------------------------------------

pub(crate) async fn workflow(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let tenant = tenant_from(&headers);
    let table = st.validator_for(tenant.as_deref()).table();
    let terminal = OrderStatus::ALL
        .into_iter()
        .filter(|s| table.is_terminal(*s))
        .collect();

    (
        StatusCode::OK,
        Json(WorkflowResponse {
            tenant,
            workflow: WorkflowSpec::from_table(table),
            terminal,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/workflow/next?from=<status>
// ---------------------------------------------------------------------------

pub(crate) async fn workflow_next(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<NextStatusesQuery>,
) -> Response {
    let from = match parse_status(&q.from) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let tenant = tenant_from(&headers);
    let next = st
        .validator_for(tenant.as_deref())
        .valid_next_statuses(from);

    (StatusCode::OK, Json(NextStatusesResponse { from, next })).into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/workflow/check
// ---------------------------------------------------------------------------

/// Dry run of the status-update check. Refusals are a normal 200 answer
/// here; only unknown labels are a client error.
pub(crate) async fn workflow_check(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<TransitionCheckRequest>,
) -> Response {
    let (from, to) = match (parse_status(&req.from), parse_status(&req.to)) {
        (Ok(f), Ok(t)) => (f, t),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let tenant = tenant_from(&headers);
    let verdict = st.validator_for(tenant.as_deref()).check_transition(from, to);

    let body = match verdict {
        TransitionVerdict::Allowed => TransitionCheckResponse {
            allowed: true,
            path: Vec::new(),
            message: None,
        },
        TransitionVerdict::Refused { path, message, .. } => TransitionCheckResponse {
            allowed: false,
            path,
            message: Some(message),
        },
    };

    (StatusCode::OK, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/orders
// ---------------------------------------------------------------------------

pub(crate) async fn create_order(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateOrderRequest>,
) -> Response {
    let order_id = req
        .order_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let tenant = tenant_from(&headers);

    let mut orders = st.orders.write().await;
    if orders.contains_key(&order_id) {
        return error(
            StatusCode::CONFLICT,
            "ORDER_EXISTS",
            format!("order '{order_id}' already exists"),
        );
    }

    let rec = OrderRecord::new(order_id.clone(), tenant, Utc::now());
    orders.insert(order_id.clone(), rec.clone());
    drop(orders);

    info!(order_id = %order_id, tenant = ?rec.tenant, "orders/create");
    (StatusCode::CREATED, Json(rec)).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/orders/:order_id
// ---------------------------------------------------------------------------

pub(crate) async fn get_order(
    State(st): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Response {
    match st.orders.read().await.get(&order_id) {
        Some(rec) => (StatusCode::OK, Json(rec.clone())).into_response(),
        None => error(
            StatusCode::NOT_FOUND,
            "ORDER_NOT_FOUND",
            format!("order '{order_id}' not found"),
        ),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/orders/:order_id/status
// ---------------------------------------------------------------------------

/// Server-side half of the admin screen's status change. Runs the same
/// check the client runs; the order book is the source of truth for the
/// current status.
pub(crate) async fn update_order_status(
    State(st): State<Arc<AppState>>,
    Path(order_id): Path<String>,
    Json(body): Json<StatusUpdateBody>,
) -> Response {
    let status = match parse_status(&body.status) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let req = StatusUpdateRequest {
        status,
        tracking_number: body.tracking_number,
        tracking_url: body.tracking_url,
        notes: body.notes,
    };

    let mut orders = st.orders.write().await;
    let Some(rec) = orders.get_mut(&order_id) else {
        return error(
            StatusCode::NOT_FOUND,
            "ORDER_NOT_FOUND",
            format!("order '{order_id}' not found"),
        );
    };

    let validator = st.validator_for(rec.tenant.as_deref());
    let accepted = match check_status_update(validator, rec.status, &req) {
        Ok(a) => a,
        Err(UpdateRefusal::Transition(TransitionVerdict::Refused {
            from,
            to,
            path,
            message,
        })) => {
            warn!(order_id = %order_id, from = %from, to = %to, "orders/status refused");
            let _ = st.bus.send(BusMsg::LogLine {
                level: "WARN".to_string(),
                msg: format!("order {order_id}: {message}"),
            });
            return (
                StatusCode::CONFLICT,
                Json(TransitionRefusedResponse {
                    error: "TRANSITION_REFUSED".to_string(),
                    from,
                    to,
                    path,
                    message,
                }),
            )
                .into_response();
        }
        Err(refusal @ UpdateRefusal::InvalidTrackingUrl { .. }) => {
            return error(
                StatusCode::BAD_REQUEST,
                "INVALID_TRACKING_URL",
                refusal.to_string(),
            );
        }
        // An allowed verdict is never wrapped in a refusal.
        Err(UpdateRefusal::Transition(TransitionVerdict::Allowed)) => {
            return error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL",
                "inconsistent transition verdict",
            );
        }
    };

    let event = rec.apply(&accepted, Utc::now());
    let snapshot = rec.clone();
    drop(orders);

    if let Some(ev) = event {
        info!(order_id = %ev.order_id, from = %ev.from, to = %ev.to, "orders/status");
        let _ = st.bus.send(BusMsg::OrderStatus(ev));
    }

    (StatusCode::OK, Json(snapshot)).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::OrderStatus(_) => "order_status",
                    BusMsg::LogLine { .. } => "log",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
