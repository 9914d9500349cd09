//! Request and response types for all sfd-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests. No business logic lives here.

use serde::{Deserialize, Serialize};
use sfd_orders::{OrderStatus, WorkflowSpec};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    pub uptime_secs: u64,
    /// Empty when the daemon booted without config layers.
    pub config_hash: String,
}

// ---------------------------------------------------------------------------
// Errors (400 / 404 / 409)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable code: "UNKNOWN_STATUS" | "ORDER_NOT_FOUND" | "ORDER_EXISTS" |
    /// "INVALID_TRACKING_URL"
    pub error: String,
    pub detail: String,
}

/// 409 body when the workflow refuses a status update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRefusedResponse {
    /// Always "TRANSITION_REFUSED".
    pub error: String,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub path: Vec<OrderStatus>,
    pub message: String,
}

// ---------------------------------------------------------------------------
// /v1/workflow
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResponse {
    pub tenant: Option<String>,
    pub workflow: WorkflowSpec,
    pub terminal: Vec<OrderStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextStatusesQuery {
    pub from: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextStatusesResponse {
    pub from: OrderStatus,
    pub next: Vec<OrderStatus>,
}

/// Raw labels; parsed by the handler so unknown statuses map to 400.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionCheckRequest {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionCheckResponse {
    pub allowed: bool,
    /// Empty when allowed or when no route exists.
    pub path: Vec<OrderStatus>,
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// /v1/orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// Generated (UUID v4) when absent.
    #[serde(default)]
    pub order_id: Option<String>,
}

/// Wire form of `sfd_orders::StatusUpdateRequest` with a raw status label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateBody {
    pub status: String,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub tracking_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}
