//! Shared runtime state for sfd-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum; this module owns
//! nothing async itself apart from the heartbeat task.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sfd_orders::{AcceptedUpdate, OrderStatus, WorkflowRegistry, WorkflowValidator};
use tokio::sync::{broadcast, RwLock};

use crate::settings::DaemonSettings;

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    OrderStatus(StatusChangeEvent),
    LogLine { level: String, msg: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangeEvent {
    pub order_id: String,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub at_utc: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// OrderRecord
// ---------------------------------------------------------------------------

/// One applied status change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub at_utc: DateTime<Utc>,
    pub notes: Option<String>,
}

/// The daemon's view of an order. In-memory only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    /// Tenant whose workflow governs this order (`None` = default workflow).
    pub tenant: Option<String>,
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub notes: Option<String>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
    pub history: Vec<StatusChange>,
}

impl OrderRecord {
    pub fn new(order_id: impl Into<String>, tenant: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            order_id: order_id.into(),
            tenant,
            status: OrderStatus::Pending,
            tracking_number: None,
            tracking_url: None,
            notes: None,
            created_at_utc: now,
            updated_at_utc: now,
            history: Vec::new(),
        }
    }

    /// Apply an update that already passed the workflow check.
    ///
    /// Optional fields only overwrite when supplied. Returns the change
    /// event when the status actually moved.
    pub fn apply(&mut self, upd: &AcceptedUpdate, now: DateTime<Utc>) -> Option<StatusChangeEvent> {
        if upd.tracking_number.is_some() {
            self.tracking_number = upd.tracking_number.clone();
        }
        if upd.tracking_url.is_some() {
            self.tracking_url = upd.tracking_url.clone();
        }
        if upd.notes.is_some() {
            self.notes = upd.notes.clone();
        }
        self.updated_at_utc = now;

        if upd.is_noop() {
            return None;
        }

        self.status = upd.to;
        self.history.push(StatusChange {
            from: upd.from,
            to: upd.to,
            at_utc: now,
            notes: upd.notes.clone(),
        });

        Some(StatusChangeEvent {
            order_id: self.order_id.clone(),
            from: upd.from,
            to: upd.to,
            at_utc: now,
        })
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    /// Immutable after boot.
    pub workflows: Arc<WorkflowRegistry>,
    /// Hash of the config the daemon booted with (empty = no config).
    pub config_hash: String,
    /// Orders keyed by id.
    pub orders: Arc<RwLock<BTreeMap<String, OrderRecord>>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Standard workflow, default settings.
    pub fn new() -> Self {
        Self::from_settings(&DaemonSettings::default())
    }

    pub fn from_settings(settings: &DaemonSettings) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(settings.event_buffer.max(1));
        Self {
            bus,
            build: BuildInfo {
                service: "sfd-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            workflows: Arc::new(settings.workflows.clone()),
            config_hash: settings.config_hash.clone(),
            orders: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    pub fn validator_for(&self, tenant: Option<&str>) -> &WorkflowValidator {
        self.workflows.for_tenant(tenant)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Seconds since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepted(from: OrderStatus, to: OrderStatus, notes: Option<&str>) -> AcceptedUpdate {
        AcceptedUpdate {
            from,
            to,
            tracking_number: None,
            tracking_url: None,
            notes: notes.map(str::to_string),
        }
    }

    #[test]
    fn noop_update_keeps_history_and_emits_nothing() {
        let now = Utc::now();
        let mut rec = OrderRecord::new("o-1", None, now);
        let ev = rec.apply(
            &accepted(OrderStatus::Pending, OrderStatus::Pending, Some("called")),
            now,
        );
        assert!(ev.is_none());
        assert!(rec.history.is_empty());
        assert_eq!(rec.notes.as_deref(), Some("called"));
    }

    #[test]
    fn status_move_records_history() {
        let now = Utc::now();
        let mut rec = OrderRecord::new("o-1", None, now);
        let ev = rec
            .apply(&accepted(OrderStatus::Pending, OrderStatus::Confirmed, None), now)
            .unwrap();
        assert_eq!(ev.to, OrderStatus::Confirmed);
        assert_eq!(rec.status, OrderStatus::Confirmed);
        assert_eq!(rec.history.len(), 1);
    }

    #[test]
    fn bus_messages_are_type_tagged() {
        let ev = StatusChangeEvent {
            order_id: "o-1".to_string(),
            from: OrderStatus::Shipped,
            to: OrderStatus::Delivered,
            at_utc: Utc::now(),
        };
        let v = serde_json::to_value(BusMsg::OrderStatus(ev)).unwrap();
        assert_eq!(v["type"], "order_status");
        assert_eq!(v["order_id"], "o-1");
        assert_eq!(v["to"], "delivered");

        let v = serde_json::to_value(BusMsg::Heartbeat { ts_millis: 7 }).unwrap();
        assert_eq!(v, serde_json::json!({"type": "heartbeat", "ts_millis": 7}));
    }
}
