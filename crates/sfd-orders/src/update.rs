//! Status-update requests as the admin screen sends them to the backend.
//!
//! The same check runs before the request leaves the client and again when
//! the daemon receives it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::status::OrderStatus;
use crate::validator::{TransitionVerdict, WorkflowValidator};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub tracking_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl StatusUpdateRequest {
    pub fn to(status: OrderStatus) -> Self {
        Self {
            status,
            tracking_number: None,
            tracking_url: None,
            notes: None,
        }
    }
}

/// A request that passed the workflow check, optional fields normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedUpdate {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub notes: Option<String>,
}

impl AcceptedUpdate {
    /// Same status re-submitted (e.g. only notes changed).
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateRefusal {
    /// The workflow does not allow the move.
    Transition(TransitionVerdict),
    /// Tracking URL is not an http(s) URL.
    InvalidTrackingUrl { url: String },
}

impl fmt::Display for UpdateRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateRefusal::Transition(v) => {
                f.write_str(v.message().unwrap_or("status transition refused"))
            }
            UpdateRefusal::InvalidTrackingUrl { url } => {
                write!(f, "tracking url must start with http:// or https:// (got '{url}')")
            }
        }
    }
}

impl std::error::Error for UpdateRefusal {}

/// Check `req` against an order currently in `current`.
pub fn check_status_update(
    validator: &WorkflowValidator,
    current: OrderStatus,
    req: &StatusUpdateRequest,
) -> Result<AcceptedUpdate, UpdateRefusal> {
    let verdict = validator.check_transition(current, req.status);
    if !verdict.is_allowed() {
        return Err(UpdateRefusal::Transition(verdict));
    }

    let tracking_url = normalize(req.tracking_url.as_deref());
    if let Some(url) = &tracking_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(UpdateRefusal::InvalidTrackingUrl { url: url.clone() });
        }
    }

    Ok(AcceptedUpdate {
        from: current,
        to: req.status,
        tracking_number: normalize(req.tracking_number.as_deref()),
        tracking_url,
        notes: normalize(req.notes.as_deref()),
    })
}

// Blank optional fields are treated as absent.
fn normalize(v: Option<&str>) -> Option<String> {
    v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}
