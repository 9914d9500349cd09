//! Per-tenant workflows.
//!
//! Config shape (after layering, see sfd-config):
//!
//! ```yaml
//! workflow:                 # optional; standard workflow when absent
//!   transitions:
//!     pending: [confirmed, cancelled]
//!     confirmed: [shipped, cancelled]
//!     shipped: [delivered]
//!   cancel_status: cancelled
//!   cancel_exempt: [delivered]
//! tenants:
//!   acme:
//!     workflow: { ... }     # same shape; falls back to the default
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::status::{OrderStatus, UnknownStatus};
use crate::table::{CancelPolicy, TableError, TransitionTable};
use crate::validator::WorkflowValidator;

// ---------------------------------------------------------------------------
// WorkflowSpec
// ---------------------------------------------------------------------------

/// Serializable description of a [`TransitionTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSpec {
    /// Source status label -> next statuses in declaration order.
    pub transitions: BTreeMap<String, Vec<OrderStatus>>,
    #[serde(default)]
    pub cancel_status: Option<OrderStatus>,
    #[serde(default)]
    pub cancel_exempt: Vec<OrderStatus>,
}

impl WorkflowSpec {
    pub fn from_table(table: &TransitionTable) -> Self {
        let transitions = OrderStatus::ALL
            .into_iter()
            .map(|s| (s.as_str().to_string(), table.next(s).to_vec()))
            .collect();
        let (cancel_status, cancel_exempt) = match table.cancel_policy() {
            Some(p) => (Some(p.status), p.exempt.iter().copied().collect()),
            None => (None, Vec::new()),
        };
        Self {
            transitions,
            cancel_status,
            cancel_exempt,
        }
    }

    pub fn build(&self) -> Result<TransitionTable, WorkflowConfigError> {
        let mut edges = Vec::with_capacity(self.transitions.len());
        for (label, next) in &self.transitions {
            // Keys follow the same exact lowercase rule as the target lists.
            let from: OrderStatus = serde_json::from_value(Value::String(label.clone()))
                .map_err(|_| {
                    let unknown = UnknownStatus {
                        label: label.clone(),
                    };
                    WorkflowConfigError::new("/transitions", unknown)
                })?;
            edges.push((from, next.clone()));
        }
        let cancel = self
            .cancel_status
            .map(|s| CancelPolicy::new(s, self.cancel_exempt.iter().copied()));
        TransitionTable::from_edges(edges, cancel).map_err(|e| {
            let pointer = match e {
                TableError::CancelNotTerminal(_) => "/cancel_status",
                _ => "/transitions",
            };
            WorkflowConfigError::new(pointer, e)
        })
    }
}

// ---------------------------------------------------------------------------
// WorkflowConfigError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfigError {
    /// JSON pointer of the offending config section.
    pub pointer: String,
    pub reason: String,
}

impl WorkflowConfigError {
    fn new(pointer: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            pointer: pointer.into(),
            reason: reason.to_string(),
        }
    }

    fn nested(self, prefix: &str) -> Self {
        Self {
            pointer: format!("{prefix}{}", self.pointer),
            reason: self.reason,
        }
    }
}

impl fmt::Display for WorkflowConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid workflow config at {}: {}", self.pointer, self.reason)
    }
}

impl std::error::Error for WorkflowConfigError {}

// ---------------------------------------------------------------------------
// WorkflowRegistry
// ---------------------------------------------------------------------------

/// Default workflow plus per-tenant overrides. Unknown tenants get the
/// default.
#[derive(Debug, Clone, Default)]
pub struct WorkflowRegistry {
    default: WorkflowValidator,
    tenants: BTreeMap<String, WorkflowValidator>,
}

impl WorkflowRegistry {
    pub fn new(default: WorkflowValidator) -> Self {
        Self {
            default,
            tenants: BTreeMap::new(),
        }
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>, validator: WorkflowValidator) -> Self {
        self.tenants.insert(tenant.into(), validator);
        self
    }

    pub fn default_validator(&self) -> &WorkflowValidator {
        &self.default
    }

    pub fn for_tenant(&self, tenant: Option<&str>) -> &WorkflowValidator {
        tenant
            .and_then(|t| self.tenants.get(t))
            .unwrap_or(&self.default)
    }

    pub fn tenant_ids(&self) -> impl Iterator<Item = &str> {
        self.tenants.keys().map(String::as_str)
    }

    /// Reads `/workflow` and `/tenants/<id>/workflow`.
    pub fn from_config_json(config: &Value) -> Result<Self, WorkflowConfigError> {
        let default = match config.pointer("/workflow") {
            Some(v) if !v.is_null() => validator_from_value(v).map_err(|e| e.nested("/workflow"))?,
            _ => WorkflowValidator::standard(),
        };
        let mut reg = Self::new(default);

        let Some(tenants) = config.pointer("/tenants").filter(|v| !v.is_null()) else {
            return Ok(reg);
        };
        let tenants = tenants.as_object().ok_or_else(|| {
            WorkflowConfigError::new("/tenants", "expected a mapping of tenant id to settings")
        })?;

        for (id, settings) in tenants {
            if let Some(wf) = settings.get("workflow").filter(|v| !v.is_null()) {
                let v = validator_from_value(wf)
                    .map_err(|e| e.nested(&format!("/tenants/{id}/workflow")))?;
                reg.tenants.insert(id.clone(), v);
            }
        }

        Ok(reg)
    }
}

fn validator_from_value(v: &Value) -> Result<WorkflowValidator, WorkflowConfigError> {
    let spec: WorkflowSpec =
        serde_json::from_value(v.clone()).map_err(|e| WorkflowConfigError::new("", e))?;
    Ok(WorkflowValidator::new(Arc::new(spec.build()?)))
}
