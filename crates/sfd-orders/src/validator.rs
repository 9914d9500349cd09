//! Workflow validator
//!
//! Answers the three questions the admin order screen asks before it sends a
//! status update to the backend:
//!
//! 1. which statuses can this order move to next?
//! 2. is the requested move allowed?
//! 3. if not, which route through the workflow reaches it?
//!
//! Never panics and never errors on typed input. A missing route is an empty
//! path; the caller decides how to render the refusal.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::status::OrderStatus;
use crate::table::TransitionTable;

// ---------------------------------------------------------------------------
// TransitionVerdict
// ---------------------------------------------------------------------------

/// Outcome of [`WorkflowValidator::check_transition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum TransitionVerdict {
    Allowed,
    Refused {
        from: OrderStatus,
        to: OrderStatus,
        /// Route through the workflow, start and end inclusive. Empty when
        /// `to` cannot be reached from `from` at all.
        path: Vec<OrderStatus>,
        message: String,
    },
}

impl TransitionVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, TransitionVerdict::Allowed)
    }

    pub fn path(&self) -> &[OrderStatus] {
        match self {
            TransitionVerdict::Allowed => &[],
            TransitionVerdict::Refused { path, .. } => path,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            TransitionVerdict::Allowed => None,
            TransitionVerdict::Refused { message, .. } => Some(message),
        }
    }
}

/// Admin-facing refusal text.
pub fn workflow_message(from: OrderStatus, to: OrderStatus, path: &[OrderStatus]) -> String {
    if path.is_empty() {
        return format!("Order status cannot change from '{from}' to '{to}'.");
    }
    let route = path
        .iter()
        .map(OrderStatus::as_str)
        .collect::<Vec<_>>()
        .join(" → ");
    format!(
        "You cannot jump directly from '{from}' to '{to}'. Please follow the workflow: {route}"
    )
}

// ---------------------------------------------------------------------------
// WorkflowValidator
// ---------------------------------------------------------------------------

/// Cheap to clone; the table is shared.
#[derive(Debug, Clone)]
pub struct WorkflowValidator {
    table: Arc<TransitionTable>,
}

impl Default for WorkflowValidator {
    fn default() -> Self {
        Self::standard()
    }
}

impl WorkflowValidator {
    pub fn new(table: Arc<TransitionTable>) -> Self {
        Self { table }
    }

    pub fn standard() -> Self {
        Self::new(Arc::new(TransitionTable::standard()))
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// Statuses directly reachable from `current`, in declaration order.
    /// Empty for terminal statuses.
    pub fn valid_next_statuses(&self, current: OrderStatus) -> Vec<OrderStatus> {
        self.table.next(current).to_vec()
    }

    /// String-level variant for callers holding a raw label. Unknown labels
    /// have no next statuses.
    pub fn valid_next_for_label(&self, label: &str) -> Vec<OrderStatus> {
        OrderStatus::from_label(label)
            .map(|s| self.valid_next_statuses(s))
            .unwrap_or_default()
    }

    /// Rules, in order:
    /// - `requested == current` is a no-op update and always allowed
    /// - a terminal status only allows itself
    /// - a direct edge is allowed
    /// - the cancellation status is allowed from any live status not exempt
    ///   from the policy (`delivered` in the standard workflow)
    pub fn is_transition_allowed(&self, current: OrderStatus, requested: OrderStatus) -> bool {
        if requested == current {
            return true;
        }
        if self.table.is_terminal(current) {
            return false;
        }
        if self.table.has_edge(current, requested) {
            return true;
        }
        self.table
            .cancel_policy()
            .is_some_and(|p| p.status == requested && p.applies_from(current))
    }

    /// Route from `from` to `to`, both inclusive.
    ///
    /// - `from == to` yields `[from]`
    /// - a direct edge yields `[from, to]`
    /// - otherwise breadth-first over the step graph (skip-ahead edges
    ///   removed), neighbours expanded in declaration order, so the first
    ///   route found is the one reported
    /// - empty when `to` is unreachable
    pub fn find_transition_path(&self, from: OrderStatus, to: OrderStatus) -> Vec<OrderStatus> {
        if from == to {
            return vec![from];
        }
        if self.table.has_edge(from, to) {
            return vec![from, to];
        }

        let mut parent: BTreeMap<OrderStatus, OrderStatus> = BTreeMap::new();
        let mut seen = BTreeSet::from([from]);
        let mut queue = VecDeque::from([from]);

        while let Some(cur) = queue.pop_front() {
            for &next in self.table.steps(cur) {
                if !seen.insert(next) {
                    continue;
                }
                parent.insert(next, cur);
                if next == to {
                    return rebuild_path(&parent, from, to);
                }
                queue.push_back(next);
            }
        }

        Vec::new()
    }

    pub fn check_transition(&self, from: OrderStatus, to: OrderStatus) -> TransitionVerdict {
        if self.is_transition_allowed(from, to) {
            return TransitionVerdict::Allowed;
        }
        let path = self.find_transition_path(from, to);
        let message = workflow_message(from, to, &path);
        TransitionVerdict::Refused {
            from,
            to,
            path,
            message,
        }
    }
}

fn rebuild_path(
    parent: &BTreeMap<OrderStatus, OrderStatus>,
    from: OrderStatus,
    to: OrderStatus,
) -> Vec<OrderStatus> {
    let mut path = vec![to];
    let mut cur = to;
    while cur != from {
        match parent.get(&cur) {
            Some(p) => {
                cur = *p;
                path.push(cur);
            }
            None => return Vec::new(),
        }
    }
    path.reverse();
    path
}
