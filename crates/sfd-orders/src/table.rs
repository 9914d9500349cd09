//! Transition table
//!
//! # Design
//!
//! A [`TransitionTable`] is built once and never mutated. Two graphs are
//! kept:
//!
//! - `edges`: every move the workflow permits in one step, in declaration
//!   order. This is what `valid_next_statuses` reports.
//! - `steps`: the transitive reduction of `edges`. A skip-ahead edge such as
//!   `pending → processing` is dropped here because `pending → confirmed →
//!   processing` already covers it. Path guidance walks this graph so the
//!   admin is shown the full workflow rather than a shortcut.
//!
//! ```text
//!   pending ──► confirmed ──► processing ──► shipped ──► delivered ──► returned
//!    │  │                        ▲    │                                 (term.)
//!    │  └─────── skip-ahead ─────┘    │
//!    └───────────► cancelled ◄────────┘   (also from confirmed)
//!                   (term.)
//! ```
//!
//! Cancellation from any live status is a policy rule ([`CancelPolicy`]),
//! not a set of graph edges.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::status::OrderStatus;

// ---------------------------------------------------------------------------
// CancelPolicy
// ---------------------------------------------------------------------------

/// Escape hatch: `status` may be requested from any non-terminal status
/// except those listed in `exempt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelPolicy {
    pub status: OrderStatus,
    pub exempt: BTreeSet<OrderStatus>,
}

impl CancelPolicy {
    pub fn new<I>(status: OrderStatus, exempt: I) -> Self
    where
        I: IntoIterator<Item = OrderStatus>,
    {
        Self {
            status,
            exempt: exempt.into_iter().collect(),
        }
    }

    /// True when the escape hatch is open from `from`.
    pub fn applies_from(&self, from: OrderStatus) -> bool {
        !self.exempt.contains(&from)
    }
}

// ---------------------------------------------------------------------------
// TableError
// ---------------------------------------------------------------------------

/// Why a custom table was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// A status lists itself as a next status.
    SelfLoop(OrderStatus),
    /// The same source status was declared twice.
    DuplicateSource(OrderStatus),
    /// The same edge was declared twice.
    DuplicateEdge { from: OrderStatus, to: OrderStatus },
    /// The table contains a cycle through this status.
    Cycle(OrderStatus),
    /// The cancellation status has outgoing edges.
    CancelNotTerminal(OrderStatus),
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::SelfLoop(s) => write!(f, "WORKFLOW_INVALID: '{s}' transitions to itself"),
            TableError::DuplicateSource(s) => {
                write!(f, "WORKFLOW_INVALID: '{s}' is declared more than once")
            }
            TableError::DuplicateEdge { from, to } => {
                write!(f, "WORKFLOW_INVALID: edge '{from}' -> '{to}' is declared more than once")
            }
            TableError::Cycle(s) => write!(f, "WORKFLOW_INVALID: cycle through '{s}'"),
            TableError::CancelNotTerminal(s) => write!(
                f,
                "WORKFLOW_INVALID: cancellation status '{s}' must be terminal"
            ),
        }
    }
}

impl std::error::Error for TableError {}

// ---------------------------------------------------------------------------
// TransitionTable
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    edges: BTreeMap<OrderStatus, Vec<OrderStatus>>,
    steps: BTreeMap<OrderStatus, Vec<OrderStatus>>,
    cancel: Option<CancelPolicy>,
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl TransitionTable {
    /// The storefront's standard workflow.
    pub fn standard() -> Self {
        use OrderStatus::*;

        let edges: BTreeMap<OrderStatus, Vec<OrderStatus>> = [
            (Pending, vec![Confirmed, Processing, Cancelled]),
            (Confirmed, vec![Processing, Cancelled]),
            (Processing, vec![Shipped, Cancelled]),
            (Shipped, vec![Delivered]),
            (Delivered, vec![Returned]),
            (Cancelled, vec![]),
            (Returned, vec![]),
        ]
        .into_iter()
        .collect();

        // Statically valid; covered by `standard_table_passes_validation`.
        Self::assemble(edges, Some(CancelPolicy::new(Cancelled, [Delivered])))
    }

    /// Build and validate a custom table. Statuses not mentioned have no
    /// outgoing edges.
    pub fn from_edges<I>(edges: I, cancel: Option<CancelPolicy>) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (OrderStatus, Vec<OrderStatus>)>,
    {
        let mut map: BTreeMap<OrderStatus, Vec<OrderStatus>> = BTreeMap::new();

        for (from, next) in edges {
            if map.contains_key(&from) {
                return Err(TableError::DuplicateSource(from));
            }
            let mut seen = BTreeSet::new();
            for to in &next {
                if *to == from {
                    return Err(TableError::SelfLoop(from));
                }
                if !seen.insert(*to) {
                    return Err(TableError::DuplicateEdge { from, to: *to });
                }
            }
            map.insert(from, next);
        }

        if let Some(s) = find_cycle(&map) {
            return Err(TableError::Cycle(s));
        }

        if let Some(policy) = &cancel {
            if map.get(&policy.status).is_some_and(|n| !n.is_empty()) {
                return Err(TableError::CancelNotTerminal(policy.status));
            }
        }

        Ok(Self::assemble(map, cancel))
    }

    fn assemble(
        edges: BTreeMap<OrderStatus, Vec<OrderStatus>>,
        cancel: Option<CancelPolicy>,
    ) -> Self {
        let steps = transitive_reduction(&edges);
        Self {
            edges,
            steps,
            cancel,
        }
    }

    /// Statuses reachable from `from` in one step, in declaration order.
    pub fn next(&self, from: OrderStatus) -> &[OrderStatus] {
        self.edges.get(&from).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Like [`next`](Self::next) but with skip-ahead edges removed.
    pub fn steps(&self, from: OrderStatus) -> &[OrderStatus] {
        self.steps.get(&from).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_edge(&self, from: OrderStatus, to: OrderStatus) -> bool {
        self.next(from).contains(&to)
    }

    /// No outgoing edges.
    pub fn is_terminal(&self, status: OrderStatus) -> bool {
        self.next(status).is_empty()
    }

    pub fn cancel_policy(&self) -> Option<&CancelPolicy> {
        self.cancel.as_ref()
    }

    /// Every `(from, to)` edge, sources in lifecycle order, targets in
    /// declaration order.
    pub fn edges(&self) -> impl Iterator<Item = (OrderStatus, OrderStatus)> + '_ {
        OrderStatus::ALL
            .into_iter()
            .flat_map(move |from| self.next(from).iter().map(move |to| (from, *to)))
    }

    /// True if `to` can be reached from `from` in zero or more steps.
    pub fn reaches(&self, from: OrderStatus, to: OrderStatus) -> bool {
        reachable(&self.edges, from, to)
    }
}

// ---------------------------------------------------------------------------
// Graph helpers
// ---------------------------------------------------------------------------

fn neighbours(
    edges: &BTreeMap<OrderStatus, Vec<OrderStatus>>,
    s: OrderStatus,
) -> &[OrderStatus] {
    edges.get(&s).map(Vec::as_slice).unwrap_or(&[])
}

fn reachable(
    edges: &BTreeMap<OrderStatus, Vec<OrderStatus>>,
    from: OrderStatus,
    to: OrderStatus,
) -> bool {
    let mut seen = BTreeSet::new();
    let mut stack = vec![from];
    while let Some(cur) = stack.pop() {
        if cur == to {
            return true;
        }
        if seen.insert(cur) {
            stack.extend_from_slice(neighbours(edges, cur));
        }
    }
    false
}

/// Returns a status on a cycle, if any.
fn find_cycle(edges: &BTreeMap<OrderStatus, Vec<OrderStatus>>) -> Option<OrderStatus> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unseen,
        Open,
        Done,
    }

    fn visit(
        edges: &BTreeMap<OrderStatus, Vec<OrderStatus>>,
        s: OrderStatus,
        marks: &mut BTreeMap<OrderStatus, Mark>,
    ) -> Option<OrderStatus> {
        match marks.get(&s).copied().unwrap_or(Mark::Unseen) {
            Mark::Open => return Some(s),
            Mark::Done => return None,
            Mark::Unseen => {}
        }
        marks.insert(s, Mark::Open);
        for n in neighbours(edges, s) {
            if let Some(hit) = visit(edges, *n, marks) {
                return Some(hit);
            }
        }
        marks.insert(s, Mark::Done);
        None
    }

    let mut marks = BTreeMap::new();
    OrderStatus::ALL
        .into_iter()
        .find_map(|s| visit(edges, s, &mut marks))
}

/// Drop `u → v` when some other neighbour `w` of `u` already reaches `v`.
/// Only meaningful on a DAG; reachability is preserved.
fn transitive_reduction(
    edges: &BTreeMap<OrderStatus, Vec<OrderStatus>>,
) -> BTreeMap<OrderStatus, Vec<OrderStatus>> {
    edges
        .iter()
        .map(|(from, next)| {
            let kept = next
                .iter()
                .copied()
                .filter(|v| {
                    !next
                        .iter()
                        .any(|w| w != v && reachable(edges, *w, *v))
                })
                .collect();
            (*from, kept)
        })
        .collect()
}
