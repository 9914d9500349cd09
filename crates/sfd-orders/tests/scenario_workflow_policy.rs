//! Scenario: standard workflow policy
//!
//! # Invariants under test
//! - A no-op update (same status) is always allowed.
//! - Cancellation is an escape hatch from every live status except
//!   `delivered`.
//! - `cancelled` is immutable; `delivered` can only become `returned`.
//!
//! Pure in-process; no IO.

use sfd_orders::{OrderStatus, WorkflowValidator};
use OrderStatus::*;

fn validator() -> WorkflowValidator {
    WorkflowValidator::standard()
}

#[test]
fn identity_transition_is_always_allowed() {
    let v = validator();
    for s in OrderStatus::ALL {
        assert!(v.is_transition_allowed(s, s), "{s} -> {s} must be allowed");
    }
}

#[test]
fn cancellation_allowed_from_every_live_status_except_delivered() {
    let v = validator();
    for s in [Pending, Confirmed, Processing, Shipped] {
        assert!(
            v.is_transition_allowed(s, Cancelled),
            "{s} -> cancelled must be allowed"
        );
    }
    assert!(!v.is_transition_allowed(Delivered, Cancelled));
    assert!(!v.is_transition_allowed(Returned, Cancelled));
}

#[test]
fn cancelled_only_allows_itself() {
    let v = validator();
    for s in OrderStatus::ALL {
        assert_eq!(
            v.is_transition_allowed(Cancelled, s),
            s == Cancelled,
            "cancelled -> {s}"
        );
    }
}

#[test]
fn delivered_only_allows_itself_or_returned() {
    let v = validator();
    for s in OrderStatus::ALL {
        assert_eq!(
            v.is_transition_allowed(Delivered, s),
            s == Delivered || s == Returned,
            "delivered -> {s}"
        );
    }
}

#[test]
fn returned_is_terminal() {
    let v = validator();
    assert!(v.valid_next_statuses(Returned).is_empty());
    for s in OrderStatus::ALL {
        assert_eq!(v.is_transition_allowed(Returned, s), s == Returned);
    }
}

#[test]
fn pending_next_statuses_in_declaration_order() {
    assert_eq!(
        validator().valid_next_statuses(Pending),
        vec![Confirmed, Processing, Cancelled]
    );
}

#[test]
fn processing_to_shipped_is_a_direct_edge() {
    let v = validator();
    assert!(v.is_transition_allowed(Processing, Shipped));
    assert!(v.check_transition(Processing, Shipped).is_allowed());
}

#[test]
fn pending_to_shipped_refused_with_workflow_route() {
    let v = validator();
    assert!(!v.is_transition_allowed(Pending, Shipped));

    let verdict = v.check_transition(Pending, Shipped);
    assert!(!verdict.is_allowed());
    assert_eq!(verdict.path(), &[Pending, Confirmed, Processing, Shipped]);
    assert_eq!(
        verdict.message(),
        Some(
            "You cannot jump directly from 'pending' to 'shipped'. \
             Please follow the workflow: pending → confirmed → processing → shipped"
        )
    );
}

#[test]
fn backward_moves_are_refused() {
    let v = validator();
    assert!(!v.is_transition_allowed(Shipped, Processing));
    assert!(!v.is_transition_allowed(Confirmed, Pending));
}
