//! sfd-daemon library target.
//!
//! Exposes the router, settings and state for integration tests.
//! The binary `main.rs` depends on this library target.

pub mod api_types;
pub mod routes;
pub mod settings;
pub mod state;
