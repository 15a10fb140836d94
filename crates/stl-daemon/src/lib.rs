//! stl-daemon library target.
//!
//! Exposes the router, state and poller for integration tests.
//! The binary `main.rs` depends on this library target.

pub mod api_types;
pub mod poller;
pub mod routes;
pub mod state;
