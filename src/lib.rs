//! Real-time presence service.
//!
//! Tracks connected viewers of a shared page, relays their pointer movements
//! to one another over websockets, and counts unique visitors per location.
//! The binary in `main.rs` wires these modules into an Axum server.

pub mod config;
pub mod db;
pub mod geo;
pub mod message;
pub mod routes;
pub mod services;
pub mod state;
