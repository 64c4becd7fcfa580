//! Domain services used by the websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! The hub and session modules own live connection state. Visits and
//! highscores own accounting rules and reach storage only through their store
//! traits, so route handlers stay focused on protocol translation.

pub mod highscore;
pub mod hub;
pub mod identity;
pub mod session;
pub mod visits;
