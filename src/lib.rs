//! Harmonia Relay - CORS-enabling HTTP relay
//!
//! Core library for the HTTP front end and the relay decision logic.

pub mod config;
pub mod http;
pub mod relay;
pub mod server;
