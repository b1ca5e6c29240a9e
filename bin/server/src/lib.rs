//! hotelres authentication server.
//!
//! This crate exposes the identity federation library over HTTP: provider
//! login entry points and callbacks, the refresh token cookie endpoints, and
//! bearer-token authentication for everything else.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
