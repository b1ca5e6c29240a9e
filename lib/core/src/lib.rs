//! Core domain types and utilities for hotelres authentication.
//!
//! This crate provides the foundational types and error handling shared by
//! the identity federation library and the HTTP server.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{AccountId, ParseIdError};
