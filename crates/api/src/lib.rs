//! HTTP API layer for ballotbox.
//!
//! This crate provides the JSON API:
//!
//! - **Endpoints**: auth, polls, choices, votes
//! - **Extractors**: authentication
//! - **Middleware**: bearer-token resolution
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
