//! HTTP API
//!
//! Thin request/response surface over the application services.

pub mod handlers;
pub mod routes;
