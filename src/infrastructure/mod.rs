//! Infrastructure Layer
//!
//! Implementations of the domain ports:
//! - PostgreSQL repositories and unit of work
//! - In-process store implementing the same ports
//! - Prometheus metrics

pub mod database;
pub mod memory;
pub mod metrics;
pub mod repositories;
