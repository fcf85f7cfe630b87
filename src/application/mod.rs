//! Application Layer
//!
//! Services orchestrating the domain, and the DTOs exchanged with the
//! presentation layer.

pub mod dto;
pub mod services;
