//! Request and Response models for the admin and demo API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::PurgeRequest;
pub use responses::{ErrorResponse, HealthResponse, PurgeResponse, StatsResponse, TimeResponse};
