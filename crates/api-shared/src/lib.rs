//! # API Shared
//!
//! Definitions shared by the REST server and the HTTP client.
//!
//! Contains:
//! - Wire types that are not consultation records (`dto` module)
//! - Route paths, so server and client cannot drift apart (`routes` module)
//! - Bearer-token validation
//! - `HealthService`

pub mod auth;
pub mod dto;
pub mod health;
pub mod routes;

pub use auth::{bearer_header, ApiToken, AuthError};
pub use dto::{ErrorRes, MarkReviewedReq};
pub use health::{HealthRes, HealthService};
