//! Shared Module
//!
//! Cross-cutting concerns and shared utilities.

pub mod error;
pub mod middleware;
pub mod api_common;
pub mod router;

// APIs
pub mod health_api;

// Services
pub mod authorization_service;

// Re-export commonly used items
pub use error::{AuthError, Result};
pub use middleware::{AppState, AuthLayer, Authenticated};
pub use api_common::{ApiResponse, JsonBody, PathParam};
pub use health_api::health_router;
pub use router::api_router;
pub use authorization_service::{AuthContext, AuthorizationPolicy, Check};
