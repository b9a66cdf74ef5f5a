//! Courtside Auth
//!
//! Authentication and authorization core:
//! - Argon2id credential hashing
//! - HS256 access and refresh tokens
//! - Bearer-token request authentication against a principal store
//! - Role and organization-scope authorization policies
//!
//! ## Module Organization (Aggregate-based)
//!
//! Each aggregate contains:
//! - `entity` - Domain entities
//! - `repository` - Data access
//! - `api` - REST endpoints

// Core aggregates
pub mod principal;

// Authentication & authorization
pub mod auth;

// Shared infrastructure
pub mod shared;

// Startup seeding
pub mod seed;

// Re-export common types from shared
pub use shared::error::{AuthError, Result};
pub use shared::authorization_service::{checks, AuthContext, AuthorizationPolicy, Check, SessionInfo};
pub use shared::middleware::{AppState, AuthLayer, Authenticated};
pub use shared::router::api_router;

// Re-export main entity types for convenience
pub use principal::entity::{Principal, PrincipalStatus, Role};

// Re-export repositories
pub use principal::repository::{InMemoryPrincipalStore, PrincipalLoader, PrincipalStore};
pub use principal::postgres::PgPrincipalRepository;

// Re-export services
pub use auth::authentication_stage::AuthenticationStage;
pub use auth::credential_store::{Argon2Config, CredentialStore, PasswordPolicy};
pub use auth::session_service::SessionService;
pub use auth::token_service::{Claims, TokenConfig, TokenError, TokenKind, TokenService};
pub use seed::AdminSeeder;
