//! Authentication Aggregate
//!
//! Credentials, session tokens and the request authentication stage.

// Core auth
pub mod credential_store;
pub mod token_service;
pub mod authentication_stage;
pub mod session_service;
pub mod auth_api;

// Re-export main types
pub use auth_api::auth_router;
pub use authentication_stage::{extract_bearer_token, AuthenticationStage};
pub use credential_store::{Argon2Config, CredentialStore, PasswordPolicy};
pub use session_service::{LoginRequest, LoginResponse, RefreshRequest, RegisterRequest, SessionService, TokenPair};
pub use token_service::{Claims, TokenConfig, TokenError, TokenKind, TokenService};
