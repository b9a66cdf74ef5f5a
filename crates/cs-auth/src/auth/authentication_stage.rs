//! Authentication Stage
//!
//! Turns an `Authorization` header into an `AuthContext`: parse the bearer
//! token, validate it, reload the principal and check it is still active.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::auth::token_service::{TokenKind, TokenService};
use crate::principal::repository::{load_with_timeout, PrincipalLoader};
use crate::shared::authorization_service::{AuthContext, SessionInfo};
use crate::shared::error::{
    AuthError, Result, ACCOUNT_INACTIVE, AUTHORIZATION_REQUIRED, INVALID_HEADER_FORMAT,
    INVALID_OR_EXPIRED_TOKEN, USER_NOT_FOUND,
};

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct AuthenticationStage {
    tokens: Arc<TokenService>,
    loader: Arc<dyn PrincipalLoader>,
    lookup_timeout: Duration,
}

impl AuthenticationStage {
    pub fn new(tokens: Arc<TokenService>, loader: Arc<dyn PrincipalLoader>) -> Self {
        Self {
            tokens,
            loader,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_lookup_timeout(mut self, lookup_timeout: Duration) -> Self {
        self.lookup_timeout = lookup_timeout;
        self
    }

    /// Authenticate a request from its raw `Authorization` header value.
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<AuthContext> {
        let header = match authorization {
            Some(value) if !value.is_empty() => value,
            _ => return Err(AuthError::unauthenticated(AUTHORIZATION_REQUIRED)),
        };

        let token = extract_bearer_token(header)
            .ok_or_else(|| AuthError::unauthenticated(INVALID_HEADER_FORMAT))?;

        let claims = self
            .tokens
            .validate_kind(token, TokenKind::Access)
            .map_err(|e| {
                debug!(error = %e, "Token rejected");
                AuthError::unauthenticated(INVALID_OR_EXPIRED_TOKEN)
            })?;

        let principal = load_with_timeout(self.loader.as_ref(), claims.sub, self.lookup_timeout)
            .await?
            .ok_or_else(|| {
                warn!(principal_id = %claims.sub, "Valid token for unknown principal");
                AuthError::unauthenticated(USER_NOT_FOUND)
            })?;

        if !principal.is_active() {
            debug!(principal_id = %principal.id, "Inactive principal rejected");
            return Err(AuthError::forbidden(ACCOUNT_INACTIVE));
        }

        Ok(AuthContext::new(principal, SessionInfo::from_claims(&claims)))
    }
}

/// Extract the token from a `Bearer <token>` header value.
/// The scheme is matched case-sensitively and the token must be non-empty.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
}
