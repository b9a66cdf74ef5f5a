//! Session Service
//!
//! Credential login, refresh-token exchange and self-registration.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::auth::credential_store::CredentialStore;
use crate::auth::token_service::{TokenKind, TokenService};
use crate::principal::entity::{Principal, Role};
use crate::principal::repository::{load_with_timeout, PrincipalStore};
use crate::shared::error::{
    AuthError, Result, ACCOUNT_INACTIVE, EMAIL_ALREADY_REGISTERED, INVALID_CREDENTIALS,
    INVALID_OR_EXPIRED_TOKEN, REFRESH_TOKEN_REQUIRED, USER_NOT_FOUND,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    pub phone: Option<String>,
}

/// Access/refresh token pair
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginResponse {
    pub principal: Principal,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

pub struct SessionService {
    store: Arc<dyn PrincipalStore>,
    credentials: Arc<CredentialStore>,
    tokens: Arc<TokenService>,
    lookup_timeout: Duration,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn PrincipalStore>,
        credentials: Arc<CredentialStore>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            store,
            credentials,
            tokens,
            lookup_timeout: crate::auth::authentication_stage::DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_lookup_timeout(mut self, lookup_timeout: Duration) -> Self {
        self.lookup_timeout = lookup_timeout;
        self
    }

    /// Exchange email and password for a token pair.
    ///
    /// Unknown email and wrong password fail identically. The password is
    /// checked before the status, so an inactive account is only revealed to
    /// a caller who knows its password.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse> {
        let email = normalize_email(&request.email);
        if !is_plausible_email(&email) || request.password.is_empty() {
            return Err(AuthError::validation("email and password are required"));
        }

        let Some(mut principal) = self.find_by_email(&email).await? else {
            info!("Login failed: unknown email");
            return Err(AuthError::unauthenticated(INVALID_CREDENTIALS));
        };

        if !self.verify_password(request.password, principal.password_hash.clone()).await? {
            warn!(principal_id = %principal.id, "Login failed: wrong password");
            return Err(AuthError::unauthenticated(INVALID_CREDENTIALS));
        }

        if !principal.is_active() {
            info!(principal_id = %principal.id, "Login refused: account inactive");
            return Err(AuthError::forbidden(ACCOUNT_INACTIVE));
        }

        let tokens = self.issue_pair(&principal)?;

        let now = Utc::now();
        if let Err(e) = self.store.record_login(principal.id, now).await {
            warn!(principal_id = %principal.id, error = %e, "Failed to record last login");
        }
        principal.record_login(now);

        info!(principal_id = %principal.id, role = %principal.role, "Login succeeded");
        Ok(LoginResponse { principal, tokens })
    }

    /// Exchange a refresh token for a fresh pair built from the current
    /// principal record.
    pub async fn refresh(&self, request: RefreshRequest) -> Result<TokenPair> {
        let token = request.refresh_token.trim();
        if token.is_empty() {
            return Err(AuthError::validation(REFRESH_TOKEN_REQUIRED));
        }

        let claims = self
            .tokens
            .validate_kind(token, TokenKind::Refresh)
            .map_err(|e| {
                info!(error = %e, "Refresh token rejected");
                AuthError::unauthenticated(INVALID_OR_EXPIRED_TOKEN)
            })?;

        let principal = load_with_timeout(self.store.as_ref(), claims.sub, self.lookup_timeout)
            .await?
            .ok_or_else(|| AuthError::unauthenticated(USER_NOT_FOUND))?;

        if !principal.is_active() {
            return Err(AuthError::unauthenticated(ACCOUNT_INACTIVE));
        }

        let tokens = self.issue_pair(&principal)?;
        info!(principal_id = %principal.id, "Tokens refreshed");
        Ok(tokens)
    }

    /// Create an active `public` principal.
    pub async fn register(&self, request: RegisterRequest) -> Result<Principal> {
        let email = normalize_email(&request.email);
        if !is_plausible_email(&email) {
            return Err(AuthError::validation("a valid email is required"));
        }
        let full_name = request.full_name.trim();
        if full_name.is_empty() {
            return Err(AuthError::validation("full_name is required"));
        }
        self.credentials.policy().validate(&request.password)?;

        if self.find_by_email(&email).await?.is_some() {
            return Err(AuthError::validation(EMAIL_ALREADY_REGISTERED));
        }

        let password_hash = self.hash_password(request.password).await?;
        let mut principal = Principal::new(email, full_name, Role::Public).with_password_hash(password_hash);
        if let Some(phone) = request.phone.filter(|p| !p.trim().is_empty()) {
            principal = principal.with_phone(phone.trim());
        }

        self.store.insert(&principal).await?;

        info!(principal_id = %principal.id, "Principal registered");
        Ok(principal)
    }

    fn issue_pair(&self, principal: &Principal) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.tokens.issue_access(principal)?,
            refresh_token: self.tokens.issue_refresh(principal)?,
            expires_in: self.tokens.access_ttl_secs(),
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>> {
        match tokio::time::timeout(self.lookup_timeout, self.store.find_by_email(email)).await {
            Ok(result) => result,
            Err(_) => Err(AuthError::internal("principal lookup by email timed out")),
        }
    }

    /// Argon2 is CPU bound; keep it off the async workers.
    async fn verify_password(&self, password: String, hash: String) -> Result<bool> {
        let credentials = self.credentials.clone();
        tokio::task::spawn_blocking(move || credentials.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::internal(format!("password verification task failed: {}", e)))?
    }

    async fn hash_password(&self, password: String) -> Result<String> {
        let credentials = self.credentials.clone();
        tokio::task::spawn_blocking(move || credentials.hash(&password))
            .await
            .map_err(|e| AuthError::internal(format!("password hashing task failed: {}", e)))?
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
