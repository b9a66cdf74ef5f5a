//! Token Service
//!
//! Issues and validates HS256-signed session tokens. Access and refresh
//! tokens share one claim shape and differ only in `kind` and lifetime.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::principal::entity::{Principal, Role};
use crate::shared::error::{AuthError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// Signed claims carried by every session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (principal ID)
    pub sub: Uuid,

    pub email: String,

    /// Role at issue time. Authorization never trusts this; it reloads the principal.
    pub role: Role,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<Uuid>,

    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Token ID
    pub jti: Uuid,

    pub kind: TokenKind,
}

impl Claims {
    pub fn issued_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.iat, 0).single().unwrap_or_default()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    SignatureInvalid,

    #[error("token has expired")]
    Expired,

    #[error("token is not yet valid")]
    NotYetValid,

    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("expected a {expected} token")]
    WrongKind { expected: TokenKind },

    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(message) => AuthError::internal(message),
            _ => AuthError::unauthenticated(crate::shared::error::INVALID_OR_EXPIRED_TOKEN),
        }
    }
}

/// Signing material and lifetimes for the token service
#[derive(Clone)]
pub struct TokenConfig {
    /// Shared HMAC secret
    pub secret: String,
    pub issuer: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Longest lifetime accepted for either token kind
pub const MAX_TOKEN_TTL_DAYS: i64 = 365;

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: "courtside".to_string(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::hours(168),
        }
    }
}

pub struct TokenService {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Result<Self> {
        if config.secret.is_empty() {
            return Err(AuthError::internal("token signing secret is empty"));
        }
        if config.access_ttl <= Duration::zero() || config.refresh_ttl <= Duration::zero() {
            return Err(AuthError::internal("token lifetimes must be positive"));
        }
        let max_ttl = Duration::days(MAX_TOKEN_TTL_DAYS);
        if config.access_ttl > max_ttl || config.refresh_ttl > max_ttl {
            return Err(AuthError::internal(format!(
                "token lifetimes must not exceed {} days",
                MAX_TOKEN_TTL_DAYS
            )));
        }

        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "nbf", "sub", "iss"]);

        info!(issuer = %config.issuer, "TokenService initialized with HS256");

        Ok(Self {
            config,
            encoding_key,
            decoding_key,
            validation,
        })
    }

    /// Access token lifetime in whole seconds
    pub fn access_ttl_secs(&self) -> i64 {
        self.config.access_ttl.num_seconds()
    }

    pub fn issue_access(&self, principal: &Principal) -> std::result::Result<String, TokenError> {
        self.issue_at(principal, TokenKind::Access, Utc::now())
    }

    pub fn issue_refresh(&self, principal: &Principal) -> std::result::Result<String, TokenError> {
        self.issue_at(principal, TokenKind::Refresh, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    fn issue_at(
        &self,
        principal: &Principal,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> std::result::Result<String, TokenError> {
        let ttl = match kind {
            TokenKind::Access => self.config.access_ttl,
            TokenKind::Refresh => self.config.refresh_ttl,
        };

        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenError::Signing("token expiry is out of range".to_string()))?;

        let claims = Claims {
            sub: principal.id,
            email: principal.email.clone(),
            role: principal.role,
            organization_id: principal.organization_id,
            iss: self.config.issuer.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
            kind,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature, issuer and time bounds of a token of either kind.
    pub fn validate(&self, token: &str) -> std::result::Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| self.classify(token, e.kind()))?;

        if !(claims.exp > claims.iat && claims.iat >= claims.nbf) {
            return Err(TokenError::Malformed("inconsistent timestamps".to_string()));
        }

        Ok(claims)
    }

    /// Validate and additionally require a specific token kind.
    pub fn validate_kind(&self, token: &str, expected: TokenKind) -> std::result::Result<Claims, TokenError> {
        let claims = self.validate(token)?;
        if claims.kind != expected {
            return Err(TokenError::WrongKind { expected });
        }
        Ok(claims)
    }

    fn classify(&self, token: &str, kind: &ErrorKind) -> TokenError {
        if names_foreign_algorithm(token) {
            return TokenError::SignatureInvalid;
        }

        match kind {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::ImmatureSignature => TokenError::NotYetValid,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::SignatureInvalid,
            ErrorKind::Base64(_) if only_signature_is_corrupt(token) => TokenError::SignatureInvalid,
            ErrorKind::InvalidIssuer => TokenError::Malformed("unexpected issuer".to_string()),
            ErrorKind::MissingRequiredClaim(claim) => {
                TokenError::Malformed(format!("missing claim {}", claim))
            }
            other => TokenError::Malformed(format!("{:?}", other)),
        }
    }
}

fn segment_json(segment: &str) -> Option<serde_json::Value> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// True when the header declares any algorithm other than HS256, `none` included.
fn names_foreign_algorithm(token: &str) -> bool {
    token
        .split('.')
        .next()
        .and_then(segment_json)
        .and_then(|header| header.get("alg").and_then(|alg| alg.as_str()).map(|alg| alg != "HS256"))
        .unwrap_or(false)
}

/// True when header and payload decode cleanly but the rest of the token is
/// not a valid signature encoding.
fn only_signature_is_corrupt(token: &str) -> bool {
    let mut segments = token.splitn(3, '.');
    let (Some(header), Some(payload), Some(signature)) =
        (segments.next(), segments.next(), segments.next())
    else {
        return false;
    };

    segment_json(header).is_some()
        && segment_json(payload).is_some()
        && URL_SAFE_NO_PAD.decode(signature).is_err()
}
