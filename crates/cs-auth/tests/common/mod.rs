//! Shared fixtures for the API tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use cs_auth::{
    api_router, AppState, Argon2Config, AuthError, Claims, CredentialStore, InMemoryPrincipalStore,
    PasswordPolicy, Principal, PrincipalLoader, PrincipalStore, Role, TokenConfig, TokenService,
};

pub const PASSWORD: &str = "correct-horse";
pub const SECRET: &str = "integration-test-secret";
pub const STORE_FAILURE: &str = "connection refused to 10.0.0.7";

/// Store whose every call fails the way an unreachable database would
pub struct BrokenStore;

#[async_trait]
impl PrincipalLoader for BrokenStore {
    async fn find_by_id(&self, _id: Uuid) -> cs_auth::Result<Option<Principal>> {
        Err(AuthError::internal(STORE_FAILURE))
    }
}

#[async_trait]
impl PrincipalStore for BrokenStore {
    async fn find_by_email(&self, _email: &str) -> cs_auth::Result<Option<Principal>> {
        Err(AuthError::internal(STORE_FAILURE))
    }

    async fn insert(&self, _principal: &Principal) -> cs_auth::Result<()> {
        Err(AuthError::internal(STORE_FAILURE))
    }

    async fn update(&self, _principal: &Principal) -> cs_auth::Result<()> {
        Err(AuthError::internal(STORE_FAILURE))
    }

    async fn record_login(&self, _id: Uuid, _at: DateTime<Utc>) -> cs_auth::Result<()> {
        Err(AuthError::internal(STORE_FAILURE))
    }

    async fn find_by_organization(&self, _organization_id: Uuid) -> cs_auth::Result<Vec<Principal>> {
        Err(AuthError::internal(STORE_FAILURE))
    }

    async fn count_by_role(&self, _role: Role) -> cs_auth::Result<u64> {
        Err(AuthError::internal(STORE_FAILURE))
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryPrincipalStore>,
    pub credentials: Arc<CredentialStore>,
    pub tokens: Arc<TokenService>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryPrincipalStore::new());
        Self::build(store.clone(), store)
    }

    /// The router talks to a failing store; `store` is detached from it.
    pub fn with_broken_store() -> Self {
        Self::build(Arc::new(InMemoryPrincipalStore::new()), Arc::new(BrokenStore))
    }

    fn build<S: PrincipalStore + 'static>(store: Arc<InMemoryPrincipalStore>, backing: Arc<S>) -> Self {
        let credentials = Arc::new(
            CredentialStore::new(Argon2Config::testing(), PasswordPolicy::default()).unwrap(),
        );
        let tokens = Arc::new(
            TokenService::new(TokenConfig {
                secret: SECRET.to_string(),
                ..TokenConfig::default()
            })
            .unwrap(),
        );
        let state = AppState::new(backing, credentials.clone(), tokens.clone(), Duration::from_secs(5));
        let (router, _) = api_router(state);

        Self { router, store, credentials, tokens }
    }

    /// Insert an active principal whose password is `PASSWORD`.
    pub async fn seed(&self, email: &str, role: Role, organization_id: Option<uuid::Uuid>) -> Principal {
        let mut principal = Principal::new(email, "Test User", role)
            .with_password_hash(self.credentials.hash(PASSWORD).unwrap());
        principal.organization_id = organization_id;
        self.store.insert(&principal).await.unwrap();
        principal
    }

    pub fn access_token(&self, principal: &Principal) -> String {
        self.tokens.issue_access(principal).unwrap()
    }

    /// Sign arbitrary claims with the service secret.
    pub fn sign(&self, claims: &Claims) -> String {
        jsonwebtoken::encode(&Header::default(), claims, &EncodingKey::from_secret(SECRET.as_bytes()))
            .unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, authorization: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn get_as(&self, uri: &str, principal: &Principal) -> (StatusCode, Value) {
        let bearer = format!("Bearer {}", self.access_token(principal));
        self.get(uri, Some(&bearer)).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.post_json(
            "/api/v1/auth/login",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }
}

pub fn error_message(body: &Value) -> &str {
    body["error"]["message"].as_str().unwrap_or_default()
}

pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}
