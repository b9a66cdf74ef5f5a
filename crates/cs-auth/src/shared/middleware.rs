//! API Middleware
//!
//! `AuthLayer` makes the application state reachable from request
//! extensions; the `Authenticated` extractor runs the authentication stage
//! and rejects the request before the handler body executes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::Response,
};
use tower::{Layer, Service};

use crate::auth::authentication_stage::AuthenticationStage;
use crate::auth::credential_store::CredentialStore;
use crate::auth::session_service::SessionService;
use crate::auth::token_service::TokenService;
use crate::principal::repository::PrincipalStore;
use crate::shared::authorization_service::AuthContext;
use crate::shared::error::{AuthError, INVALID_HEADER_FORMAT};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub authentication: Arc<AuthenticationStage>,
    pub sessions: Arc<SessionService>,
    pub principals: Arc<dyn PrincipalStore>,
    /// Bound on every principal store lookup made while serving a request
    pub lookup_timeout: Duration,
}

impl AppState {
    /// Wire the services around one principal store.
    pub fn new<S>(
        store: Arc<S>,
        credentials: Arc<CredentialStore>,
        tokens: Arc<TokenService>,
        lookup_timeout: Duration,
    ) -> Self
    where
        S: PrincipalStore + 'static,
    {
        let authentication = AuthenticationStage::new(tokens.clone(), store.clone())
            .with_lookup_timeout(lookup_timeout);
        let sessions = SessionService::new(store.clone(), credentials, tokens)
            .with_lookup_timeout(lookup_timeout);

        Self {
            authentication: Arc::new(authentication),
            sessions: Arc::new(sessions),
            principals: store,
            lookup_timeout,
        }
    }
}

/// Authenticated principal extractor
pub struct Authenticated(pub AuthContext);

impl std::ops::Deref for Authenticated {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Already authenticated earlier in this request
        if let Some(context) = parts.extensions.get::<AuthContext>() {
            return Ok(Authenticated(context.clone()));
        }

        let app_state = parts
            .extensions
            .get::<AppState>()
            .cloned()
            .ok_or_else(|| AuthError::internal("AuthLayer is not installed on this router"))?;

        let header = match parts.headers.get(AUTHORIZATION) {
            Some(value) => Some(
                value
                    .to_str()
                    .map_err(|_| AuthError::unauthenticated(INVALID_HEADER_FORMAT))?,
            ),
            None => None,
        };

        let context = app_state.authentication.authenticate(header).await?;
        parts.extensions.insert(context.clone());

        Ok(Authenticated(context))
    }
}

/// Layer that injects AppState into request extensions
#[derive(Clone)]
pub struct AuthLayer {
    state: AppState,
}

impl AuthLayer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    state: AppState,
}

impl<S, B> Service<axum::http::Request<B>> for AuthMiddleware<S>
where
    S: Service<axum::http::Request<B>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        req.extensions_mut().insert(self.state.clone());

        let future = self.inner.call(req);
        Box::pin(future)
    }
}
