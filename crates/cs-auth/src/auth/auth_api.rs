//! Auth API Endpoints
//!
//! Login, refresh, self-registration and the current-principal lookup.

use axum::{extract::State, http::StatusCode, response::Response};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::auth::session_service::{LoginRequest, LoginResponse, RefreshRequest, RegisterRequest, TokenPair};
use crate::principal::entity::Principal;
use crate::shared::api_common::{ApiResponse, ErrorBody, JsonBody};
use crate::shared::error::Result;
use crate::shared::middleware::{AppState, Authenticated};

/// Authenticate with email and password
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    operation_id = "postAuthLogin",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Invalid request data", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 403, description = "Account is inactive", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>> {
    let response = state.sessions.login(req).await?;
    Ok(ApiResponse::success(response).with_message("Login successful"))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/refresh",
    tag = "auth",
    operation_id = "postAuthRefresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = TokenPair),
        (status = 400, description = "Refresh token missing", body = ErrorBody),
        (status = 401, description = "Invalid or expired refresh token", body = ErrorBody)
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RefreshRequest>,
) -> Result<ApiResponse<TokenPair>> {
    let tokens = state.sessions.refresh(req).await?;
    Ok(ApiResponse::success(tokens).with_message("Token refreshed successfully"))
}

/// Create a public account
#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    operation_id = "postAuthRegister",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = Principal),
        (status = 400, description = "Invalid request data or email taken", body = ErrorBody)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<Response> {
    let principal = state.sessions.register(req).await?;
    Ok(ApiResponse::success(principal)
        .with_message("User registered successfully")
        .into_response_with(StatusCode::CREATED))
}

/// Get the authenticated principal
#[utoipa::path(
    get,
    path = "/me",
    tag = "auth",
    operation_id = "getAuthMe",
    responses(
        (status = 200, description = "Current principal", body = Principal),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 403, description = "Account is inactive", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_current_user(auth: Authenticated) -> Result<ApiResponse<Principal>> {
    Ok(ApiResponse::success(auth.0.into_principal()))
}

pub fn auth_router(state: AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(login))
        .routes(routes!(refresh_token))
        .routes(routes!(register))
        .routes(routes!(get_current_user))
        .with_state(state)
}
