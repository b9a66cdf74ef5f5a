//! API router assembly

use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::auth::auth_api::auth_router;
use crate::principal::api::{admin_router, organizations_router};
use crate::shared::health_api::health_router;
use crate::shared::middleware::{AppState, AuthLayer};

/// Build every route together with its collected OpenAPI document.
pub fn api_router(state: AppState) -> (Router, OpenApi) {
    let (router, mut openapi) = OpenApiRouter::new()
        .merge(health_router())
        .nest("/api/v1/auth", auth_router(state.clone()))
        .nest("/api/v1/admin", admin_router(state.clone()))
        .nest("/api/v1/organizations", organizations_router(state.clone()))
        .split_for_parts();

    openapi.info.title = "Courtside API".to_string();
    openapi.info.version = env!("CARGO_PKG_VERSION").to_string();
    openapi.info.description = Some("Authentication, sessions and access control".to_string());

    openapi
        .components
        .get_or_insert_with(Default::default)
        .add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );

    (router.layer(AuthLayer::new(state)), openapi)
}
