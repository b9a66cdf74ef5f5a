//! Principal API Endpoints
//!
//! Admin lookups and organization member listings, guarded by role and
//! organization-scope policies.

use axum::extract::State;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

use crate::principal::entity::Principal;
use crate::principal::repository::{load_with_timeout, PrincipalStore};
use crate::shared::api_common::{ApiResponse, ErrorBody, PathParam};
use crate::shared::authorization_service::checks;
use crate::shared::error::{AuthError, Result, USER_NOT_FOUND};
use crate::shared::middleware::{AppState, Authenticated};

#[derive(Debug, Serialize, ToSchema)]
pub struct OrganizationMembersResponse {
    pub organization_id: Uuid,
    pub users: Vec<Principal>,
    pub total: usize,
}

/// Get a principal by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "admin",
    operation_id = "getAdminUser",
    params(("id" = Uuid, Path, description = "Principal ID")),
    responses(
        (status = 200, description = "Principal found", body = Principal),
        (status = 400, description = "Malformed principal ID", body = ErrorBody),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 403, description = "Super admin role required", body = ErrorBody),
        (status = 404, description = "Principal not found", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    auth: Authenticated,
    PathParam(id): PathParam<Uuid>,
) -> Result<ApiResponse<Principal>> {
    checks::require_super_admin(&auth)?;

    let principal = load_with_timeout(state.principals.as_ref(), id, state.lookup_timeout)
        .await?
        .ok_or_else(|| AuthError::not_found(USER_NOT_FOUND))?;

    Ok(ApiResponse::success(principal))
}

/// List the members of an organization
#[utoipa::path(
    get,
    path = "/{organization_id}/users",
    tag = "organizations",
    operation_id = "getOrganizationUsers",
    params(("organization_id" = Uuid, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Organization members", body = OrganizationMembersResponse),
        (status = 400, description = "Malformed organization ID", body = ErrorBody),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 403, description = "Not an administrator of this organization", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_organization_users(
    State(state): State<AppState>,
    auth: Authenticated,
    PathParam(organization_id): PathParam<Uuid>,
) -> Result<ApiResponse<OrganizationMembersResponse>> {
    auth.authorize(&checks::organization_admin(organization_id))?;

    let users = state.principals.find_by_organization(organization_id).await?;
    let total = users.len();

    Ok(ApiResponse::success(OrganizationMembersResponse {
        organization_id,
        users,
        total,
    }))
}

pub fn admin_router(state: AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(get_user))
        .with_state(state)
}

pub fn organizations_router(state: AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_organization_users))
        .with_state(state)
}
