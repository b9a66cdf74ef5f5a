//! Authorization Service
//!
//! Role and organization-scope checks evaluated against the principal that
//! the authentication stage reloaded for this request.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::token_service::Claims;
use crate::principal::entity::{Principal, Role};
use crate::shared::error::{AuthError, Result, INSUFFICIENT_PERMISSIONS, ORGANIZATION_ACCESS_DENIED};

/// Facts about the token that authenticated the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub token_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionInfo {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            token_id: claims.jti,
            issued_at: claims.issued_at(),
            expires_at: claims.expires_at(),
        }
    }
}

/// Authorization context for a request
#[derive(Debug, Clone)]
pub struct AuthContext {
    principal: Principal,
    session: SessionInfo,
}

impl AuthContext {
    pub fn new(principal: Principal, session: SessionInfo) -> Self {
        Self { principal, session }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn principal_id(&self) -> Uuid {
        self.principal.id
    }

    /// Current role from the principal store, not the token
    pub fn role(&self) -> Role {
        self.principal.role
    }

    pub fn organization_id(&self) -> Option<Uuid> {
        self.principal.organization_id
    }

    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    pub fn into_principal(self) -> Principal {
        self.principal
    }

    pub fn require_role(&self, allowed: &[Role]) -> Result<()> {
        Check::RequireRole(allowed.to_vec()).evaluate(&self.principal)
    }

    pub fn require_organization_scope(&self, organization_id: Uuid) -> Result<()> {
        Check::RequireOrganizationScope(organization_id).evaluate(&self.principal)
    }

    pub fn authorize(&self, policy: &AuthorizationPolicy) -> Result<()> {
        policy.enforce(self)
    }
}

/// A single access rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    /// Principal's role must be one of these
    RequireRole(Vec<Role>),
    /// Principal must be allowed into this organization
    RequireOrganizationScope(Uuid),
}

impl Check {
    pub fn evaluate(&self, principal: &Principal) -> Result<()> {
        match self {
            Check::RequireRole(allowed) => {
                if allowed.contains(&principal.role) {
                    Ok(())
                } else {
                    Err(AuthError::forbidden(INSUFFICIENT_PERMISSIONS))
                }
            }
            Check::RequireOrganizationScope(target) => match principal.role {
                Role::SuperAdmin => Ok(()),
                Role::OrgAdmin if principal.organization_id == Some(*target) => Ok(()),
                Role::OrgAdmin | Role::TeamMember | Role::Public => {
                    Err(AuthError::forbidden(ORGANIZATION_ACCESS_DENIED))
                }
            },
        }
    }
}

pub fn require_role(allowed: &[Role]) -> Check {
    Check::RequireRole(allowed.to_vec())
}

pub fn require_organization_scope(organization_id: Uuid) -> Check {
    Check::RequireOrganizationScope(organization_id)
}

/// Ordered list of checks. The first failing check decides the error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationPolicy {
    checks: Vec<Check>,
}

impl AuthorizationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    pub fn require_role(self, allowed: &[Role]) -> Self {
        self.then(require_role(allowed))
    }

    pub fn require_organization_scope(self, organization_id: Uuid) -> Self {
        self.then(require_organization_scope(organization_id))
    }

    pub fn enforce(&self, context: &AuthContext) -> Result<()> {
        self.checks
            .iter()
            .try_for_each(|check| check.evaluate(context.principal()))
    }
}

/// Common policies
pub mod checks {
    use super::*;

    /// Platform operators only
    pub fn require_super_admin(context: &AuthContext) -> Result<()> {
        context.require_role(&[Role::SuperAdmin])
    }

    /// Platform operators or organization administrators
    pub fn require_admin(context: &AuthContext) -> Result<()> {
        context.require_role(&[Role::SuperAdmin, Role::OrgAdmin])
    }

    /// Administrative access to one organization
    pub fn organization_admin(organization_id: Uuid) -> AuthorizationPolicy {
        AuthorizationPolicy::new()
            .require_role(&[Role::SuperAdmin, Role::OrgAdmin])
            .require_organization_scope(organization_id)
    }
}
