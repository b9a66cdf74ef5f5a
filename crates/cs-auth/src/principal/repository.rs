//! Principal Repository
//!
//! `PrincipalLoader` is the narrow read seam the authentication stage depends
//! on. `PrincipalStore` adds what login, registration and the admin routes
//! need. Both are object safe so backends can be swapped at startup.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::principal::entity::{Principal, Role};
use crate::shared::error::{AuthError, Result, EMAIL_ALREADY_REGISTERED};

#[async_trait]
pub trait PrincipalLoader: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>>;
}

#[async_trait]
pub trait PrincipalStore: PrincipalLoader {
    /// Lookup by normalized (lower-cased) email
    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>>;

    /// Insert a new principal. Fails with a validation error if the email is taken.
    async fn insert(&self, principal: &Principal) -> Result<()>;

    async fn update(&self, principal: &Principal) -> Result<()>;

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;

    async fn find_by_organization(&self, organization_id: Uuid) -> Result<Vec<Principal>>;

    async fn count_by_role(&self, role: Role) -> Result<u64>;
}

/// Load a principal, failing with an internal error once `timeout` elapses.
pub async fn load_with_timeout<L: PrincipalLoader + ?Sized>(
    loader: &L,
    id: Uuid,
    timeout: Duration,
) -> Result<Option<Principal>> {
    match tokio::time::timeout(timeout, loader.find_by_id(id)).await {
        Ok(result) => result,
        Err(_) => Err(AuthError::internal(format!(
            "principal lookup for {} timed out after {:?}",
            id, timeout
        ))),
    }
}

/// Process-local store, used when no database is configured and in tests.
#[derive(Default)]
pub struct InMemoryPrincipalStore {
    principals: RwLock<HashMap<Uuid, Principal>>,
}

impl InMemoryPrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.principals.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.principals.read().await.is_empty()
    }
}

#[async_trait]
impl PrincipalLoader for InMemoryPrincipalStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>> {
        Ok(self.principals.read().await.get(&id).cloned())
    }
}

#[async_trait]
impl PrincipalStore for InMemoryPrincipalStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>> {
        let principals = self.principals.read().await;
        Ok(principals.values().find(|p| p.email == email).cloned())
    }

    async fn insert(&self, principal: &Principal) -> Result<()> {
        let mut principals = self.principals.write().await;
        if principals.values().any(|p| p.email == principal.email) {
            return Err(AuthError::validation(EMAIL_ALREADY_REGISTERED));
        }
        principals.insert(principal.id, principal.clone());
        Ok(())
    }

    async fn update(&self, principal: &Principal) -> Result<()> {
        let mut principals = self.principals.write().await;
        match principals.get_mut(&principal.id) {
            Some(existing) => {
                *existing = principal.clone();
                Ok(())
            }
            None => Err(AuthError::not_found(format!("principal {} not found", principal.id))),
        }
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        if let Some(principal) = self.principals.write().await.get_mut(&id) {
            principal.record_login(at);
        }
        Ok(())
    }

    async fn find_by_organization(&self, organization_id: Uuid) -> Result<Vec<Principal>> {
        let principals = self.principals.read().await;
        let mut members: Vec<Principal> = principals
            .values()
            .filter(|p| p.organization_id == Some(organization_id))
            .cloned()
            .collect();
        members.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.email.cmp(&b.email)));
        Ok(members)
    }

    async fn count_by_role(&self, role: Role) -> Result<u64> {
        let principals = self.principals.read().await;
        Ok(principals.values().filter(|p| p.role == role).count() as u64)
    }
}
