//! Bootstrap Admin Seeder
//!
//! Creates the first super admin on startup when the store has none.

use std::sync::Arc;

use tracing::info;

use crate::auth::credential_store::CredentialStore;
use crate::principal::entity::{Principal, Role};
use crate::principal::repository::PrincipalStore;
use crate::shared::error::{AuthError, Result};

pub struct AdminSeeder {
    store: Arc<dyn PrincipalStore>,
    credentials: Arc<CredentialStore>,
}

impl AdminSeeder {
    pub fn new(store: Arc<dyn PrincipalStore>, credentials: Arc<CredentialStore>) -> Self {
        Self { store, credentials }
    }

    /// Returns the created principal, or `None` if a super admin already exists.
    pub async fn seed(&self, email: &str, password: &str, full_name: &str) -> Result<Option<Principal>> {
        let existing = self.store.count_by_role(Role::SuperAdmin).await?;
        if existing > 0 {
            info!(count = existing, "Super admin already exists, skipping bootstrap");
            return Ok(None);
        }

        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AuthError::validation("bootstrap admin email is empty"));
        }

        let password_hash = self.credentials.hash(password)?;
        let admin = Principal::new(email, full_name, Role::SuperAdmin).with_password_hash(password_hash);
        self.store.insert(&admin).await?;

        info!(principal_id = %admin.id, email = %admin.email, "Bootstrap super admin created");
        Ok(Some(admin))
    }
}
