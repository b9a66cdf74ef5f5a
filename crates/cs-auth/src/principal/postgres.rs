//! PostgreSQL Principal Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::principal::entity::{Principal, PrincipalStatus, Role};
use crate::principal::repository::{PrincipalLoader, PrincipalStore};
use crate::shared::error::{AuthError, Result, EMAIL_ALREADY_REGISTERED};

const SELECT_COLUMNS: &str = "id, email, password_hash, full_name, phone, role, organization_id, \
     status, last_login_at, created_at, updated_at";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS principals (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        full_name TEXT NOT NULL DEFAULT '',
        phone TEXT,
        role TEXT NOT NULL DEFAULT 'public',
        organization_id UUID,
        status TEXT NOT NULL DEFAULT 'active',
        last_login_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_principals_organization_id ON principals(organization_id)",
    "CREATE INDEX IF NOT EXISTS idx_principals_role ON principals(role)",
];

/// Postgres unique_violation
const UNIQUE_VIOLATION: &str = "23505";

pub struct PgPrincipalRepository {
    pool: PgPool,
}

impl PgPrincipalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the principals table and its indexes if missing
    pub async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Principal schema initialized");
        Ok(())
    }

    fn parse_row(row: &PgRow) -> Result<Principal> {
        let role: String = row.try_get("role")?;
        let role = role
            .parse::<Role>()
            .map_err(|e| AuthError::internal(format!("stored principal has {}", e)))?;

        let status: String = row.try_get("status")?;
        let status = status
            .parse::<PrincipalStatus>()
            .map_err(|e| AuthError::internal(format!("stored principal has {}", e)))?;

        Ok(Principal {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            full_name: row.try_get("full_name")?,
            phone: row.try_get("phone")?,
            role,
            organization_id: row.try_get("organization_id")?,
            status,
            password_hash: row.try_get("password_hash")?,
            last_login_at: row.try_get("last_login_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

fn map_insert_error(err: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return AuthError::validation(EMAIL_ALREADY_REGISTERED);
        }
    }
    err.into()
}

#[async_trait]
impl PrincipalLoader for PgPrincipalRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>> {
        let query = format!("SELECT {} FROM principals WHERE id = $1", SELECT_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::parse_row).transpose()
    }
}

#[async_trait]
impl PrincipalStore for PgPrincipalRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>> {
        let query = format!("SELECT {} FROM principals WHERE email = $1", SELECT_COLUMNS);
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::parse_row).transpose()
    }

    async fn insert(&self, principal: &Principal) -> Result<()> {
        sqlx::query(
            "INSERT INTO principals (id, email, password_hash, full_name, phone, role, \
             organization_id, status, last_login_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(principal.id)
        .bind(&principal.email)
        .bind(&principal.password_hash)
        .bind(&principal.full_name)
        .bind(&principal.phone)
        .bind(principal.role.as_str())
        .bind(principal.organization_id)
        .bind(principal.status.as_str())
        .bind(principal.last_login_at)
        .bind(principal.created_at)
        .bind(principal.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;

        debug!(principal_id = %principal.id, "Inserted principal");
        Ok(())
    }

    async fn update(&self, principal: &Principal) -> Result<()> {
        let result = sqlx::query(
            "UPDATE principals SET email = $2, password_hash = $3, full_name = $4, phone = $5, \
             role = $6, organization_id = $7, status = $8, last_login_at = $9, updated_at = $10 \
             WHERE id = $1",
        )
        .bind(principal.id)
        .bind(&principal.email)
        .bind(&principal.password_hash)
        .bind(&principal.full_name)
        .bind(&principal.phone)
        .bind(principal.role.as_str())
        .bind(principal.organization_id)
        .bind(principal.status.as_str())
        .bind(principal.last_login_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::not_found(format!("principal {} not found", principal.id)));
        }
        Ok(())
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE principals SET last_login_at = $2, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_by_organization(&self, organization_id: Uuid) -> Result<Vec<Principal>> {
        let query = format!(
            "SELECT {} FROM principals WHERE organization_id = $1 ORDER BY created_at ASC, email ASC",
            SELECT_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::parse_row).collect()
    }

    async fn count_by_role(&self, role: Role) -> Result<u64> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM principals WHERE role = $1")
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await?
            .try_get("count")?;
        Ok(count.max(0) as u64)
    }
}
