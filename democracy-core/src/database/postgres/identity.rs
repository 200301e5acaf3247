use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::database::ports::identity::{IdentityError, IdentityStore};
use crate::domain::identity::{Account, NewAccount};

const ACCOUNT_NAME_CONSTRAINT: &str = "identity_accounts_user_name_key";

#[derive(Debug, FromRow)]
struct AccountRow {
    id: Uuid,
    user_name: String,
    email: String,
    phone_number: Option<String>,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            user_name: row.user_name,
            email: row.email,
            phone_number: row.phone_number,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

fn storage(context: &str, err: sqlx::Error) -> IdentityError {
    IdentityError::Storage(format!("{context}: {err}"))
}

/// PostgreSQL-backed identity store.
#[derive(Clone, Debug)]
pub struct PostgresIdentityStore {
    pool: PgPool,
}

impl PostgresIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn role_id(&self, role: &str) -> Result<Option<Uuid>, IdentityError> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM identity_roles WHERE name = $1")
            .bind(role)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| storage("Failed to look up role", e))?;
        Ok(row.map(|(id,)| id))
    }
}

#[async_trait]
impl IdentityStore for PostgresIdentityStore {
    async fn find_by_name(&self, user_name: &str) -> Result<Option<Account>, IdentityError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, user_name, email, phone_number, password_hash, created_at
            FROM identity_accounts
            WHERE user_name = $1
            "#,
        )
        .bind(user_name)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| storage("Failed to find account by name", e))?;

        Ok(row.map(Account::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, IdentityError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, user_name, email, phone_number, password_hash, created_at
            FROM identity_accounts
            WHERE email = $1
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| storage("Failed to find account by email", e))?;

        Ok(row.map(Account::from))
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account, IdentityError> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO identity_accounts
                (id, user_name, email, phone_number, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(&account.user_name)
        .bind(&account.email)
        .bind(&account.phone_number)
        .bind(&account.password_hash)
        .bind(created_at)
        .execute(self.pool())
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error()
                && db_err.constraint() == Some(ACCOUNT_NAME_CONSTRAINT)
            {
                return IdentityError::DuplicateUserName;
            }
            storage("Failed to create account", e)
        })?;

        info!(account_id = %id, user_name = %account.user_name, "identity account created");
        Ok(account.into_account(id, created_at))
    }

    async fn delete_account(&self, account_id: Uuid) -> Result<(), IdentityError> {
        let result = sqlx::query("DELETE FROM identity_accounts WHERE id = $1")
            .bind(account_id)
            .execute(self.pool())
            .await
            .map_err(|e| storage("Failed to delete account", e))?;

        if result.rows_affected() == 0 {
            return Err(IdentityError::AccountNotFound);
        }
        Ok(())
    }

    async fn role_exists(&self, role: &str) -> Result<bool, IdentityError> {
        Ok(self.role_id(role).await?.is_some())
    }

    async fn create_role(&self, role: &str) -> Result<(), IdentityError> {
        sqlx::query(
            r#"
            INSERT INTO identity_roles (id, name)
            VALUES ($1, $2)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(role)
        .execute(self.pool())
        .await
        .map_err(|e| storage("Failed to create role", e))?;
        Ok(())
    }

    async fn is_in_role(&self, account_id: Uuid, role: &str) -> Result<bool, IdentityError> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT ar.account_id
            FROM identity_account_roles ar
            INNER JOIN identity_roles r ON r.id = ar.role_id
            WHERE ar.account_id = $1 AND r.name = $2
            "#,
        )
        .bind(account_id)
        .bind(role)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| storage("Failed to check role membership", e))?;
        Ok(row.is_some())
    }

    async fn add_to_role(&self, account_id: Uuid, role: &str) -> Result<(), IdentityError> {
        let role_id = self
            .role_id(role)
            .await?
            .ok_or_else(|| IdentityError::RoleNotFound(role.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO identity_account_roles (account_id, role_id)
            VALUES ($1, $2)
            ON CONFLICT (account_id, role_id) DO NOTHING
            "#,
        )
        .bind(account_id)
        .bind(role_id)
        .execute(self.pool())
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error()
                && db_err.is_foreign_key_violation()
            {
                return IdentityError::AccountNotFound;
            }
            storage("Failed to add role", e)
        })?;
        Ok(())
    }

    async fn remove_from_role(&self, account_id: Uuid, role: &str) -> Result<(), IdentityError> {
        sqlx::query(
            r#"
            DELETE FROM identity_account_roles ar
            USING identity_roles r
            WHERE ar.role_id = r.id AND ar.account_id = $1 AND r.name = $2
            "#,
        )
        .bind(account_id)
        .bind(role)
        .execute(self.pool())
        .await
        .map_err(|e| storage("Failed to remove role", e))?;
        Ok(())
    }

    async fn roles_for(&self, account_id: Uuid) -> Result<Vec<String>, IdentityError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT r.name
            FROM identity_roles r
            INNER JOIN identity_account_roles ar ON ar.role_id = r.id
            WHERE ar.account_id = $1
            ORDER BY r.name
            "#,
        )
        .bind(account_id)
        .fetch_all(self.pool())
        .await
        .map_err(|e| storage("Failed to list roles", e))?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn count_in_role(&self, role: &str) -> Result<u64, IdentityError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM identity_account_roles ar
            INNER JOIN identity_roles r ON r.id = ar.role_id
            WHERE r.name = $1
            "#,
        )
        .bind(role)
        .fetch_one(self.pool())
        .await
        .map_err(|e| storage("Failed to count role members", e))?;
        Ok(count.max(0) as u64)
    }

    async fn create_session(
        &self,
        account_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), IdentityError> {
        sqlx::query(
            r#"
            INSERT INTO identity_sessions (token_hash, account_id, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(token_hash)
        .bind(account_id)
        .bind(expires_at)
        .execute(self.pool())
        .await
        .map_err(|e| storage("Failed to create session", e))?;
        Ok(())
    }

    async fn find_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, IdentityError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT a.id, a.user_name, a.email, a.phone_number, a.password_hash, a.created_at
            FROM identity_sessions s
            INNER JOIN identity_accounts a ON a.id = s.account_id
            WHERE s.token_hash = $1 AND s.expires_at > $2
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| storage("Failed to resolve session", e))?;
        Ok(row.map(Account::from))
    }

    async fn revoke_session(&self, token_hash: &str) -> Result<bool, IdentityError> {
        let result = sqlx::query("DELETE FROM identity_sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(self.pool())
            .await
            .map_err(|e| storage("Failed to revoke session", e))?;
        Ok(result.rows_affected() > 0)
    }
}
