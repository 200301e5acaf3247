use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::identity::{Account, NewAccount};

/// Accounts, roles and sessions of the identity subsystem.
///
/// User names are compared exactly; callers normalise them first.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_name(&self, user_name: &str) -> Result<Option<Account>, IdentityError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, IdentityError>;

    /// Store a new account; `DuplicateUserName` when the name is taken
    async fn create_account(&self, account: NewAccount) -> Result<Account, IdentityError>;

    /// Remove an account with its role links and sessions
    async fn delete_account(&self, account_id: Uuid) -> Result<(), IdentityError>;

    async fn role_exists(&self, role: &str) -> Result<bool, IdentityError>;

    /// Create a role; creating an existing role is a no-op
    async fn create_role(&self, role: &str) -> Result<(), IdentityError>;

    async fn is_in_role(&self, account_id: Uuid, role: &str) -> Result<bool, IdentityError>;

    /// Link an account to an existing role; `RoleNotFound` when it does not exist
    async fn add_to_role(&self, account_id: Uuid, role: &str) -> Result<(), IdentityError>;

    async fn remove_from_role(&self, account_id: Uuid, role: &str) -> Result<(), IdentityError>;

    /// Role names of an account, sorted
    async fn roles_for(&self, account_id: Uuid) -> Result<Vec<String>, IdentityError>;

    async fn count_in_role(&self, role: &str) -> Result<u64, IdentityError>;

    async fn create_session(
        &self,
        account_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), IdentityError>;

    /// Account owning an unexpired session
    async fn find_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, IdentityError>;

    /// Returns whether a session was removed
    async fn revoke_session(&self, token_hash: &str) -> Result<bool, IdentityError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum IdentityError {
    #[error("Account not found")]
    AccountNotFound,

    #[error("Role '{0}' does not exist")]
    RoleNotFound(String),

    #[error("User name already exists")]
    DuplicateUserName,

    #[error("Identity store error: {0}")]
    Storage(String),
}
