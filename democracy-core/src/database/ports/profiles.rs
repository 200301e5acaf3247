use async_trait::async_trait;

use crate::domain::users::{NewUser, User, UserId, UserRelations};

/// Persistence of profile records.
///
/// Implementations classify storage failures into the typed variants of
/// [`ProfileRepositoryError`] so callers never inspect error messages.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// All profiles ordered by last name, then first name
    async fn list(&self) -> Result<Vec<User>, ProfileRepositoryError>;

    async fn find(&self, id: UserId) -> Result<Option<User>, ProfileRepositoryError>;

    /// Group memberships and candidacies referencing the profile
    async fn relations(&self, id: UserId) -> Result<UserRelations, ProfileRepositoryError>;

    /// Store a new profile; `DuplicateUserName` when the name is taken
    async fn insert(&self, user: NewUser) -> Result<User, ProfileRepositoryError>;

    /// Overwrite every column of an existing profile; `NotFound` when absent
    async fn update(&self, user: &User) -> Result<(), ProfileRepositoryError>;

    /// Remove a profile; `HasRelatedRecords` when anything still references it
    async fn delete(&self, id: UserId) -> Result<(), ProfileRepositoryError>;
}

/// Errors that can occur during profile repository operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProfileRepositoryError {
    #[error("User {0} not found")]
    NotFound(UserId),

    #[error("User name already exists")]
    DuplicateUserName,

    #[error("User has related records")]
    HasRelatedRecords,

    #[error("Database query error: {0}")]
    QueryError(String),
}
