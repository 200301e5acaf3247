use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::database::ports::profiles::{ProfileRepository, ProfileRepositoryError};
use crate::domain::groups::{Candidacy, GroupMembership};
use crate::domain::users::{NewUser, User, UserId, UserRelations};

const USER_NAME_CONSTRAINT: &str = "users_user_name_key";

const USER_COLUMNS: &str = r#"
    user_id, user_name, first_name, last_name, phone, address,
    grade, "group" AS group_name, photo
"#;

#[derive(Debug, FromRow)]
struct UserRow {
    user_id: i64,
    user_name: String,
    first_name: String,
    last_name: String,
    phone: String,
    address: String,
    grade: Option<String>,
    group_name: Option<String>,
    photo: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            user_id: row.user_id,
            user_name: row.user_name,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            address: row.address,
            grade: row.grade,
            group: row.group_name,
            photo: row.photo,
        }
    }
}

/// PostgreSQL-backed implementation of the `ProfileRepository` port.
#[derive(Clone, Debug)]
pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map constraint violations to typed errors; everything else is a query error.
fn classify(err: sqlx::Error, context: &str) -> ProfileRepositoryError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.constraint() == Some(USER_NAME_CONSTRAINT) {
            return ProfileRepositoryError::DuplicateUserName;
        }
        if db_err.is_foreign_key_violation() {
            return ProfileRepositoryError::HasRelatedRecords;
        }
    }
    ProfileRepositoryError::QueryError(format!("{context}: {err}"))
}

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    async fn list(&self) -> Result<Vec<User>, ProfileRepositoryError> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY last_name, first_name, user_id"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(|e| classify(e, "Failed to list users"))?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn find(&self, id: UserId) -> Result<Option<User>, ProfileRepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"))
                .bind(id)
                .fetch_optional(self.pool())
                .await
                .map_err(|e| classify(e, "Failed to get user by id"))?;

        Ok(row.map(User::from))
    }

    async fn relations(&self, id: UserId) -> Result<UserRelations, ProfileRepositoryError> {
        let group_members: Vec<(i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT group_member_id, group_id, user_id
            FROM group_members
            WHERE user_id = $1
            ORDER BY group_member_id
            "#,
        )
        .bind(id)
        .fetch_all(self.pool())
        .await
        .map_err(|e| classify(e, "Failed to load group memberships"))?;

        let candidates: Vec<(i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT candidate_id, voting_id, user_id
            FROM candidates
            WHERE user_id = $1
            ORDER BY candidate_id
            "#,
        )
        .bind(id)
        .fetch_all(self.pool())
        .await
        .map_err(|e| classify(e, "Failed to load candidacies"))?;

        Ok(UserRelations {
            group_members: group_members
                .into_iter()
                .map(|(group_member_id, group_id, user_id)| GroupMembership {
                    group_member_id,
                    group_id,
                    user_id,
                })
                .collect(),
            candidates: candidates
                .into_iter()
                .map(|(candidate_id, voting_id, user_id)| Candidacy {
                    candidate_id,
                    voting_id,
                    user_id,
                })
                .collect(),
        })
    }

    async fn insert(&self, user: NewUser) -> Result<User, ProfileRepositoryError> {
        let (user_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO users (
                user_name, first_name, last_name, phone, address,
                grade, "group", photo
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING user_id
            "#,
        )
        .bind(&user.user_name)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(&user.grade)
        .bind(&user.group)
        .bind(&user.photo)
        .fetch_one(self.pool())
        .await
        .map_err(|e| classify(e, "Failed to create user"))?;

        info!(user_id, user_name = %user.user_name, "profile inserted");
        Ok(user.into_user(user_id))
    }

    async fn update(&self, user: &User) -> Result<(), ProfileRepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, phone = $4, address = $5,
                grade = $6, "group" = $7, photo = $8
            WHERE user_id = $1
            "#,
        )
        .bind(user.user_id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(&user.grade)
        .bind(&user.group)
        .bind(&user.photo)
        .execute(self.pool())
        .await
        .map_err(|e| classify(e, "Failed to update user"))?;

        if result.rows_affected() == 0 {
            return Err(ProfileRepositoryError::NotFound(user.user_id));
        }
        Ok(())
    }

    async fn delete(&self, id: UserId) -> Result<(), ProfileRepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(|e| classify(e, "Failed to delete user"))?;

        if result.rows_affected() == 0 {
            return Err(ProfileRepositoryError::NotFound(id));
        }
        Ok(())
    }
}
