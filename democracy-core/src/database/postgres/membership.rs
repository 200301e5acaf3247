use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use crate::database::ports::membership::{MembershipError, MembershipRepository};
use crate::domain::groups::{Candidacy, Group, GroupId, GroupMembership, Voting, VotingId};
use crate::domain::users::UserId;

/// PostgreSQL-backed implementation of the `MembershipRepository` port.
#[derive(Clone, Debug)]
pub struct PostgresMembershipRepository {
    pool: PgPool,
}

impl PostgresMembershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn user_exists(&self, user_id: UserId) -> Result<bool, MembershipError> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT user_id FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| MembershipError::QueryError(format!("Failed to look up user: {e}")))?;
        Ok(found.is_some())
    }
}

fn classify_link(err: sqlx::Error, context: &str) -> MembershipError {
    if let Some(db_err) = err.as_database_error()
        && db_err.is_unique_violation()
    {
        return MembershipError::AlreadyLinked;
    }
    MembershipError::QueryError(format!("{context}: {err}"))
}

#[async_trait]
impl MembershipRepository for PostgresMembershipRepository {
    async fn create_group(&self, description: &str) -> Result<Group, MembershipError> {
        let (group_id,): (i64,) =
            sqlx::query_as("INSERT INTO groups (description) VALUES ($1) RETURNING group_id")
                .bind(description)
                .fetch_one(self.pool())
                .await
                .map_err(|e| MembershipError::QueryError(format!("Failed to create group: {e}")))?;

        info!(group_id, "group created");
        Ok(Group {
            group_id,
            description: description.to_string(),
        })
    }

    async fn add_group_member(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<GroupMembership, MembershipError> {
        let group: Option<(i64,)> =
            sqlx::query_as("SELECT group_id FROM groups WHERE group_id = $1")
                .bind(group_id)
                .fetch_optional(self.pool())
                .await
                .map_err(|e| {
                    MembershipError::QueryError(format!("Failed to look up group: {e}"))
                })?;
        if group.is_none() {
            return Err(MembershipError::GroupNotFound(group_id));
        }
        if !self.user_exists(user_id).await? {
            return Err(MembershipError::UserNotFound(user_id));
        }

        let (group_member_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO group_members (group_id, user_id)
            VALUES ($1, $2)
            RETURNING group_member_id
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(self.pool())
        .await
        .map_err(|e| classify_link(e, "Failed to add group member"))?;

        info!(group_id, user_id, "group member added");
        Ok(GroupMembership {
            group_member_id,
            group_id,
            user_id,
        })
    }

    async fn create_voting(&self, description: &str) -> Result<Voting, MembershipError> {
        let (voting_id,): (i64,) =
            sqlx::query_as("INSERT INTO votings (description) VALUES ($1) RETURNING voting_id")
                .bind(description)
                .fetch_one(self.pool())
                .await
                .map_err(|e| MembershipError::QueryError(format!("Failed to create voting: {e}")))?;

        info!(voting_id, "voting created");
        Ok(Voting {
            voting_id,
            description: description.to_string(),
        })
    }

    async fn add_candidate(
        &self,
        voting_id: VotingId,
        user_id: UserId,
    ) -> Result<Candidacy, MembershipError> {
        let voting: Option<(i64,)> =
            sqlx::query_as("SELECT voting_id FROM votings WHERE voting_id = $1")
                .bind(voting_id)
                .fetch_optional(self.pool())
                .await
                .map_err(|e| {
                    MembershipError::QueryError(format!("Failed to look up voting: {e}"))
                })?;
        if voting.is_none() {
            return Err(MembershipError::VotingNotFound(voting_id));
        }
        if !self.user_exists(user_id).await? {
            return Err(MembershipError::UserNotFound(user_id));
        }

        let (candidate_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO candidates (voting_id, user_id)
            VALUES ($1, $2)
            RETURNING candidate_id
            "#,
        )
        .bind(voting_id)
        .bind(user_id)
        .fetch_one(self.pool())
        .await
        .map_err(|e| classify_link(e, "Failed to add candidate"))?;

        info!(voting_id, user_id, "candidate added");
        Ok(Candidacy {
            candidate_id,
            voting_id,
            user_id,
        })
    }
}
