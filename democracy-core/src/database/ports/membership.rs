use async_trait::async_trait;

use crate::domain::{
    groups::{Candidacy, Group, GroupId, GroupMembership, Voting, VotingId},
    users::UserId,
};

/// Groups, votings, and the links that tie profiles to them.
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    async fn create_group(&self, description: &str) -> Result<Group, MembershipError>;

    async fn add_group_member(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<GroupMembership, MembershipError>;

    async fn create_voting(&self, description: &str) -> Result<Voting, MembershipError>;

    async fn add_candidate(
        &self,
        voting_id: VotingId,
        user_id: UserId,
    ) -> Result<Candidacy, MembershipError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MembershipError {
    #[error("Group {0} not found")]
    GroupNotFound(GroupId),

    #[error("Voting {0} not found")]
    VotingNotFound(VotingId),

    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("User is already linked")]
    AlreadyLinked,

    #[error("Database query error: {0}")]
    QueryError(String),
}
