use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::database::ports::membership::{MembershipError, MembershipRepository};
use crate::database::ports::profiles::{ProfileRepository, ProfileRepositoryError};
use crate::domain::groups::{Candidacy, Group, GroupId, GroupMembership, Voting, VotingId};
use crate::domain::users::{NewUser, User, UserId, UserRelations};

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    users: BTreeMap<UserId, User>,
    groups: BTreeMap<GroupId, Group>,
    group_members: Vec<GroupMembership>,
    votings: BTreeMap<VotingId, Voting>,
    candidates: Vec<Candidacy>,
}

impl State {
    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Profile, group and voting tables held in memory.
///
/// One struct backs both ports so profile deletes can see the rows that
/// reference them.
#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    state: RwLock<State>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileRepository for InMemoryDatabase {
    async fn list(&self) -> Result<Vec<User>, ProfileRepositoryError> {
        let state = self.state.read();
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| {
            (&a.last_name, &a.first_name, a.user_id).cmp(&(&b.last_name, &b.first_name, b.user_id))
        });
        Ok(users)
    }

    async fn find(&self, id: UserId) -> Result<Option<User>, ProfileRepositoryError> {
        Ok(self.state.read().users.get(&id).cloned())
    }

    async fn relations(&self, id: UserId) -> Result<UserRelations, ProfileRepositoryError> {
        let state = self.state.read();
        Ok(UserRelations {
            group_members: state
                .group_members
                .iter()
                .filter(|m| m.user_id == id)
                .cloned()
                .collect(),
            candidates: state
                .candidates
                .iter()
                .filter(|c| c.user_id == id)
                .cloned()
                .collect(),
        })
    }

    async fn insert(&self, user: NewUser) -> Result<User, ProfileRepositoryError> {
        let mut state = self.state.write();
        if state.users.values().any(|u| u.user_name == user.user_name) {
            return Err(ProfileRepositoryError::DuplicateUserName);
        }
        let user_id = state.allocate();
        let user = user.into_user(user_id);
        state.users.insert(user_id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<(), ProfileRepositoryError> {
        let mut state = self.state.write();
        match state.users.get_mut(&user.user_id) {
            Some(stored) => {
                // user_name is not part of the UPDATE statement either
                let user_name = std::mem::take(&mut stored.user_name);
                *stored = user.clone();
                stored.user_name = user_name;
                Ok(())
            }
            None => Err(ProfileRepositoryError::NotFound(user.user_id)),
        }
    }

    async fn delete(&self, id: UserId) -> Result<(), ProfileRepositoryError> {
        let mut state = self.state.write();
        if !state.users.contains_key(&id) {
            return Err(ProfileRepositoryError::NotFound(id));
        }
        let referenced = state.group_members.iter().any(|m| m.user_id == id)
            || state.candidates.iter().any(|c| c.user_id == id);
        if referenced {
            return Err(ProfileRepositoryError::HasRelatedRecords);
        }
        state.users.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl MembershipRepository for InMemoryDatabase {
    async fn create_group(&self, description: &str) -> Result<Group, MembershipError> {
        let mut state = self.state.write();
        let group = Group {
            group_id: state.allocate(),
            description: description.to_string(),
        };
        state.groups.insert(group.group_id, group.clone());
        Ok(group)
    }

    async fn add_group_member(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<GroupMembership, MembershipError> {
        let mut state = self.state.write();
        if !state.groups.contains_key(&group_id) {
            return Err(MembershipError::GroupNotFound(group_id));
        }
        if !state.users.contains_key(&user_id) {
            return Err(MembershipError::UserNotFound(user_id));
        }
        if state
            .group_members
            .iter()
            .any(|m| m.group_id == group_id && m.user_id == user_id)
        {
            return Err(MembershipError::AlreadyLinked);
        }
        let membership = GroupMembership {
            group_member_id: state.allocate(),
            group_id,
            user_id,
        };
        state.group_members.push(membership.clone());
        Ok(membership)
    }

    async fn create_voting(&self, description: &str) -> Result<Voting, MembershipError> {
        let mut state = self.state.write();
        let voting = Voting {
            voting_id: state.allocate(),
            description: description.to_string(),
        };
        state.votings.insert(voting.voting_id, voting.clone());
        Ok(voting)
    }

    async fn add_candidate(
        &self,
        voting_id: VotingId,
        user_id: UserId,
    ) -> Result<Candidacy, MembershipError> {
        let mut state = self.state.write();
        if !state.votings.contains_key(&voting_id) {
            return Err(MembershipError::VotingNotFound(voting_id));
        }
        if !state.users.contains_key(&user_id) {
            return Err(MembershipError::UserNotFound(user_id));
        }
        if state
            .candidates
            .iter()
            .any(|c| c.voting_id == voting_id && c.user_id == user_id)
        {
            return Err(MembershipError::AlreadyLinked);
        }
        let candidacy = Candidacy {
            candidate_id: state.allocate(),
            voting_id,
            user_id,
        };
        state.candidates.push(candidacy.clone());
        Ok(candidacy)
    }
}
