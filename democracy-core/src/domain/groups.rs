//! Voting groups and votings, the records that reference profiles.

use serde::{Deserialize, Serialize};

use super::users::UserId;

pub type GroupId = i64;
pub type VotingId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub group_id: GroupId,
    pub description: String,
}

/// A profile's membership in a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub group_member_id: i64,
    pub group_id: GroupId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voting {
    pub voting_id: VotingId,
    pub description: String,
}

/// A profile standing as candidate in a voting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidacy {
    pub candidate_id: i64,
    pub voting_id: VotingId,
    pub user_id: UserId,
}

pub const DESCRIPTION_MAX: usize = 50;

/// Trimmed description, or a message when it is empty or too long.
pub fn validate_description(raw: &str) -> Result<String, String> {
    let description = raw.trim();
    if description.is_empty() {
        return Err("The description field is required".to_string());
    }
    if description.chars().count() > DESCRIPTION_MAX {
        return Err(format!(
            "The description must be at most {DESCRIPTION_MAX} characters"
        ));
    }
    Ok(description.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_rules() {
        assert_eq!(validate_description("  Class of 2025 ").unwrap(), "Class of 2025");
        assert!(validate_description("   ").is_err());
        assert!(validate_description(&"d".repeat(DESCRIPTION_MAX + 1)).is_err());
    }
}
