//! Profile records and the read models built from them.

use serde::{Deserialize, Serialize};

use crate::domain::groups::{Candidacy, GroupMembership};

/// Store-assigned identifier of a profile record.
pub type UserId = i64;

/// A person as the voting application sees them.
///
/// `user_name` is the person's e-mail address and the only link to the
/// matching identity account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub grade: Option<String>,
    pub group: Option<String>,
    /// Public path of the stored photo, if one was uploaded
    pub photo: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Copy editable fields from `changes`, keeping the current photo when no
    /// new one was stored.
    pub fn apply(&mut self, changes: UserChanges) {
        self.first_name = changes.first_name;
        self.last_name = changes.last_name;
        self.phone = changes.phone;
        self.address = changes.address;
        self.grade = changes.grade;
        self.group = changes.group;
        if let Some(photo) = changes.photo {
            self.photo = Some(photo);
        }
    }
}

/// Validated values for a profile that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub grade: Option<String>,
    pub group: Option<String>,
    pub photo: Option<String>,
}

impl NewUser {
    pub fn into_user(self, user_id: UserId) -> User {
        User {
            user_id,
            user_name: self.user_name,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            address: self.address,
            grade: self.grade,
            group: self.group,
            photo: self.photo,
        }
    }
}

/// Validated edit of an existing profile. The user name is not editable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserChanges {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub grade: Option<String>,
    pub group: Option<String>,
    pub photo: Option<String>,
}

/// Rows that reference a profile and block its deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRelations {
    pub group_members: Vec<GroupMembership>,
    pub candidates: Vec<Candidacy>,
}

/// One row of the admin user list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIndexEntry {
    #[serde(flatten)]
    pub user: User,
    pub full_name: String,
    pub is_admin: bool,
    pub group_member_count: usize,
    pub candidate_count: usize,
}

/// Profile with its relations, as shown on the details and delete screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    #[serde(flatten)]
    pub user: User,
    pub full_name: String,
    pub is_admin: bool,
    #[serde(flatten)]
    pub relations: UserRelations,
}

/// Current values pre-filled into the edit form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEditView {
    pub user_id: UserId,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub grade: Option<String>,
    pub group: Option<String>,
    pub photo: Option<String>,
}

impl From<User> for UserEditView {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            user_name: user.user_name,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            address: user.address,
            grade: user.grade,
            group: user.group,
            photo: user.photo,
        }
    }
}

/// Result of flipping the admin role of a profile's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminToggle {
    pub user_id: UserId,
    pub user_name: String,
    pub is_admin: bool,
}
