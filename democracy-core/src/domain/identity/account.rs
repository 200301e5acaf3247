use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Login entity of the identity store.
///
/// The password hash is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    /// Unique login name; equal to the e-mail for provisioned accounts
    pub user_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Values for an account that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub user_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub password_hash: String,
}

impl NewAccount {
    pub fn into_account(self, id: Uuid, created_at: DateTime<Utc>) -> Account {
        Account {
            id,
            user_name: self.user_name,
            email: self.email,
            phone_number: self.phone_number,
            password_hash: self.password_hash,
            created_at,
        }
    }
}

/// Roles known to the admin service.
///
/// The identity store holds role names as strings so other roles can exist,
/// but only these two are created or checked here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// May use every admin endpoint
    Admin,
    /// Default role of every provisioned account
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::User => "User",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}
