//! Identity accounts: credentials, roles and sessions.
//!
//! Accounts live in their own store and are matched to profile records by
//! user name. Passwords are hashed with Argon2id; session tokens are random
//! secrets of which only a SHA-256 digest is persisted.

pub mod account;
pub mod password;
pub mod session;

pub use account::{Account, NewAccount, Role};
pub use session::{SessionToken, hash_session_token};
