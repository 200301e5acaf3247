//! In-process stores with the same constraint behaviour as the PostgreSQL
//! schema: unique user names, and restricted deletes for referenced profiles.

mod identity;
mod profiles;

pub use identity::InMemoryIdentityStore;
pub use profiles::InMemoryDatabase;
