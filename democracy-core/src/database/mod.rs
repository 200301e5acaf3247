pub mod memory;
pub mod ports;
pub mod postgres;

pub use memory::{InMemoryDatabase, InMemoryIdentityStore};
pub use ports::{
    identity::{IdentityError, IdentityStore},
    membership::{MembershipError, MembershipRepository},
    profiles::{ProfileRepository, ProfileRepositoryError},
};
pub use postgres::{
    PostgresIdentityStore, PostgresMembershipRepository, PostgresProfileRepository,
};
