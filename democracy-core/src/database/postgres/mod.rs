//! SQLx/PostgreSQL implementations of the storage ports.
//!
//! Queries are built at runtime so the crate compiles without a live
//! database; the schema lives in `migrations/` and is applied through
//! [`crate::MIGRATOR`].

mod identity;
mod membership;
mod profiles;

use sqlx::{PgPool, postgres::PgPoolOptions};

pub use identity::PostgresIdentityStore;
pub use membership::PostgresMembershipRepository;
pub use profiles::PostgresProfileRepository;

/// Open a connection pool against `url`.
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}

/// Apply embedded migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    crate::MIGRATOR.run(pool).await
}
