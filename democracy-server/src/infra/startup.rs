use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use democracy_core::{
    Role, UserAdminService,
    database::{
        InMemoryDatabase, InMemoryIdentityStore, IdentityStore, MembershipRepository,
        PostgresIdentityStore, PostgresMembershipRepository, PostgresProfileRepository,
        ProfileRepository, postgres,
    },
    domain::{
        identity::{NewAccount, password},
        users::normalize_user_name,
    },
    photos::PhotoStore,
};

use crate::infra::{app_state::AppState, config::Config};
use crate::users::auth::AuthService;

/// Storage backends selected from configuration.
pub struct Stores {
    pub profiles: Arc<dyn ProfileRepository>,
    pub identity: Arc<dyn IdentityStore>,
    pub membership: Arc<dyn MembershipRepository>,
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

impl Stores {
    pub fn in_memory() -> Self {
        let database = Arc::new(InMemoryDatabase::new());
        Self {
            profiles: database.clone(),
            identity: Arc::new(InMemoryIdentityStore::new()),
            membership: database,
        }
    }

    /// Connect to PostgreSQL and apply migrations, or fall back to memory in
    /// dev mode when no URL is configured.
    pub async fn connect(config: &Config) -> Result<Self> {
        let Some(url) = config.database.url.as_deref() else {
            anyhow::ensure!(config.dev_mode, "DATABASE_URL is required outside dev mode");
            warn!("Running on in-memory stores; data is lost on shutdown");
            return Ok(Self::in_memory());
        };

        let pool = postgres::connect(url, config.database.max_connections)
            .await
            .context("failed to connect to PostgreSQL")?;
        postgres::migrate(&pool)
            .await
            .context("database migration failed")?;
        info!("Connected to PostgreSQL and applied migrations");

        Ok(Self {
            profiles: Arc::new(PostgresProfileRepository::new(pool.clone())),
            identity: Arc::new(PostgresIdentityStore::new(pool.clone())),
            membership: Arc::new(PostgresMembershipRepository::new(pool)),
        })
    }
}

pub fn build_state(config: Arc<Config>, stores: Stores) -> AppState {
    let photos = Arc::new(PhotoStore::new(
        config.storage.photos_dir.clone(),
        config.storage.max_photo_bytes,
    ));
    let users = UserAdminService::new(stores.profiles, stores.identity.clone(), photos);
    let ttl = chrono::Duration::from_std(config.auth.session_ttl)
        .unwrap_or_else(|_| chrono::Duration::hours(12));
    let auth = AuthService::new(stores.identity.clone(), ttl);

    AppState {
        config,
        users,
        auth,
        identity: stores.identity,
        membership: stores.membership,
    }
}

#[async_trait]
pub trait StartupHooks: Send + Sync {
    async fn run(&self, state: &AppState) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct ProdStartupHooks;

#[async_trait]
impl StartupHooks for ProdStartupHooks {
    async fn run(&self, state: &AppState) -> Result<()> {
        tokio::fs::create_dir_all(&state.config().storage.photos_dir)
            .await
            .context("failed to create photo storage directory")?;

        if let Some((user_name, password)) = state.config().auth.bootstrap_credentials() {
            bootstrap_admin(state.identity(), user_name, password).await?;
        }
        Ok(())
    }
}

/// Create an admin account when no account holds the `Admin` role yet.
///
/// Returns whether an account was created or promoted.
pub async fn bootstrap_admin(
    identity: &dyn IdentityStore,
    user_name: &str,
    password: &str,
) -> Result<bool> {
    for role in [Role::Admin, Role::User] {
        if !identity.role_exists(role.as_str()).await? {
            identity.create_role(role.as_str()).await?;
        }
    }

    if identity.count_in_role(Role::Admin.as_str()).await? > 0 {
        return Ok(false);
    }

    let user_name = normalize_user_name(user_name);
    let account = match identity.find_by_name(&user_name).await? {
        Some(account) => account,
        None => {
            password::validate_password(password)
                .map_err(|reason| anyhow::anyhow!("bootstrap admin password rejected: {reason}"))?;
            let password_hash = password::hash_password(password)
                .map_err(|e| anyhow::anyhow!("failed to hash bootstrap password: {e}"))?;
            identity
                .create_account(NewAccount {
                    user_name: user_name.clone(),
                    email: user_name.clone(),
                    phone_number: None,
                    password_hash,
                })
                .await?
        }
    };

    identity.add_to_role(account.id, Role::Admin.as_str()).await?;
    identity.add_to_role(account.id, Role::User.as_str()).await?;
    info!(account_id = %account.id, user_name = %user_name, "bootstrap admin ensured");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bootstrap_creates_admin_once() {
        let identity = InMemoryIdentityStore::new();

        assert!(bootstrap_admin(&identity, "Root@Example.org", "changeme").await.unwrap());
        let account = identity.find_by_name("root@example.org").await.unwrap().unwrap();
        assert_eq!(identity.roles_for(account.id).await.unwrap(), ["Admin", "User"]);

        assert!(!bootstrap_admin(&identity, "other@example.org", "changeme").await.unwrap());
        assert!(identity.find_by_name("other@example.org").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bootstrap_rejects_short_password() {
        let identity = InMemoryIdentityStore::new();
        assert!(bootstrap_admin(&identity, "root@example.org", "x").await.is_err());
        assert_eq!(identity.count_in_role("Admin").await.unwrap(), 0);
    }
}
