use std::{fmt, sync::Arc};

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use democracy_core::{
    Account, Role,
    database::{IdentityError, IdentityStore},
    domain::{
        identity::{SessionToken, hash_session_token, password::verify_password},
        users::normalize_user_name,
    },
};

/// Caller resolved from a bearer token, stored as a request extension.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedAccount {
    pub account: Account,
    pub roles: Vec<String>,
}

impl AuthenticatedAccount {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.iter().any(|r| r == role.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid user name or password")]
    InvalidCredentials,

    #[error("Session is invalid or expired")]
    InvalidSession,

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Password login and opaque session tokens on top of the identity store.
#[derive(Clone)]
pub struct AuthService {
    identity: Arc<dyn IdentityStore>,
    session_ttl: Duration,
}

impl fmt::Debug for AuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService")
            .field("session_ttl", &self.session_ttl)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    pub fn new(identity: Arc<dyn IdentityStore>, session_ttl: Duration) -> Self {
        Self {
            identity,
            session_ttl,
        }
    }

    pub async fn login(
        &self,
        user_name: &str,
        password: &str,
    ) -> Result<(SessionToken, AuthenticatedAccount), AuthError> {
        let user_name = normalize_user_name(user_name);
        let Some(account) = self.identity.find_by_name(&user_name).await? else {
            warn!(user_name = %user_name, "login for unknown account");
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(password, &account.password_hash) {
            warn!(account_id = %account.id, "login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = SessionToken::generate(self.session_ttl);
        self.identity
            .create_session(account.id, &token.digest(), token.expires_at)
            .await?;
        let roles = self.identity.roles_for(account.id).await?;

        info!(account_id = %account.id, "session issued");
        Ok((token, AuthenticatedAccount { account, roles }))
    }

    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedAccount, AuthError> {
        let account = self
            .identity
            .find_session(&hash_session_token(token), Utc::now())
            .await?
            .ok_or(AuthError::InvalidSession)?;
        let roles = self.identity.roles_for(account.id).await?;
        Ok(AuthenticatedAccount { account, roles })
    }

    /// Revoke a session; returns whether it existed.
    pub async fn logout(&self, token: &str) -> Result<bool, AuthError> {
        let revoked = self
            .identity
            .revoke_session(&hash_session_token(token))
            .await?;
        if revoked {
            info!("session revoked");
        }
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use democracy_core::database::InMemoryIdentityStore;
    use democracy_core::domain::identity::{NewAccount, password::hash_password};

    async fn service_with_account(ttl: Duration) -> AuthService {
        let identity = Arc::new(InMemoryIdentityStore::new());
        let account = identity
            .create_account(NewAccount {
                user_name: "clerk@example.org".into(),
                email: "clerk@example.org".into(),
                phone_number: None,
                password_hash: hash_password("letmein1").unwrap(),
            })
            .await
            .unwrap();
        identity.create_role("User").await.unwrap();
        identity.add_to_role(account.id, "User").await.unwrap();
        AuthService::new(identity, ttl)
    }

    #[tokio::test]
    async fn login_issues_token_that_authenticates() {
        let auth = service_with_account(Duration::hours(1)).await;
        let (token, caller) = auth.login(" CLERK@example.org", "letmein1").await.unwrap();
        assert!(caller.has_role(Role::User));
        assert!(!caller.has_role(Role::Admin));

        let resolved = auth.authenticate(&token.token).await.unwrap();
        assert_eq!(resolved.account.id, caller.account.id);

        assert!(auth.logout(&token.token).await.unwrap());
        assert!(matches!(
            auth.authenticate(&token.token).await,
            Err(AuthError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let auth = service_with_account(Duration::hours(1)).await;
        let wrong = auth.login("clerk@example.org", "nope").await.unwrap_err();
        let unknown = auth.login("ghost@example.org", "letmein1").await.unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn expired_sessions_are_rejected() {
        let auth = service_with_account(Duration::seconds(-1)).await;
        let (token, _) = auth.login("clerk@example.org", "letmein1").await.unwrap();
        assert!(matches!(
            auth.authenticate(&token.token).await,
            Err(AuthError::InvalidSession)
        ));
    }
}
