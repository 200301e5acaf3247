use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::database::ports::identity::{IdentityError, IdentityStore};
use crate::domain::identity::{Account, NewAccount};

#[derive(Debug, Default)]
struct State {
    accounts: Vec<Account>,
    roles: HashSet<String>,
    account_roles: HashSet<(Uuid, String)>,
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
}

/// Identity store held in memory, used by tests and dev mode.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    state: RwLock<State>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_by_name(&self, user_name: &str) -> Result<Option<Account>, IdentityError> {
        Ok(self
            .state
            .read()
            .accounts
            .iter()
            .find(|a| a.user_name == user_name)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, IdentityError> {
        // accounts are kept in creation order
        Ok(self
            .state
            .read()
            .accounts
            .iter()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account, IdentityError> {
        let mut state = self.state.write();
        if state.accounts.iter().any(|a| a.user_name == account.user_name) {
            return Err(IdentityError::DuplicateUserName);
        }
        let account = account.into_account(Uuid::new_v4(), Utc::now());
        state.accounts.push(account.clone());
        Ok(account)
    }

    async fn delete_account(&self, account_id: Uuid) -> Result<(), IdentityError> {
        let mut state = self.state.write();
        let before = state.accounts.len();
        state.accounts.retain(|a| a.id != account_id);
        if state.accounts.len() == before {
            return Err(IdentityError::AccountNotFound);
        }
        state.account_roles.retain(|(id, _)| *id != account_id);
        state.sessions.retain(|_, (id, _)| *id != account_id);
        Ok(())
    }

    async fn role_exists(&self, role: &str) -> Result<bool, IdentityError> {
        Ok(self.state.read().roles.contains(role))
    }

    async fn create_role(&self, role: &str) -> Result<(), IdentityError> {
        self.state.write().roles.insert(role.to_string());
        Ok(())
    }

    async fn is_in_role(&self, account_id: Uuid, role: &str) -> Result<bool, IdentityError> {
        Ok(self
            .state
            .read()
            .account_roles
            .contains(&(account_id, role.to_string())))
    }

    async fn add_to_role(&self, account_id: Uuid, role: &str) -> Result<(), IdentityError> {
        let mut state = self.state.write();
        if !state.roles.contains(role) {
            return Err(IdentityError::RoleNotFound(role.to_string()));
        }
        if !state.accounts.iter().any(|a| a.id == account_id) {
            return Err(IdentityError::AccountNotFound);
        }
        state.account_roles.insert((account_id, role.to_string()));
        Ok(())
    }

    async fn remove_from_role(&self, account_id: Uuid, role: &str) -> Result<(), IdentityError> {
        self.state
            .write()
            .account_roles
            .remove(&(account_id, role.to_string()));
        Ok(())
    }

    async fn roles_for(&self, account_id: Uuid) -> Result<Vec<String>, IdentityError> {
        let state = self.state.read();
        let roles: BTreeSet<&String> = state
            .account_roles
            .iter()
            .filter(|(id, _)| *id == account_id)
            .map(|(_, role)| role)
            .collect();
        Ok(roles.into_iter().cloned().collect())
    }

    async fn count_in_role(&self, role: &str) -> Result<u64, IdentityError> {
        Ok(self
            .state
            .read()
            .account_roles
            .iter()
            .filter(|(_, r)| r == role)
            .count() as u64)
    }

    async fn create_session(
        &self,
        account_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), IdentityError> {
        self.state
            .write()
            .sessions
            .insert(token_hash.to_string(), (account_id, expires_at));
        Ok(())
    }

    async fn find_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, IdentityError> {
        let state = self.state.read();
        let Some((account_id, expires_at)) = state.sessions.get(token_hash) else {
            return Ok(None);
        };
        if *expires_at <= now {
            return Ok(None);
        }
        Ok(state.accounts.iter().find(|a| a.id == *account_id).cloned())
    }

    async fn revoke_session(&self, token_hash: &str) -> Result<bool, IdentityError> {
        Ok(self.state.write().sessions.remove(token_hash).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_account(user_name: &str) -> NewAccount {
        NewAccount {
            user_name: user_name.into(),
            email: user_name.into(),
            phone_number: None,
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn role_links_require_existing_role() {
        let store = InMemoryIdentityStore::new();
        let account = store.create_account(new_account("a@x.org")).await.unwrap();

        let err = store.add_to_role(account.id, "Admin").await.unwrap_err();
        assert!(matches!(err, IdentityError::RoleNotFound(_)));

        store.create_role("Admin").await.unwrap();
        store.create_role("Admin").await.unwrap();
        store.add_to_role(account.id, "Admin").await.unwrap();
        assert!(store.is_in_role(account.id, "Admin").await.unwrap());
        assert_eq!(store.count_in_role("Admin").await.unwrap(), 1);

        store.remove_from_role(account.id, "Admin").await.unwrap();
        assert!(!store.is_in_role(account.id, "Admin").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let store = InMemoryIdentityStore::new();
        store.create_account(new_account("a@x.org")).await.unwrap();
        assert!(matches!(
            store.create_account(new_account("a@x.org")).await,
            Err(IdentityError::DuplicateUserName)
        ));
    }

    #[tokio::test]
    async fn expired_sessions_do_not_resolve() {
        let store = InMemoryIdentityStore::new();
        let account = store.create_account(new_account("s@x.org")).await.unwrap();
        let now = Utc::now();
        store
            .create_session(account.id, "live", now + Duration::minutes(5))
            .await
            .unwrap();
        store
            .create_session(account.id, "stale", now - Duration::minutes(5))
            .await
            .unwrap();

        assert_eq!(
            store.find_session("live", now).await.unwrap().map(|a| a.id),
            Some(account.id)
        );
        assert!(store.find_session("stale", now).await.unwrap().is_none());
        assert!(store.revoke_session("live").await.unwrap());
        assert!(!store.revoke_session("live").await.unwrap());
    }

    #[tokio::test]
    async fn deleting_account_drops_roles_and_sessions() {
        let store = InMemoryIdentityStore::new();
        let account = store.create_account(new_account("d@x.org")).await.unwrap();
        store.create_role("User").await.unwrap();
        store.add_to_role(account.id, "User").await.unwrap();
        store
            .create_session(account.id, "t", Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        store.delete_account(account.id).await.unwrap();
        assert_eq!(store.count_in_role("User").await.unwrap(), 0);
        assert!(store.find_session("t", Utc::now()).await.unwrap().is_none());
        assert!(matches!(
            store.delete_account(account.id).await,
            Err(IdentityError::AccountNotFound)
        ));
    }
}
