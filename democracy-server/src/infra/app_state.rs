use std::{fmt, sync::Arc};

use democracy_core::{
    UserAdminService,
    database::{IdentityStore, MembershipRepository},
};

use crate::infra::config::Config;
use crate::users::auth::AuthService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: UserAdminService,
    pub auth: AuthService,
    pub identity: Arc<dyn IdentityStore>,
    pub membership: Arc<dyn MembershipRepository>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn users(&self) -> &UserAdminService {
        &self.users
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn identity(&self) -> &dyn IdentityStore {
        self.identity.as_ref()
    }

    pub fn membership(&self) -> &dyn MembershipRepository {
        self.membership.as_ref()
    }
}
