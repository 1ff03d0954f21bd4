//! User directory service: account creation, lookup and password checks.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::directory::model::{Credentials, Token, User};
use crate::directory::store::DirectoryStore;
use crate::error::constants::{
    ERR_ADMIN_REQUIRED, ERR_AUTH_REQUIRED, ERR_PASSWORD_REQUIRED, ERR_USERNAME_REQUIRED,
};
use crate::error::{Result, RpcError};
use crate::utils::time::now_millis;

pub struct UserDirectory {
    store: Arc<DirectoryStore>,
}

impl UserDirectory {
    pub fn new(store: Arc<DirectoryStore>) -> Self {
        Self { store }
    }

    /// Register a new account. Needs no authentication.
    #[instrument(skip(self, user), fields(username = %user.username))]
    pub fn add_user(&self, user: User) -> Result<()> {
        if user.username.trim().is_empty() {
            return Err(RpcError::InvalidArgument(ERR_USERNAME_REQUIRED.to_string()));
        }
        if user.password.as_deref().map_or(true, str::is_empty) {
            return Err(RpcError::InvalidArgument(ERR_PASSWORD_REQUIRED.to_string()));
        }

        let role = user.role;
        self.store.insert_user(user)?;
        info!(%role, "User added");
        Ok(())
    }

    /// Fetch an account, password stripped.
    ///
    /// Administrators may read any account; everybody else only their own.
    /// The authorization decision is taken before the lookup, so a
    /// non-admin learns nothing about accounts other than their own.
    #[instrument(skip(self, token))]
    pub fn get_user(&self, id: &str, token: Option<&Token>) -> Result<User> {
        let token =
            token.ok_or_else(|| RpcError::AuthenticationRequired(ERR_AUTH_REQUIRED.to_string()))?;

        let caller = self
            .store
            .resolve_token(token, now_millis()?)?
            .ok_or_else(|| {
                RpcError::AuthenticationRequired(format!(
                    "{ERR_AUTH_REQUIRED}: token is expired or was not issued here"
                ))
            })?;

        if !caller.is_admin() && !caller.has_id(id) {
            warn!(caller = %caller.username, "Non-admin asked for another account");
            return Err(RpcError::AuthorizationDenied(ERR_ADMIN_REQUIRED.to_string()));
        }

        self.store
            .find_user(id)?
            .map(|user| user.without_password())
            .ok_or_else(|| RpcError::UserNotFound(id.to_string()))
    }

    /// True iff an account matches `credentials.id` and the password agrees.
    ///
    /// An unknown id answers `false` exactly like a wrong password.
    pub fn check_password(&self, credentials: &Credentials) -> Result<bool> {
        Ok(self
            .store
            .find_user(&credentials.id)?
            .is_some_and(|user| user.password.as_deref() == Some(credentials.password.as_str())))
    }
}
