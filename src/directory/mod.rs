//! # Directory Services
//!
//! The two server-side services reachable over RPC and the state they share.
//!
//! ## Components
//! - **UserDirectory**: `add_user`, `get_user`, `check_password`
//! - **AuthenticationService**: `authenticate`, `validate_token`
//! - **DirectoryStore**: lock-guarded accounts and issued tokens
//!
//! [`ServiceRegistry`] owns one store and both services built on it; the
//! dispatcher receives it behind an `Arc` and every connection handler
//! reaches the store only through the service methods.

pub mod auth;
pub mod model;
pub mod store;
pub mod users;

use std::sync::Arc;

use tracing::info;

use crate::config::{AuthConfig, BootstrapAdmin};
use crate::error::Result;

pub use auth::AuthenticationService;
pub use model::{Credentials, Role, Token, User};
pub use store::DirectoryStore;
pub use users::UserDirectory;

/// Both services plus the store they share
pub struct ServiceRegistry {
    pub users: UserDirectory,
    pub auth: AuthenticationService,
    store: Arc<DirectoryStore>,
}

impl ServiceRegistry {
    /// Build the registry and seed the bootstrap administrator, if configured
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let store = Arc::new(DirectoryStore::new());
        let registry = Self {
            users: UserDirectory::new(Arc::clone(&store)),
            auth: AuthenticationService::new(Arc::clone(&store), config.token_ttl),
            store,
        };

        if let Some(admin) = &config.bootstrap_admin {
            registry.users.add_user(admin_account(admin))?;
            info!(username = %admin.username, "Bootstrap administrator created");
        }

        Ok(registry)
    }

    /// Empty registry with default token lifetime
    pub fn in_memory() -> Self {
        let store = Arc::new(DirectoryStore::new());
        Self {
            users: UserDirectory::new(Arc::clone(&store)),
            auth: AuthenticationService::new(Arc::clone(&store), AuthConfig::default().token_ttl),
            store,
        }
    }

    pub fn store(&self) -> &Arc<DirectoryStore> {
        &self.store
    }
}

fn admin_account(admin: &BootstrapAdmin) -> User {
    let full_name = if admin.full_name.is_empty() {
        admin.username.clone()
    } else {
        admin.full_name.clone()
    };
    User {
        username: admin.username.clone(),
        emails: admin.emails.iter().cloned().collect(),
        full_name,
        role: Role::Admin,
        password: Some(admin.password.clone()),
    }
}
