//! Authentication service: token issuance and validation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::directory::model::{Credentials, Token};
use crate::directory::store::DirectoryStore;
use crate::error::{Result, RpcError};
use crate::utils::time::now_millis;

pub struct AuthenticationService {
    store: Arc<DirectoryStore>,
    default_ttl: Option<Duration>,
}

impl AuthenticationService {
    pub fn new(store: Arc<DirectoryStore>, default_ttl: Option<Duration>) -> Self {
        Self { store, default_ttl }
    }

    /// Issue a token for the account matching `credentials`.
    ///
    /// `duration` overrides the configured lifetime for this one token.
    /// Unknown ids and wrong passwords both fail with `InvalidCredentials`,
    /// with a message telling them apart.
    #[instrument(skip(self, credentials), fields(id = %credentials.id))]
    pub fn authenticate(&self, credentials: &Credentials, duration: Option<Duration>) -> Result<Token> {
        let user = self
            .store
            .find_user(&credentials.id)?
            .ok_or_else(|| {
                RpcError::InvalidCredentials(format!("User with ID {} not found", credentials.id))
            })?;

        if user.password.as_deref() != Some(credentials.password.as_str()) {
            warn!("Wrong password");
            return Err(RpcError::InvalidCredentials(format!(
                "Wrong password for user {}",
                credentials.id
            )));
        }

        let now = now_millis()?;
        let token = Token {
            id: format!("{:032x}", rand::random::<u128>()),
            user: user.username,
            issued_at_ms: now,
            expiration: duration.or(self.default_ttl),
        };
        self.store.record_token(&token, now)?;

        info!(user = %token.user, expires_at_ms = ?token.expires_at_ms(), "Token issued");
        Ok(token)
    }

    /// False for expired, unknown or tampered tokens. Never fails.
    pub fn validate_token(&self, token: &Token) -> bool {
        let now = match now_millis() {
            Ok(now) => now,
            Err(e) => {
                warn!(error = %e, "Cannot read clock, treating token as invalid");
                return false;
            }
        };

        match self.store.resolve_token(token, now) {
            Ok(owner) => owner.is_some(),
            Err(e) => {
                warn!(error = %e, "Token lookup failed, treating token as invalid");
                false
            }
        }
    }
}
