//! # Directory Store
//!
//! The only shared mutable state on the server: accounts and the tokens
//! issued for them. Both services hold an `Arc<DirectoryStore>`; every read
//! and write goes through the methods below, which take the lock for the
//! shortest possible span.
//!
//! ## Thread-safety
//! - Reads (`find_user`, `resolve_token`) share a read lock
//! - Writes (`insert_user`, `record_token`, `purge_expired_tokens`) take the write lock
//! - A poisoned lock surfaces as [`RpcError::LockPoisoned`]

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::{debug, trace};

use crate::directory::model::{Token, User};
use crate::error::{Result, RpcError};

/// Server-side record of an issued token
#[derive(Debug, Clone)]
struct IssuedToken {
    owner: String,
    expires_at_ms: Option<u64>,
}

impl IssuedToken {
    fn is_expired_at(&self, now_ms: u64) -> bool {
        self.expires_at_ms.is_some_and(|deadline| now_ms >= deadline)
    }
}

#[derive(Default)]
struct StoreInner {
    /// username -> account
    users: HashMap<String, User>,
    /// username or e-mail -> username
    aliases: HashMap<String, String>,
    /// token id -> issued token
    tokens: HashMap<String, IssuedToken>,
}

/// Lock-guarded account and token registry
#[derive(Default)]
pub struct DirectoryStore {
    inner: RwLock<StoreInner>,
}

impl DirectoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account. Fails if the username or any e-mail is already taken.
    pub fn insert_user(&self, user: User) -> Result<()> {
        let mut inner = self.inner.write()?;

        if let Some(taken) = user.ids().find(|id| inner.aliases.contains_key(*id)) {
            return Err(RpcError::DuplicateUser(taken.to_string()));
        }

        for id in user.ids() {
            inner.aliases.insert(id.to_string(), user.username.clone());
        }
        debug!(username = %user.username, role = %user.role, "Account stored");
        inner.users.insert(user.username.clone(), user);
        Ok(())
    }

    /// Look up an account by username or e-mail
    pub fn find_user(&self, id: &str) -> Result<Option<User>> {
        let inner = self.inner.read()?;
        Ok(inner
            .aliases
            .get(id)
            .and_then(|username| inner.users.get(username))
            .cloned())
    }

    pub fn user_count(&self) -> Result<usize> {
        Ok(self.inner.read()?.users.len())
    }

    /// Remember an issued token so it can be validated later
    pub fn record_token(&self, token: &Token, now_ms: u64) -> Result<()> {
        let mut inner = self.inner.write()?;
        evict_expired(&mut inner, now_ms);
        inner.tokens.insert(
            token.id.clone(),
            IssuedToken {
                owner: token.user.clone(),
                expires_at_ms: token.expires_at_ms(),
            },
        );
        Ok(())
    }

    /// Owner of `token` if it was issued here, is bound to the same user,
    /// has not expired and the owner still exists.
    pub fn resolve_token(&self, token: &Token, now_ms: u64) -> Result<Option<User>> {
        let inner = self.inner.read()?;

        let Some(issued) = inner.tokens.get(&token.id) else {
            trace!(user = %token.user, "Token unknown to this directory");
            return Ok(None);
        };

        if issued.owner != token.user || issued.is_expired_at(now_ms) || token.is_expired_at(now_ms)
        {
            return Ok(None);
        }

        Ok(inner.users.get(&issued.owner).cloned())
    }

    /// Drop every token whose lifetime has elapsed, returning how many went
    pub fn purge_expired_tokens(&self, now_ms: u64) -> Result<usize> {
        let mut inner = self.inner.write()?;
        Ok(evict_expired(&mut inner, now_ms))
    }
}

fn evict_expired(inner: &mut StoreInner, now_ms: u64) -> usize {
    let before = inner.tokens.len();
    inner.tokens.retain(|_, issued| !issued.is_expired_at(now_ms));
    let evicted = before - inner.tokens.len();
    if evicted > 0 {
        debug!(evicted, "Evicted expired tokens");
    }
    evicted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::model::Role;
    use std::time::Duration;

    fn alice() -> User {
        User::new("alice", "Alice", Role::User, "pw").with_email("alice@example.org")
    }

    fn token_for(user: &str, issued_at_ms: u64, ttl: Option<Duration>) -> Token {
        Token {
            id: format!("{user}-{issued_at_ms}"),
            user: user.to_string(),
            issued_at_ms,
            expiration: ttl,
        }
    }

    #[test]
    fn email_collision_is_a_duplicate() {
        let store = DirectoryStore::new();
        store.insert_user(alice()).expect("first insert");

        let other = User::new("alice2", "Other", Role::User, "pw").with_email("alice@example.org");
        match store.insert_user(other) {
            Err(RpcError::DuplicateUser(id)) => assert_eq!(id, "alice@example.org"),
            other => panic!("expected duplicate, got {other:?}"),
        }
        assert_eq!(store.user_count().expect("count"), 1);
    }

    #[test]
    fn lookup_by_email() {
        let store = DirectoryStore::new();
        store.insert_user(alice()).expect("insert");
        let found = store.find_user("alice@example.org").expect("lookup");
        assert_eq!(found.map(|u| u.username), Some("alice".to_string()));
    }

    #[test]
    fn forged_token_does_not_resolve() {
        let store = DirectoryStore::new();
        store.insert_user(alice()).expect("insert");
        let issued = token_for("alice", 0, None);
        store.record_token(&issued, 0).expect("record");

        let forged = Token {
            user: "bob".into(),
            ..issued.clone()
        };
        assert!(store.resolve_token(&forged, 1).expect("resolve").is_none());
        assert!(store.resolve_token(&issued, 1).expect("resolve").is_some());
    }

    #[test]
    fn purge_removes_only_expired() {
        let store = DirectoryStore::new();
        store.insert_user(alice()).expect("insert");
        let short = token_for("alice", 0, Some(Duration::from_millis(10)));
        let long = token_for("alice", 5, None);
        store.record_token(&short, 0).expect("record");
        store.record_token(&long, 0).expect("record");

        assert_eq!(store.purge_expired_tokens(100).expect("purge"), 1);
        assert!(store.resolve_token(&long, 100).expect("resolve").is_some());
    }

    #[test]
    fn huge_lifetime_token_survives_purge() {
        let store = DirectoryStore::new();
        store.insert_user(alice()).expect("insert");
        let forever = token_for("alice", 1_000, Some(Duration::from_secs(u64::MAX / 1000 + 1)));
        store.record_token(&forever, 1_000).expect("record");

        assert_eq!(store.purge_expired_tokens(2_000).expect("purge"), 0);
        assert!(store.resolve_token(&forever, 2_000).expect("resolve").is_some());
    }
}
