//! Records held by the directory and exchanged with clients.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

/// Access level of an account, fixed when the account is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("ADMIN"),
            Role::User => f.write_str("USER"),
        }
    }
}

/// A directory account.
///
/// The password is only populated on the way in (`add_user`); records handed
/// back by `get_user` have it stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub emails: BTreeSet<String>,
    pub full_name: String,
    pub role: Role,
    pub password: Option<String>,
}

impl User {
    pub fn new(
        username: impl Into<String>,
        full_name: impl Into<String>,
        role: Role,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            emails: BTreeSet::new(),
            full_name: full_name.into(),
            role,
            password: Some(password.into()),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.emails.insert(email.into());
        self
    }

    /// Username followed by every registered e-mail
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.username.as_str()).chain(self.emails.iter().map(String::as_str))
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.ids().any(|known| known == id)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Copy of this record without the password
    pub fn without_password(&self) -> Self {
        Self {
            password: None,
            ..self.clone()
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let emails: Vec<&str> = self.emails.iter().map(String::as_str).collect();
        write!(
            f,
            "User(username={}, emails=[{}], full_name={}, role={})",
            self.username,
            emails.join(", "),
            self.full_name,
            self.role
        )
    }
}

/// An authentication attempt. `id` may be a username or any registered e-mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub id: String,
    pub password: String,
}

impl Credentials {
    pub fn new(id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            password: password.into(),
        }
    }
}

/// Proof of a successful `authenticate` call, bound to one user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    /// Random identifier recorded by the issuing service
    pub id: String,
    /// Username of the owner
    pub user: String,
    /// Issue time, milliseconds since the Unix epoch
    pub issued_at_ms: u64,
    /// Lifetime; `None` never expires
    pub expiration: Option<Duration>,
}

impl Token {
    /// Expiry instant in epoch milliseconds, if the token expires at all.
    /// Lifetimes past the end of the `u64` millisecond range clamp to `u64::MAX`.
    pub fn expires_at_ms(&self) -> Option<u64> {
        self.expiration.map(|ttl| {
            let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
            self.issued_at_ms.saturating_add(ttl_ms)
        })
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        self.expires_at_ms().is_some_and(|deadline| now_ms >= deadline)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expiration {
            Some(ttl) => write!(
                f,
                "Token(user={}, issued_at_ms={}, expires_in={}s)",
                self.user,
                self.issued_at_ms,
                ttl.as_secs()
            ),
            None => write!(
                f,
                "Token(user={}, issued_at_ms={}, never expires)",
                self.user, self.issued_at_ms
            ),
        }
    }
}
