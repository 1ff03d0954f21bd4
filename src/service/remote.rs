//! Typed client-side views of the two services.

use std::time::Duration;

use crate::directory::model::{Credentials, Token, User};
use crate::error::Result;
use crate::protocol::message::Value;
use crate::protocol::operations::{
    ADD_USER, AUTHENTICATE, CHECK_PASSWORD, GET_USER, VALIDATE_TOKEN,
};
use crate::service::stub::ClientStub;

/// Remote user directory
#[derive(Clone)]
pub struct RemoteUserDirectory {
    stub: ClientStub,
}

impl RemoteUserDirectory {
    pub fn new(stub: ClientStub) -> Self {
        Self { stub }
    }

    pub fn connect(address: impl Into<String>) -> Self {
        Self::new(ClientStub::new(address))
    }

    pub async fn add_user(&self, user: &User) -> Result<()> {
        let result = self.stub.rpc(ADD_USER, vec![user.clone().into()], None).await?;
        <()>::try_from(result)
    }

    pub async fn get_user(&self, id: &str, token: Option<&Token>) -> Result<User> {
        let result = self
            .stub
            .rpc(GET_USER, vec![id.into()], token.cloned())
            .await?;
        User::try_from(result)
    }

    pub async fn check_password(&self, credentials: &Credentials) -> Result<bool> {
        let result = self
            .stub
            .rpc(CHECK_PASSWORD, vec![credentials.clone().into()], None)
            .await?;
        bool::try_from(result)
    }
}

/// Remote authentication service
#[derive(Clone)]
pub struct RemoteAuthenticationService {
    stub: ClientStub,
}

impl RemoteAuthenticationService {
    pub fn new(stub: ClientStub) -> Self {
        Self { stub }
    }

    pub fn connect(address: impl Into<String>) -> Self {
        Self::new(ClientStub::new(address))
    }

    pub async fn authenticate(
        &self,
        credentials: &Credentials,
        duration: Option<Duration>,
    ) -> Result<Token> {
        let args = vec![credentials.clone().into(), Value::from(duration)];
        let result = self.stub.rpc(AUTHENTICATE, args, None).await?;
        Token::try_from(result)
    }

    pub async fn validate_token(&self, token: &Token) -> Result<bool> {
        let result = self
            .stub
            .rpc(VALIDATE_TOKEN, vec![token.clone().into()], None)
            .await?;
        bool::try_from(result)
    }

    /// Token from the most recent successful `authenticate`
    pub fn cached_token(&self) -> Option<Token> {
        self.stub.cached_token()
    }
}
