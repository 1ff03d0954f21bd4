use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::config::{ClientConfig, TransportConfig};
use crate::core::codec::PacketCodec;
use crate::core::serialization::{decode, encode_with, SerializationFormat};
use crate::directory::model::Token;
use crate::error::constants::ERR_CONNECTION_CLOSED;
use crate::error::{Result, RpcError};
use crate::protocol::message::{Request, Response, Value};
use crate::protocol::operations::AUTHENTICATE;
use crate::transport::tcp::{connect, Connection};
use crate::utils::timeout::with_optional_timeout;

/// Client half of the protocol: one connection, one request, one response per call.
///
/// Cloning is cheap; clones share the cached token.
#[derive(Clone)]
pub struct ClientStub {
    address: String,
    format: SerializationFormat,
    codec: PacketCodec,
    connect_timeout: Option<Duration>,
    response_timeout: Option<Duration>,
    token: Arc<Mutex<Option<Token>>>,
}

impl ClientStub {
    pub fn new(address: impl Into<String>) -> Self {
        Self::from_config(
            &ClientConfig {
                address: address.into(),
                ..ClientConfig::default()
            },
            &TransportConfig::default(),
        )
    }

    pub fn from_config(client: &ClientConfig, transport: &TransportConfig) -> Self {
        Self {
            address: client.address.clone(),
            format: transport.format,
            codec: PacketCodec::new(transport.max_payload_size),
            connect_timeout: client.connect_timeout,
            response_timeout: client.response_timeout,
            token: Arc::new(Mutex::new(None)),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Token returned by the last successful `authenticate` through this stub
    pub fn cached_token(&self) -> Option<Token> {
        match self.token.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        }
    }

    /// Invoke `name` remotely.
    ///
    /// A remote failure comes back as [`RpcError::RemoteOperationFailed`]
    /// carrying the server's error kind and text. A connection that closes
    /// or breaks before the response arrives yields [`RpcError::NoResponse`].
    /// Nothing is retried.
    #[instrument(skip(self, args, metadata), fields(server = %self.address))]
    pub async fn rpc(&self, name: &str, args: Vec<Value>, metadata: Option<Token>) -> Result<Value> {
        let mut conn = with_optional_timeout(
            self.connect_timeout,
            connect(&self.address, self.codec),
        )
        .await?;

        let request = Request::new(name, args).with_metadata(metadata);
        let outcome = self.exchange(&mut conn, request).await;

        if let Err(e) = conn.close().await {
            debug!(error = %e, "Error while closing connection");
        }

        let value = outcome?;
        if name == AUTHENTICATE {
            if let Value::Token(token) = &value {
                self.cache_token(token.clone());
            }
        }
        Ok(value)
    }

    async fn exchange(&self, conn: &mut Connection, request: Request) -> Result<Value> {
        debug!(operation = %request.name, args = request.args.len(), "Marshalling request");
        let bytes = encode_with(&Value::from(request), self.format)?;
        conn.send(bytes)
            .await
            .map_err(|e| RpcError::NoResponse(e.to_string()))?;

        let payload = match with_optional_timeout(self.response_timeout, conn.receive()).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return Err(RpcError::NoResponse(ERR_CONNECTION_CLOSED.to_string())),
            Err(RpcError::Timeout) => return Err(RpcError::Timeout),
            Err(e) => return Err(RpcError::NoResponse(e.to_string())),
        };

        let response = Response::try_from(decode(&payload)?).map_err(|e| {
            RpcError::Protocol(format!("Server did not answer with a response: {e}"))
        })?;
        debug!(ok = response.is_ok(), "Unmarshalled response");
        response.into_result()
    }

    fn cache_token(&self, token: Token) {
        match self.token.lock() {
            Ok(mut guard) => *guard = Some(token),
            Err(_) => warn!("Token cache poisoned, not caching"),
        }
    }
}
