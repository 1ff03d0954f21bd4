use std::borrow::Cow;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{debug, error, instrument, warn};

use crate::core::serialization::{decode_with_format, encode_with, SerializationFormat};
use crate::directory::ServiceRegistry;
use crate::error::constants::ERR_NOT_A_REQUEST;
use crate::error::{ErrorKind, Result, RpcError};
use crate::protocol::message::{Request, Response, Value};
use crate::protocol::operations;
use crate::transport::tcp::Connection;
use crate::utils::metrics::Metrics;
use crate::utils::timeout::with_optional_timeout;

type HandlerFn = dyn Fn(Request) -> Result<Value> + Send + Sync + 'static;

/// Per-connection lifecycle. A connection walks it once and never restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Listening,
    Connected,
    RequestReceived,
    Executing,
    ResponseSent,
    Closed,
}

/// Routes a named operation to its handler.
///
/// The table maps names to handlers registered up front; a request can only
/// reach what was registered under its exact name.
pub struct Dispatcher {
    handlers: Arc<RwLock<HashMap<Cow<'static, str>, Box<HandlerFn>>>>,
    metrics: Arc<Metrics>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Dispatcher with the directory and authentication operations registered
    pub fn for_registry(registry: Arc<ServiceRegistry>) -> Result<Self> {
        let dispatcher = Self::new();
        operations::register_all(&dispatcher, registry)?;
        Ok(dispatcher)
    }

    pub fn register<F>(&self, name: impl Into<Cow<'static, str>>, handler: F) -> Result<()>
    where
        F: Fn(Request) -> Result<Value> + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write()?;
        handlers.insert(name.into(), Box::new(handler));
        Ok(())
    }

    /// Names of every registered operation, sorted
    pub fn operations(&self) -> Result<Vec<String>> {
        let handlers = self.handlers.read()?;
        let mut names: Vec<String> = handlers.keys().map(|k| k.to_string()).collect();
        names.sort();
        Ok(names)
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Run one request through its handler and capture the outcome.
    ///
    /// Handler errors and panics both become a failed [`Response`]; nothing
    /// but the error kind and its text leaves this function.
    pub fn dispatch(&self, request: Request) -> Response {
        let name = request.name.clone();
        self.metrics.request_received();

        let outcome = match self.handlers.read() {
            Ok(handlers) => match handlers.get(name.as_str()) {
                Some(handler) => catch_unwind(AssertUnwindSafe(|| handler(request)))
                    .unwrap_or_else(|_| {
                        error!(operation = %name, "Handler panicked");
                        Err(RpcError::Protocol(format!("Operation {name} aborted")))
                    }),
                None => Err(RpcError::OperationNotFound(name.clone())),
            },
            Err(_) => Err(RpcError::LockPoisoned),
        };

        if let Err(e) = &outcome {
            debug!(operation = %name, kind = %e.kind(), error = %e, "Operation failed");
            self.metrics.request_failed();
        }
        if name == operations::AUTHENTICATE {
            self.metrics.authentication(outcome.is_ok());
        }

        Response::from(outcome)
    }

    /// Decode raw request bytes, dispatch, and report the format to answer in.
    ///
    /// Undecodable input and non-request values fail with `ProtocolError`.
    pub fn handle_bytes(&self, bytes: &[u8]) -> (Response, SerializationFormat) {
        match decode_with_format(bytes) {
            Ok((Value::Request(request), format)) => {
                debug!(operation = %request.name, args = request.args.len(), "Unmarshalled request");
                (self.dispatch(*request), format)
            }
            Ok((other, format)) => {
                self.metrics.protocol_error();
                let err = RpcError::Protocol(format!("{ERR_NOT_A_REQUEST}: got {}", other.type_name()));
                (Response::failure(&err), format)
            }
            Err(e) => {
                self.metrics.protocol_error();
                let err = RpcError::Protocol(format!("Cannot decode request: {e}"));
                (Response::failure(&err), SerializationFormat::default())
            }
        }
    }

    /// Serve exactly one request on `conn`, reply once, then close it.
    ///
    /// Framing errors are answered with a `ProtocolError` response before
    /// closing; transport errors are logged and the connection dropped.
    #[instrument(skip(self, conn), fields(peer = %conn.peer_addr()))]
    pub async fn serve_connection(
        &self,
        mut conn: Connection,
        request_timeout: Option<Duration>,
    ) -> ConnectionState {
        let mut state = ConnectionState::Listening;
        transition(&mut state, ConnectionState::Connected);

        let received = with_optional_timeout(request_timeout, conn.receive()).await;
        let (response, format) = match received {
            Ok(Some(bytes)) => {
                transition(&mut state, ConnectionState::RequestReceived);
                self.metrics.message_received(bytes.len() as u64);
                transition(&mut state, ConnectionState::Executing);
                self.handle_bytes(&bytes)
            }
            Ok(None) => {
                debug!("Peer closed before sending a request");
                transition(&mut state, ConnectionState::Closed);
                return state;
            }
            Err(e) if e.kind() == ErrorKind::ProtocolError => {
                warn!(error = %e, "Rejecting unframed input");
                self.metrics.protocol_error();
                transition(&mut state, ConnectionState::RequestReceived);
                (Response::failure(&e), SerializationFormat::default())
            }
            Err(e) => {
                error!(error = %e, "Connection error, discarding");
                self.metrics.connection_error();
                transition(&mut state, ConnectionState::Closed);
                return state;
            }
        };

        match encode_with(&Value::from(response), format) {
            Ok(bytes) => {
                let len = bytes.len() as u64;
                match conn.send(bytes).await {
                    Ok(()) => {
                        self.metrics.message_sent(len);
                        transition(&mut state, ConnectionState::ResponseSent);
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to send response");
                        self.metrics.connection_error();
                    }
                }
            }
            Err(e) => error!(error = %e, "Failed to marshal response"),
        }

        if let Err(e) = conn.close().await {
            debug!(error = %e, "Error while closing connection");
        }
        transition(&mut state, ConnectionState::Closed);
        state
    }
}

fn transition(state: &mut ConnectionState, next: ConnectionState) {
    debug!(from = ?state, to = ?next, "Connection state");
    *state = next;
}
