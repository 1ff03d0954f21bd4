//! # auth-rpc
//!
//! Remote invocation of a user directory and an authentication service.
//!
//! A client holds nothing but an optional token. Each call opens a
//! connection, sends one [`Request`](protocol::message::Request), waits for
//! one [`Response`](protocol::message::Response) and closes. The server
//! decodes the request, routes it through a fixed operation table to the
//! directory or the authentication service, and replies with the result or
//! an error kind plus text.
//!
//! ## Layers
//! - [`core`]: packet framing and the self-describing value encoding
//! - [`protocol`]: messages, dispatcher, operation table
//! - [`directory`]: accounts, tokens and the two services
//! - [`transport`]: TCP connections and the accept loop
//! - [`service`]: client stubs
//! - [`config`], [`error`], [`utils`], [`token_store`]: ambient support
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use auth_rpc::config::RpcConfig;
//! use auth_rpc::directory::ServiceRegistry;
//! use auth_rpc::protocol::dispatcher::Dispatcher;
//! use auth_rpc::transport::tcp::start_server;
//!
//! # async fn run() -> auth_rpc::error::Result<()> {
//! let config = RpcConfig::default();
//! let registry = Arc::new(ServiceRegistry::new(&config.auth)?);
//! let dispatcher = Arc::new(Dispatcher::for_registry(registry)?);
//! start_server(&config, dispatcher).await
//! # }
//! ```

pub mod config;
pub mod core;
pub mod directory;
pub mod error;
pub mod protocol;
pub mod service;
pub mod token_store;
pub mod transport;
pub mod utils;

pub use crate::core::packet::Packet;
pub use crate::error::{ErrorKind, Result, RpcError};
