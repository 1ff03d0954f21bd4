//! # Transport Layer
//!
//! The connection primitive the protocol is built on: reliable, ordered,
//! message-framed delivery over TCP.
//!
//! ## Contract used by the core
//! - `connect(address)` opens a connection
//! - `send` writes exactly one framed message
//! - `receive` yields the next message, or `None` when the peer closed
//! - `close` flushes and shuts the write half down
//!
//! The server side accepts connections in a loop and hands each one to
//! its own task; see [`tcp::start_server_with_shutdown`].

pub mod tcp;
