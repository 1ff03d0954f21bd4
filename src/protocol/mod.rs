//! # Request/Response Protocol
//!
//! Messages, the server-side dispatcher and the operation table.
//!
//! ## Components
//! - **Message**: [`Value`](message::Value), [`Request`](message::Request), [`Response`](message::Response)
//! - **Dispatcher**: name-to-handler routing and the one-request-per-connection lifecycle
//! - **Operations**: the five directory/authentication operations and their argument schemas
//!
//! ## Lifecycle of a connection
//! ```text
//! Listening -> Connected -> RequestReceived -> Executing -> ResponseSent -> Closed
//! ```

pub mod dispatcher;
pub mod message;
pub mod operations;
