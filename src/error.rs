//! # Error Types
//!
//! Error handling for the RPC core.
//!
//! Every failure a caller can observe is a variant of [`RpcError`], from
//! socket errors up to authorization decisions taken by the directory.
//!
//! ## Error Categories
//! - **I/O and framing**: socket failures, bad packet headers, oversized frames
//! - **Codec**: `MalformedMessage`, `UnsupportedType`
//! - **Dispatch**: `ProtocolError`, `OperationNotFound`
//! - **Service**: `InvalidCredentials`, `AuthenticationRequired`,
//!   `AuthorizationDenied`, `DuplicateUser`, `UserNotFound`
//! - **Client**: `NoResponse`, `Timeout`, `RemoteOperationFailed`
//!
//! Errors never cross the wire as values. The server reduces them to an
//! [`ErrorKind`] tag plus the display text, and the client rebuilds a
//! [`RpcError::RemoteOperationFailed`] from that pair.
//!
//! ## Example Usage
//! ```rust
//! use auth_rpc::error::{ErrorKind, RpcError};
//!
//! let err = RpcError::DuplicateUser("alice".into());
//! assert_eq!(err.kind(), ErrorKind::DuplicateUser);
//! assert_eq!(err.kind().to_string(), "DuplicateUser");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Dispatcher-related error messages
    pub const ERR_NOT_A_REQUEST: &str = "Decoded message is not a request";

    /// Codec errors
    pub const ERR_EMPTY_MESSAGE: &str = "Empty message";
    pub const ERR_NESTING_TOO_DEEP: &str = "Value nested too deeply";
    pub const ERR_TRUNCATED_FRAME: &str = "Connection closed mid-frame";

    /// Connection errors
    pub const ERR_CONNECTION_CLOSED: &str = "Connection closed without data";

    /// Directory errors
    pub const ERR_AUTH_REQUIRED: &str = "You must authenticate first";
    pub const ERR_ADMIN_REQUIRED: &str = "Only administrators may read other users";
    pub const ERR_PASSWORD_REQUIRED: &str = "Password is required";
    pub const ERR_USERNAME_REQUIRED: &str = "Username is required";

    /// Clock errors
    pub const ERR_SYSTEM_TIME: &str = "System time error: time went backwards";
}

/// RpcError is the primary error type for all operations in this crate
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid protocol header")]
    InvalidHeader,

    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Operation not found: {0}")]
    OperationNotFound(String),

    #[error("{0}")]
    InvalidCredentials(String),

    #[error("{0}")]
    AuthenticationRequired(String),

    #[error("{0}")]
    AuthorizationDenied(String),

    #[error("User with ID {0} already exists")]
    DuplicateUser(String),

    #[error("User with ID {0} not found")]
    UserNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No response received: {0}")]
    NoResponse(String),

    #[error("Timeout occurred")]
    Timeout,

    #[error("{message}")]
    RemoteOperationFailed { kind: ErrorKind, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Synchronization primitive poisoned")]
    LockPoisoned,
}

impl RpcError {
    /// The wire-level tag for this error.
    ///
    /// Remote failures keep the tag reported by the server, so a client sees
    /// `DuplicateUser` rather than a generic remote error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RpcError::Io(_) => ErrorKind::Io,
            RpcError::InvalidHeader
            | RpcError::UnsupportedVersion(_)
            | RpcError::OversizedPacket(_)
            | RpcError::Protocol(_) => ErrorKind::ProtocolError,
            RpcError::MalformedMessage(_) => ErrorKind::MalformedMessage,
            RpcError::UnsupportedType(_) => ErrorKind::UnsupportedType,
            RpcError::OperationNotFound(_) => ErrorKind::OperationNotFound,
            RpcError::InvalidCredentials(_) => ErrorKind::InvalidCredentials,
            RpcError::AuthenticationRequired(_) => ErrorKind::AuthenticationRequired,
            RpcError::AuthorizationDenied(_) => ErrorKind::AuthorizationDenied,
            RpcError::DuplicateUser(_) => ErrorKind::DuplicateUser,
            RpcError::UserNotFound(_) => ErrorKind::UserNotFound,
            RpcError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            RpcError::NoResponse(_) => ErrorKind::NoResponse,
            RpcError::Timeout => ErrorKind::Timeout,
            RpcError::RemoteOperationFailed { kind, .. } => *kind,
            RpcError::Config(_) => ErrorKind::Config,
            RpcError::LockPoisoned => ErrorKind::Internal,
        }
    }

    /// True when the error was produced by the remote side of a call.
    pub fn is_remote(&self) -> bool {
        matches!(self, RpcError::RemoteOperationFailed { .. })
    }
}

impl<T> From<std::sync::PoisonError<T>> for RpcError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        RpcError::LockPoisoned
    }
}

/// Serializable error tag carried inside a failed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Io,
    MalformedMessage,
    UnsupportedType,
    ProtocolError,
    OperationNotFound,
    InvalidCredentials,
    AuthenticationRequired,
    AuthorizationDenied,
    DuplicateUser,
    UserNotFound,
    InvalidArgument,
    NoResponse,
    Timeout,
    Config,
    Internal,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Io => "Io",
            ErrorKind::MalformedMessage => "MalformedMessage",
            ErrorKind::UnsupportedType => "UnsupportedType",
            ErrorKind::ProtocolError => "ProtocolError",
            ErrorKind::OperationNotFound => "OperationNotFound",
            ErrorKind::InvalidCredentials => "InvalidCredentials",
            ErrorKind::AuthenticationRequired => "AuthenticationRequired",
            ErrorKind::AuthorizationDenied => "AuthorizationDenied",
            ErrorKind::DuplicateUser => "DuplicateUser",
            ErrorKind::UserNotFound => "UserNotFound",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::NoResponse => "NoResponse",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Config => "Config",
            ErrorKind::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type alias for Results using RpcError
pub type Result<T> = std::result::Result<T, RpcError>;
