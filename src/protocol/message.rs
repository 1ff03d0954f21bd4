//! # Protocol Messages
//!
//! [`Value`] is everything that can travel on the wire. Each variant names
//! its own logical type, which is what makes a blob self-describing: the
//! decoder turns bytes into a `Value` and the caller matches on it.
//!
//! Typed domain records convert into `Value` with `From` and back with
//! `TryFrom`; asking for the wrong type yields `UnsupportedType`.
//!
//! Decoding refuses values nested deeper than [`MAX_NESTING_DEPTH`] lists,
//! requests or responses.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::serialization::MultiFormat;
use crate::directory::model::{Credentials, Token, User};
use crate::error::{ErrorKind, Result, RpcError};

/// Deepest chain of nested containers a decoded value may hold
pub const MAX_NESTING_DEPTH: usize = 64;

/// Self-describing wire value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
    Duration(Duration),
    List(#[serde(deserialize_with = "nesting::nested")] Vec<Value>),
    User(User),
    Credentials(Credentials),
    Token(Token),
    Request(#[serde(deserialize_with = "nesting::nested")] Box<Request>),
    Response(#[serde(deserialize_with = "nesting::nested")] Box<Response>),
}

/// Depth accounting for the recursive variants of [`Value`].
///
/// Decoding is synchronous, so a per-thread counter tracks how many
/// containers the current decode is inside.
mod nesting {
    use std::cell::Cell;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    use super::MAX_NESTING_DEPTH;
    use crate::error::constants::ERR_NESTING_TOO_DEEP;

    thread_local! {
        static DEPTH: Cell<usize> = const { Cell::new(0) };
    }

    struct DepthGuard;

    impl DepthGuard {
        fn enter() -> Option<Self> {
            DEPTH.with(|depth| {
                let current = depth.get();
                if current >= MAX_NESTING_DEPTH {
                    None
                } else {
                    depth.set(current + 1);
                    Some(DepthGuard)
                }
            })
        }
    }

    impl Drop for DepthGuard {
        fn drop(&mut self) {
            DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
        }
    }

    pub(super) fn nested<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        let _guard = DepthGuard::enter().ok_or_else(|| {
            D::Error::custom(format!("{ERR_NESTING_TOO_DEEP} (limit {MAX_NESTING_DEPTH})"))
        })?;
        T::deserialize(deserializer)
    }
}

impl MultiFormat for Value {}

impl Value {
    /// Name of the logical type carried by this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Duration(_) => "duration",
            Value::List(_) => "list",
            Value::User(_) => "User",
            Value::Credentials(_) => "Credentials",
            Value::Token(_) => "Token",
            Value::Request(_) => "Request",
            Value::Response(_) => "Response",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// One remote call: operation name, positional arguments and an optional token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub name: String,
    pub args: Vec<Value>,
    pub metadata: Option<Token>,
}

impl Request {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, token: Option<Token>) -> Self {
        self.metadata = token;
        self
    }
}

/// Error tag and text describing a failed call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFailure {
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of one remote call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Ok(Value),
    Err(RemoteFailure),
}

impl Response {
    /// Reduce a local error to its kind and text
    pub fn failure(err: &RpcError) -> Self {
        Response::Err(RemoteFailure {
            kind: err.kind(),
            message: err.to_string(),
        })
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Ok(_))
    }

    /// Turn the response into a local result on the client side
    pub fn into_result(self) -> Result<Value> {
        match self {
            Response::Ok(value) => Ok(value),
            Response::Err(RemoteFailure { kind, message }) => {
                Err(RpcError::RemoteOperationFailed { kind, message })
            }
        }
    }
}

impl From<Result<Value>> for Response {
    fn from(result: Result<Value>) -> Self {
        match result {
            Ok(value) => Response::Ok(value),
            Err(err) => Response::failure(&err),
        }
    }
}

fn unexpected(expected: &str, found: &Value) -> RpcError {
    RpcError::UnsupportedType(format!("expected {expected}, found {}", found.type_name()))
}

macro_rules! value_conversions {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(inner: $ty) -> Self {
                    Value::$variant(inner)
                }
            }

            impl TryFrom<Value> for $ty {
                type Error = RpcError;

                fn try_from(value: Value) -> Result<Self> {
                    match value {
                        Value::$variant(inner) => Ok(inner),
                        other => Err(unexpected(stringify!($variant), &other)),
                    }
                }
            }
        )*
    };
}

value_conversions! {
    Bool => bool,
    Int => i64,
    Str => String,
    Bytes => Vec<u8>,
    Duration => Duration,
    List => Vec<Value>,
    User => User,
    Credentials => Credentials,
    Token => Token,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl From<Request> for Value {
    fn from(request: Request) -> Self {
        Value::Request(Box::new(request))
    }
}

impl From<Response> for Value {
    fn from(response: Response) -> Self {
        Value::Response(Box::new(response))
    }
}

impl TryFrom<Value> for Request {
    type Error = RpcError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Request(request) => Ok(*request),
            other => Err(unexpected("Request", &other)),
        }
    }
}

impl TryFrom<Value> for Response {
    type Error = RpcError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Response(response) => Ok(*response),
            other => Err(unexpected("Response", &other)),
        }
    }
}

impl TryFrom<Value> for () {
    type Error = RpcError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(()),
            other => Err(unexpected("null", &other)),
        }
    }
}
