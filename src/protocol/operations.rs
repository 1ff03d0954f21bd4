//! # Operation Table
//!
//! The fixed set of operations exposed over RPC and the argument schema of
//! each. Every handler checks arity and argument types before it touches a
//! service, so a request with the right name but the wrong shape fails with
//! `ProtocolError` instead of reaching the directory.
//!
//! | Operation        | Arguments                          | Token    | Result        |
//! |------------------|------------------------------------|----------|---------------|
//! | `add_user`       | `User`                             | -        | null          |
//! | `get_user`       | id (`string`)                      | metadata | `User`        |
//! | `check_password` | `Credentials`                      | -        | `bool`        |
//! | `authenticate`   | `Credentials`, `duration` or null  | -        | `Token`       |
//! | `validate_token` | `Token`                            | -        | `bool`        |

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::directory::model::{Credentials, Token, User};
use crate::directory::ServiceRegistry;
use crate::error::{Result, RpcError};
use crate::protocol::dispatcher::Dispatcher;
use crate::protocol::message::Value;

pub const ADD_USER: &str = "add_user";
pub const GET_USER: &str = "get_user";
pub const CHECK_PASSWORD: &str = "check_password";
pub const AUTHENTICATE: &str = "authenticate";
pub const VALIDATE_TOKEN: &str = "validate_token";

/// Every operation name served by [`register_all`]
pub const ALL: [&str; 5] = [ADD_USER, GET_USER, CHECK_PASSWORD, AUTHENTICATE, VALIDATE_TOKEN];

/// Register the directory and authentication operations on `dispatcher`
pub fn register_all(dispatcher: &Dispatcher, registry: Arc<ServiceRegistry>) -> Result<()> {
    let services = Arc::clone(&registry);
    dispatcher.register(ADD_USER, move |request| {
        let mut args = Args::new(ADD_USER, request.args, 1, 1)?;
        let user: User = args.required()?;
        services.users.add_user(user)?;
        Ok(Value::Null)
    })?;

    let services = Arc::clone(&registry);
    dispatcher.register(GET_USER, move |request| {
        let mut args = Args::new(GET_USER, request.args, 1, 1)?;
        let id: String = args.required()?;
        services
            .users
            .get_user(&id, request.metadata.as_ref())
            .map(Value::from)
    })?;

    let services = Arc::clone(&registry);
    dispatcher.register(CHECK_PASSWORD, move |request| {
        let mut args = Args::new(CHECK_PASSWORD, request.args, 1, 1)?;
        let credentials: Credentials = args.required()?;
        services.users.check_password(&credentials).map(Value::from)
    })?;

    let services = Arc::clone(&registry);
    dispatcher.register(AUTHENTICATE, move |request| {
        let mut args = Args::new(AUTHENTICATE, request.args, 1, 2)?;
        let credentials: Credentials = args.required()?;
        let duration: Option<Duration> = args.optional()?;
        services
            .auth
            .authenticate(&credentials, duration)
            .map(Value::from)
    })?;

    let services = registry;
    dispatcher.register(VALIDATE_TOKEN, move |request| {
        let mut args = Args::new(VALIDATE_TOKEN, request.args, 1, 1)?;
        let token: Token = args.required()?;
        Ok(Value::from(services.auth.validate_token(&token)))
    })?;

    Ok(())
}

/// Positional arguments checked against an operation's schema
struct Args {
    operation: &'static str,
    values: VecDeque<Value>,
    position: usize,
}

impl Args {
    fn new(operation: &'static str, values: Vec<Value>, min: usize, max: usize) -> Result<Self> {
        if values.len() < min || values.len() > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{min} to {max}")
            };
            return Err(RpcError::Protocol(format!(
                "Invalid arguments for {operation}: expected {expected}, got {}",
                values.len()
            )));
        }

        Ok(Self {
            operation,
            values: values.into(),
            position: 0,
        })
    }

    fn required<T>(&mut self) -> Result<T>
    where
        T: TryFrom<Value, Error = RpcError>,
    {
        let value = self.values.pop_front().ok_or_else(|| {
            RpcError::Protocol(format!(
                "Invalid arguments for {}: missing argument {}",
                self.operation, self.position
            ))
        })?;
        self.convert(value)
    }

    /// Absent trailing arguments and explicit nulls both read as `None`
    fn optional<T>(&mut self) -> Result<Option<T>>
    where
        T: TryFrom<Value, Error = RpcError>,
    {
        match self.values.pop_front() {
            None | Some(Value::Null) => {
                self.position += 1;
                Ok(None)
            }
            Some(value) => self.convert(value).map(Some),
        }
    }

    fn convert<T>(&mut self, value: Value) -> Result<T>
    where
        T: TryFrom<Value, Error = RpcError>,
    {
        let position = self.position;
        self.position += 1;
        T::try_from(value).map_err(|e| {
            RpcError::Protocol(format!(
                "Invalid arguments for {}: argument {position}: {e}",
                self.operation
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_is_enforced() {
        let err = Args::new(GET_USER, vec![], 1, 1).err().expect("too few");
        assert!(err.to_string().contains("expected 1, got 0"));

        let err = Args::new(AUTHENTICATE, vec![Value::Null; 3], 1, 2)
            .err()
            .expect("too many");
        assert!(err.to_string().contains("expected 1 to 2, got 3"));
    }

    #[test]
    fn type_mismatch_names_position() {
        let mut args = Args::new(GET_USER, vec![Value::Int(4)], 1, 1).expect("arity ok");
        let err = args.required::<String>().expect_err("wrong type");
        assert!(matches!(err, RpcError::Protocol(_)));
        assert!(err.to_string().contains("argument 0"));
    }

    #[test]
    fn null_and_missing_optionals_are_none() {
        let mut args = Args::new(AUTHENTICATE, vec![Value::Null], 1, 2).expect("arity ok");
        assert_eq!(args.optional::<Duration>().expect("null"), None);
        assert_eq!(args.optional::<Duration>().expect("missing"), None);
    }
}
