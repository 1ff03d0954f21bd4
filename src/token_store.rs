//! Token files.
//!
//! A token is stored as the plain JSON rendering of its [`Value`], without
//! the wire format tag, so any JSON tool can read the file.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::serialization::{MultiFormat, SerializationFormat};
use crate::directory::model::Token;
use crate::error::Result;
use crate::protocol::message::Value;

/// Conventional location of the token file for `user_id` inside `dir`
pub fn token_path(dir: impl AsRef<Path>, user_id: &str) -> PathBuf {
    dir.as_ref().join(format!("{user_id}.json"))
}

/// Write `token` to `path`, creating parent directories as needed
pub fn save_token(path: impl AsRef<Path>, token: &Token) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let bytes = Value::from(token.clone()).serialize_format(SerializationFormat::Json)?;
    std::fs::write(path, bytes)?;
    debug!(path = %path.display(), user = %token.user, "Token saved");
    Ok(())
}

/// Read a token previously written by [`save_token`]
pub fn load_token(path: impl AsRef<Path>) -> Result<Token> {
    let bytes = std::fs::read(path.as_ref())?;
    Token::try_from(Value::deserialize_format(&bytes, SerializationFormat::Json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcError;
    use std::time::Duration;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("auth-rpc-{name}-{}", std::process::id()))
    }

    #[test]
    fn save_then_load() {
        let dir = scratch_dir("tokens");
        let path = token_path(&dir, "alice");
        let token = Token {
            id: "00ff".into(),
            user: "alice".into(),
            issued_at_ms: 1_700_000_000_000,
            expiration: Some(Duration::from_secs(3600)),
        };

        save_token(&path, &token).expect("save");
        assert_eq!(load_token(&path).expect("load"), token);

        let bytes = std::fs::read(&path).expect("read");
        let json: serde_json::Value = serde_json::from_slice(&bytes).expect("plain JSON file");
        assert_eq!(json["Token"]["user"], "alice");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = scratch_dir("missing").join("nobody.json");
        assert!(matches!(load_token(path), Err(RpcError::Io(_))));
    }

    #[test]
    fn non_token_file_is_rejected() {
        let dir = scratch_dir("not-a-token");
        std::fs::create_dir_all(&dir).expect("mkdir");
        let path = dir.join("x.json");
        let bytes = Value::from("hello")
            .serialize_format(SerializationFormat::Json)
            .expect("encode");
        std::fs::write(&path, bytes).expect("write");
        assert!(matches!(load_token(&path), Err(RpcError::UnsupportedType(_))));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn garbage_file_is_malformed() {
        let dir = scratch_dir("garbage");
        std::fs::create_dir_all(&dir).expect("mkdir");
        let path = dir.join("x.json");
        std::fs::write(&path, b"\x02{not json").expect("write");
        assert!(matches!(load_token(&path), Err(RpcError::MalformedMessage(_))));
        let _ = std::fs::remove_dir_all(dir);
    }
}
