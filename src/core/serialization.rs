//! # Serialization Formats
//!
//! Encoding of protocol values into byte blobs and back.
//!
//! Every blob starts with a one-byte format tag followed by the encoded
//! [`Value`]. The value enum carries its own variant tag, so the decoder
//! needs no schema: one [`decode`] call yields a request, a response, a
//! token or a plain string alike.
//!
//! ## Formats
//! - **Bincode** (`0x01`, default): compact binary
//! - **JSON** (`0x02`): human-readable, used for token files and debugging
//!
//! ## Usage
//! ```rust
//! use auth_rpc::core::serialization::{decode, encode};
//! use auth_rpc::protocol::message::Value;
//!
//! let bytes = encode(&Value::from("hello")).unwrap();
//! assert_eq!(decode(&bytes).unwrap(), Value::from("hello"));
//! ```

use serde::{Deserialize, Serialize};

use crate::error::constants::ERR_EMPTY_MESSAGE;
use crate::error::{Result, RpcError};
use crate::protocol::message::Value;

/// Supported serialization formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializationFormat {
    /// Binary compact format (default, fastest)
    #[default]
    Bincode,
    /// Human-readable JSON format (debugging, token files)
    Json,
}

impl SerializationFormat {
    /// Get the format identifier byte for wire protocol
    pub fn format_byte(self) -> u8 {
        match self {
            SerializationFormat::Bincode => 0x01,
            SerializationFormat::Json => 0x02,
        }
    }

    /// Detect format from identifier byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(SerializationFormat::Bincode),
            0x02 => Some(SerializationFormat::Json),
            _ => None,
        }
    }

    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            SerializationFormat::Bincode => "Bincode",
            SerializationFormat::Json => "JSON",
        }
    }
}

/// Trait for types that support multiple serialization formats
pub trait MultiFormat: Serialize + for<'de> Deserialize<'de> + Sized {
    /// Serialize to bytes using the specified format
    fn serialize_format(&self, format: SerializationFormat) -> Result<Vec<u8>> {
        match format {
            SerializationFormat::Bincode => {
                bincode::serialize(self).map_err(|e| RpcError::UnsupportedType(e.to_string()))
            }
            SerializationFormat::Json => {
                serde_json::to_vec(self).map_err(|e| RpcError::UnsupportedType(e.to_string()))
            }
        }
    }

    /// Serialize to bytes with format header
    fn serialize_with_header(&self, format: SerializationFormat) -> Result<Vec<u8>> {
        let mut data = vec![format.format_byte()];
        let mut payload = self.serialize_format(format)?;
        data.append(&mut payload);
        Ok(data)
    }

    /// Deserialize from bytes using the specified format
    fn deserialize_format(data: &[u8], format: SerializationFormat) -> Result<Self> {
        match format {
            SerializationFormat::Bincode => {
                bincode::deserialize(data).map_err(|e| RpcError::MalformedMessage(e.to_string()))
            }
            SerializationFormat::Json => serde_json::from_slice(data)
                .map_err(|e| RpcError::MalformedMessage(e.to_string())),
        }
    }

    /// Deserialize from bytes with format header
    fn deserialize_with_header(data: &[u8]) -> Result<(Self, SerializationFormat)> {
        let (&tag, body) = data
            .split_first()
            .ok_or_else(|| RpcError::MalformedMessage(ERR_EMPTY_MESSAGE.to_string()))?;

        let format = SerializationFormat::from_byte(tag)
            .ok_or_else(|| RpcError::MalformedMessage(format!("Unknown format byte: {tag}")))?;

        let value = Self::deserialize_format(body, format)?;
        Ok((value, format))
    }
}

/// Encode a value with the default format
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    encode_with(value, SerializationFormat::default())
}

/// Encode a value with an explicit format
pub fn encode_with(value: &Value, format: SerializationFormat) -> Result<Vec<u8>> {
    value.serialize_with_header(format)
}

/// Decode any value, whatever format produced it
pub fn decode(data: &[u8]) -> Result<Value> {
    decode_with_format(data).map(|(value, _)| value)
}

/// Decode a value and report the format it was written in
pub fn decode_with_format(data: &[u8]) -> Result<(Value, SerializationFormat)> {
    Value::deserialize_with_header(data)
}
