//! Packet layout shared by the codec and by callers working on raw buffers.

use crate::config::{MAGIC_BYTES, MAX_PAYLOAD_SIZE, PROTOCOL_VERSION};
use crate::error::{Result, RpcError};

/// Magic(4) + Version(1) + Length(4)
pub const HEADER_SIZE: usize = 9;

/// One framed message on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub version: u8,
    pub payload: Vec<u8>,
}

impl Packet {
    /// Wrap a payload in a packet for the current protocol version
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            payload,
        }
    }

    /// Serialize header and payload into a single buffer
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        buf.extend_from_slice(&MAGIC_BYTES);
        buf.push(self.version);
        buf.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Parse a complete packet from `data`, using the default size limit
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_limit(data, MAX_PAYLOAD_SIZE)
    }

    /// Parse a complete packet from `data`, rejecting payloads above `max_payload`
    pub fn from_bytes_with_limit(data: &[u8], max_payload: usize) -> Result<Self> {
        let (version, len) = parse_header(data, max_payload)?.ok_or(RpcError::InvalidHeader)?;

        let end = HEADER_SIZE + len;
        if data.len() < end {
            return Err(RpcError::InvalidHeader);
        }

        Ok(Self {
            version,
            payload: data[HEADER_SIZE..end].to_vec(),
        })
    }
}

/// Validate a packet header and return `(version, payload_len)`.
///
/// Returns `Ok(None)` while fewer than [`HEADER_SIZE`] bytes are available.
pub(crate) fn parse_header(data: &[u8], max_payload: usize) -> Result<Option<(u8, usize)>> {
    if data.len() < HEADER_SIZE {
        return Ok(None);
    }

    if data[..4] != MAGIC_BYTES {
        return Err(RpcError::InvalidHeader);
    }

    let version = data[4];
    if version != PROTOCOL_VERSION {
        return Err(RpcError::UnsupportedVersion(version));
    }

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&data[5..HEADER_SIZE]);
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > max_payload {
        return Err(RpcError::OversizedPacket(len));
    }

    Ok(Some((version, len)))
}
