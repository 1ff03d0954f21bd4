use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::config::{MAGIC_BYTES, MAX_PAYLOAD_SIZE};
use crate::core::packet::{parse_header, Packet, HEADER_SIZE};
use crate::error::constants::ERR_TRUNCATED_FRAME;
use crate::error::{Result, RpcError};

/// Length-prefixed packet framing for `tokio_util::codec::Framed`.
#[derive(Debug, Clone, Copy)]
pub struct PacketCodec {
    max_payload: usize,
}

impl PacketCodec {
    pub fn new(max_payload: usize) -> Self {
        Self { max_payload }
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new(MAX_PAYLOAD_SIZE)
    }
}

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = RpcError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>> {
        let Some((version, len)) = parse_header(&src[..], self.max_payload)? else {
            return Ok(None);
        };

        let total = HEADER_SIZE + len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let payload = src.split_to(len).to_vec();
        Ok(Some(Packet { version, payload }))
    }

    /// Leftover bytes when the peer closes are a broken frame, never a silent EOF.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Packet>> {
        match self.decode(src)? {
            Some(packet) => Ok(Some(packet)),
            None if src.is_empty() => Ok(None),
            None if src.len() < HEADER_SIZE => Err(RpcError::InvalidHeader),
            None => Err(RpcError::Protocol(format!(
                "{ERR_TRUNCATED_FRAME} ({} bytes buffered)",
                src.len()
            ))),
        }
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = RpcError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<()> {
        if item.payload.len() > self.max_payload {
            return Err(RpcError::OversizedPacket(item.payload.len()));
        }

        dst.reserve(HEADER_SIZE + item.payload.len());
        dst.put_slice(&MAGIC_BYTES);
        dst.put_u8(item.version);
        dst.put_u32(item.payload.len() as u32);
        dst.put_slice(&item.payload);
        Ok(())
    }
}
