//! # Core Protocol Components
//!
//! Low-level packet handling, framing and the self-describing value encoding.
//!
//! ## Components
//! - **Packet**: Binary packet format with magic bytes and a length prefix
//! - **Codec**: Tokio codec for framing over byte streams
//! - **Serialization**: Format-tagged encoding of [`Value`](crate::protocol::message::Value)
//!
//! ## Wire Format
//! ```text
//! [Magic(4)] [Version(1)] [Length(4)] [Payload(N)]
//! Payload: [Format(1)] [Encoded value]
//! ```
//!
//! ## Limits
//! - Maximum packet size: 16MB by default (prevents memory exhaustion)
//! - Length validation before allocation

pub mod codec;
pub mod packet;
pub mod serialization;
