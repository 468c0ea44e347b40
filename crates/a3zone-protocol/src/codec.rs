//! Codec trait and the JSON implementation used on the wire.
//!
//! A "codec" converts between Rust types and raw frame bytes. The
//! transport hands over whole frames (one line of text), so the codec
//! never deals with framing, only with the bytes of a single message.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes Rust values to frame bytes and decodes them back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into one frame.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes one frame.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that speaks JSON via `serde_json`.
///
/// ```rust
/// use a3zone_protocol::{Codec, Envelope, JsonCodec};
///
/// let codec = JsonCodec;
/// let env: Envelope = codec
///     .decode(br#"{"command":"move","payload":{"x":1,"y":0,"z":2}}"#)
///     .unwrap();
/// assert_eq!(env.command, "move");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
