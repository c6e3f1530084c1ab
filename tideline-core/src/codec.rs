//! Pluggable message serialization for tideline.
//!
//! The [`MessageCodec`] trait allows conduit implementations to bring their
//! own serialization format (JSON, bincode, protobuf, messagepack, etc.)
//! while tideline provides a default [`JsonCodec`] for debugging and getting
//! started quickly.
//!
//! The pipelining cores themselves never encode or decode: they hand typed
//! messages to the conduit and receive typed messages back. The codec lives
//! at the conduit boundary, which is also why [`MessageCodec::reset`] exists:
//! stateful framing codecs must discard partial state when a connection is
//! re-established.
//!
//! # Example
//!
//! ```rust
//! use tideline_core::{MessageCodec, JsonCodec};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct MyMessage {
//!     id: u32,
//!     content: String,
//! }
//!
//! let mut codec = JsonCodec;
//! let msg = MyMessage { id: 42, content: "hello".to_string() };
//!
//! let bytes = codec.encode(&msg).expect("encode");
//! let decoded: MyMessage = codec.decode(&bytes).expect("decode");
//! assert_eq!(msg, decoded);
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Error type for codec operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Failed to encode a message to bytes.
    #[error("encode error: {0}")]
    Encode(Box<dyn std::error::Error + Send + Sync>),

    /// Failed to decode bytes to a message.
    #[error("decode error: {0}")]
    Decode(Box<dyn std::error::Error + Send + Sync>),
}

/// Pluggable message serialization format.
///
/// Implement this trait to use custom serialization formats (bincode,
/// protobuf, etc.). Methods take `&mut self` so codecs may keep framing
/// state across calls; stateless codecs simply ignore it.
///
/// # Serde Dependency
///
/// This trait uses serde's `Serialize` and `DeserializeOwned` bounds, which
/// means your message types must derive or implement serde traits.
pub trait MessageCodec: 'static {
    /// Encode a serializable message to bytes.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Encode` if serialization fails.
    fn encode<T: Serialize>(&mut self, msg: &T) -> Result<Vec<u8>, CodecError>;

    /// Decode bytes to a deserializable message.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Decode` if deserialization fails.
    fn decode<T: DeserializeOwned>(&mut self, buf: &[u8]) -> Result<T, CodecError>;

    /// Discard any accumulated framing state.
    ///
    /// Called when the underlying connection is (re-)established so a codec
    /// never tries to resume a frame that straddled the old connection.
    fn reset(&mut self) {}
}

/// JSON codec using serde_json.
///
/// This is the default codec provided by tideline. It's great for debugging
/// (human-readable output) but not the most efficient for production use.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl MessageCodec for JsonCodec {
    fn encode<T: Serialize>(&mut self, msg: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(msg).map_err(|e| CodecError::Encode(Box::new(e)))
    }

    fn decode<T: DeserializeOwned>(&mut self, buf: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(buf).map_err(|e| CodecError::Decode(Box::new(e)))
    }
}
