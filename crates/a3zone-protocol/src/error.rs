//! Error types for the protocol layer.

/// Errors that can occur while turning frames into commands and back.
///
/// The dispatcher treats these differently: an [`UnknownCommand`] is
/// answered on the wire, while a [`Decode`] failure means the frame (or a
/// known command's payload) was garbage and is skipped without a reply.
///
/// [`UnknownCommand`]: ProtocolError::UnknownCommand
/// [`Decode`]: ProtocolError::Decode
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The frame or a command payload could not be deserialized.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The envelope named a command this server does not know.
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}
