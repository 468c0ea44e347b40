//! Unified error type for the zone server.

use a3zone_protocol::ProtocolError;
use a3zone_session::{SessionError, TokenError};
use a3zone_store::StoreError;
use a3zone_transport::TransportError;

use crate::config::ConfigError;

/// Top-level error that wraps every layer's error type.
///
/// Rule and social rejections (`Rejection`, `SocialError`, `WorldError`)
/// are not here: those are answered on the wire with their reason code
/// and never end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ZoneError {
    /// Binding, accepting, or a socket read/write failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session's outbound queue closed, or auth throttling.
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
