//! Error taxonomy for the session client.

use thiserror::Error;

/// The connection could not be established.
#[derive(Debug, Clone, Error)]
pub enum ConnectError {
    #[error("invalid coordinator address `{address}`: {detail}")]
    InvalidAddress { address: String, detail: String },
    #[error("coordinator at `{address}` is unreachable: {detail}")]
    Unreachable { address: String, detail: String },
    #[error("coordinator at `{address}` refused the handshake: {detail}")]
    Refused { address: String, detail: String },
}

/// An established connection failed, or a frame on it could not be decoded.
///
/// Every variant except [`TransportError::Decode`] ends the connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The coordinator completed a close handshake.
    #[error("connection closed by coordinator (code {code:?}, reason {reason:?})")]
    ClosedCleanly { code: Option<u16>, reason: String },
    /// The link dropped without a close handshake.
    #[error("connection lost: {detail}")]
    ClosedAbnormally { detail: String },
    /// This side closed the connection, possibly from another task.
    #[error("connection closed locally")]
    ClosedLocally,
    #[error("write failed: {detail}")]
    Write { detail: String },
    /// A frame arrived that is not an envelope.
    #[error("undecodable frame: {detail}")]
    Decode { detail: String },
}

impl TransportError {
    /// True when the connection cannot carry further traffic.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransportError::Decode { .. })
    }

    pub fn is_clean_close(&self) -> bool {
        matches!(
            self,
            TransportError::ClosedCleanly { .. } | TransportError::ClosedLocally
        )
    }
}

/// Failure of a [`crate::SessionClient`] operation.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Connection(#[from] ConnectError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The client was closed; it cannot be reused.
    #[error("session client is closed")]
    ConnectionClosed,
    #[error("session client is not connected")]
    NotConnected,
    #[error("session client is already connected")]
    AlreadyConnected,
    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
}

impl SessionError {
    /// The transport failure behind this error, if any.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            SessionError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;
