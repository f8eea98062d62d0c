//! Decode failures for inbound frames.

use thiserror::Error;

/// A well-formed envelope the client cannot act on.
///
/// Violations are never fatal: the receiving side logs and skips the envelope,
/// since the wire format carries no version.
#[derive(Debug, Error)]
pub enum ProtocolViolation {
    #[error("unknown envelope type `{kind}`")]
    UnknownType { kind: String },
    #[error("payload does not match envelope type `{kind}`: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Why an inbound frame could not be turned into a [`crate::ServerEnvelope`].
#[derive(Debug, Error)]
pub enum ParseError {
    /// Not an envelope at all: bad JSON, or no string `type` field.
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error(transparent)]
    Violation(#[from] ProtocolViolation),
}
