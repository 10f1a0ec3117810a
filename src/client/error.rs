// ABOUTME: Session-level error taxonomy for the client engine
// ABOUTME: Distinguishes transport, framing, protocol and configuration failures

use crate::codec::CodecError;
use crate::datatypes::CommandStatus;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the session engine.
///
/// Transport and framing errors are fatal to the current session and feed
/// the reconnect path; a rejected bind is fatal with no automatic retry;
/// per-message failures (unencodable text, hook errors) never surface
/// here, they are logged and the session continues.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Connection refused, reset, timed out, or a short read or write.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// A frame arrived that cannot be parsed; the stream is no longer
    /// trustworthy.
    #[error("framing error: {0}")]
    Framing(#[from] CodecError),

    /// The SMSC answered bind_transceiver with a non-zero status.
    #[error("bind rejected by SMSC: {0}")]
    BindRejected(CommandStatus),

    /// A response arrived that the current phase cannot accept.
    #[error("unexpected PDU: expected {expected}, got {actual}")]
    UnexpectedPdu {
        expected: &'static str,
        actual: String,
    },

    /// The peer closed the connection.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// No response within the bound, including missed enquire_link pongs.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The broker failed; without a source of work the session cannot run.
    #[error("broker error: {0}")]
    Broker(#[source] crate::Error),

    /// The client configuration is unusable.
    #[error("invalid client configuration: {0}")]
    Config(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

impl SessionError {
    /// Whether a lost session may be transparently re-established.
    /// Configuration problems and bind rejections are permanent.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SessionError::Transport(_)
            | SessionError::Framing(_)
            | SessionError::ConnectionClosed
            | SessionError::Timeout(_)
            | SessionError::UnexpectedPdu { .. } => true,
            SessionError::BindRejected(_) | SessionError::Broker(_) | SessionError::Config(_) => {
                false
            }
        }
    }
}
