use crate::protocol::{MessageType, SubscribeStatus, UnsubscribeStatus};
use crate::session::SessionState;
use std::time::Duration;
use thiserror::Error;

/// Failures of the underlying validator connection.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("invalid endpoint '{0}': expected tcp://host:port or host:port")]
    InvalidEndpoint(String),

    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out connecting to {0}")]
    ConnectTimeout(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed by peer")]
    Closed,

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] prost::DecodeError),

    #[error("failed to encode outbound frame: {0}")]
    Encode(#[from] prost::EncodeError),
}

/// Everything that can end a subscription session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to encode {what}: {source}")]
    Encoding {
        what: &'static str,
        #[source]
        source: prost::EncodeError,
    },

    #[error("failed to decode {what}: {source}")]
    Decoding {
        what: &'static str,
        #[source]
        source: prost::DecodeError,
    },

    #[error("validator rejected the subscription with status {status:?} ({code}): '{message}'")]
    Protocol {
        status: SubscribeStatus,
        /// The status value as sent. Values this client does not know decode
        /// to `StatusUnset` in `status` but are kept here.
        code: i32,
        message: String,
    },

    #[error("unexpected message type {actual} while waiting for {expected:?}")]
    UnexpectedMessage { expected: MessageType, actual: i32 },

    #[error("no {what} within {timeout:?}")]
    Timeout {
        what: &'static str,
        timeout: Duration,
    },

    #[error("unsubscribe failed: {0}")]
    Unsubscribe(#[from] UnsubscribeError),

    #[error("cannot {operation} while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
}

/// Failures of the teardown handshake. The connection is closed regardless.
#[derive(Error, Debug)]
pub enum UnsubscribeError {
    #[error("validator answered with status {0:?}")]
    Rejected(UnsubscribeStatus),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to encode request: {0}")]
    Encoding(#[from] prost::EncodeError),

    #[error("failed to decode response: {0}")]
    Decoding(#[from] prost::DecodeError),

    #[error("unexpected reply of message type {0}")]
    UnexpectedReply(i32),

    #[error("no response within {0:?}")]
    Timeout(Duration),
}
