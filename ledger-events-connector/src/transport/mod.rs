//! # Validator Connection
//!
//! The [`Connection`] trait is the only thing the session needs from a transport:
//! send a typed payload and learn its correlation id, receive the next inbound
//! frame, receive the reply to a specific request, and close.
//!
//! Abstracting the transport this way lets the session run unchanged against the
//! bundled [`TcpConnection`] or a scripted connection in tests.

mod tcp;

pub use tcp::TcpConnection;

use crate::error::TransportError;
use crate::protocol::{Envelope, MessageType};
use async_trait::async_trait;

/// A message-oriented, request/response-correlating link to a validator.
#[async_trait]
pub trait Connection: Send {
    /// Sends `content` as a frame of `message_type` and returns the correlation id
    /// assigned to it. Replies to this frame carry the same id.
    async fn send(
        &mut self,
        message_type: MessageType,
        content: Vec<u8>,
    ) -> Result<String, TransportError>;

    /// Receives the next inbound frame, whatever its type or correlation id.
    async fn receive(&mut self) -> Result<Envelope, TransportError>;

    /// Receives the frame correlated to `correlation_id`. Frames that arrive first
    /// are kept and handed out by later [`receive`](Connection::receive) calls in
    /// arrival order.
    async fn receive_correlated(&mut self, correlation_id: &str)
        -> Result<Envelope, TransportError>;

    /// Releases the connection.
    async fn close(&mut self) -> Result<(), TransportError>;
}
