use super::Connection;
use crate::{
    config::TransportConfig,
    error::TransportError,
    protocol::{encode, Envelope, MessageType},
};
use async_trait::async_trait;
use bytes::{Buf, BufMut, BytesMut};
use prost::Message;
use std::collections::VecDeque;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use uuid::Uuid;

const HEADER_LEN: usize = 4;

/// A [`Connection`] over a plain TCP stream.
///
/// Each frame is a 4-byte big-endian length followed by a protobuf-encoded
/// [`Envelope`]. Reads go through an internal buffer, so dropping a pending
/// `receive` (on timeout or cancellation) never loses a partially read frame.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
    endpoint: String,
    buffer: BytesMut,
    /// Frames that arrived while waiting for a correlated reply.
    pending: VecDeque<Envelope>,
    max_frame_size: usize,
}

impl TcpConnection {
    /// Opens a connection to `endpoint` (`tcp://host:port` or `host:port`).
    pub async fn connect(endpoint: &str, config: &TransportConfig) -> Result<Self, TransportError> {
        let address = parse_endpoint(endpoint)?;
        let connecting = TcpStream::connect(address);

        let stream = match config.connect_timeout() {
            Some(limit) => tokio::time::timeout(limit, connecting)
                .await
                .map_err(|_| TransportError::ConnectTimeout(endpoint.to_string()))?,
            None => connecting.await,
        }
        .map_err(|source| TransportError::Connect {
            endpoint: endpoint.to_string(),
            source,
        })?;
        stream.set_nodelay(true)?;

        tracing::info!("Connected to validator at {}", endpoint);

        Ok(Self {
            stream,
            endpoint: endpoint.to_string(),
            buffer: BytesMut::with_capacity(8 * 1024),
            pending: VecDeque::new(),
            max_frame_size: config.max_frame_size,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn read_frame(&mut self) -> Result<Envelope, TransportError> {
        loop {
            if let Some(envelope) = self.parse_frame()? {
                return Ok(envelope);
            }
            if self.stream.read_buf(&mut self.buffer).await? == 0 {
                return Err(TransportError::Closed);
            }
        }
    }

    fn parse_frame(&mut self) -> Result<Option<Envelope>, TransportError> {
        if self.buffer.len() < HEADER_LEN {
            return Ok(None);
        }

        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&self.buffer[..HEADER_LEN]);
        let len = u32::from_be_bytes(header) as usize;
        if len > self.max_frame_size {
            return Err(TransportError::FrameTooLarge {
                len,
                max: self.max_frame_size,
            });
        }

        let total = HEADER_LEN + len;
        if self.buffer.len() < total {
            self.buffer.reserve(total - self.buffer.len());
            return Ok(None);
        }

        self.buffer.advance(HEADER_LEN);
        let frame = self.buffer.split_to(len).freeze();
        let envelope = Envelope::decode(frame)?;
        tracing::trace!(
            message_type = envelope.message_type,
            correlation_id = %envelope.correlation_id,
            "Received frame of {} bytes",
            len
        );
        Ok(Some(envelope))
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn send(
        &mut self,
        message_type: MessageType,
        content: Vec<u8>,
    ) -> Result<String, TransportError> {
        let correlation_id = Uuid::new_v4().simple().to_string();
        let envelope = Envelope {
            message_type: message_type.into(),
            correlation_id: correlation_id.clone(),
            content,
        };

        let body = encode(&envelope)?;
        let mut frame = BytesMut::with_capacity(HEADER_LEN + body.len());
        frame.put_u32(body.len() as u32);
        frame.put_slice(&body);

        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;
        Ok(correlation_id)
    }

    async fn receive(&mut self) -> Result<Envelope, TransportError> {
        if let Some(envelope) = self.pending.pop_front() {
            return Ok(envelope);
        }
        self.read_frame().await
    }

    async fn receive_correlated(
        &mut self,
        correlation_id: &str,
    ) -> Result<Envelope, TransportError> {
        if let Some(pos) = self
            .pending
            .iter()
            .position(|e| e.correlation_id == correlation_id)
        {
            if let Some(envelope) = self.pending.remove(pos) {
                return Ok(envelope);
            }
        }

        loop {
            let envelope = self.read_frame().await?;
            if envelope.correlation_id == correlation_id {
                return Ok(envelope);
            }
            tracing::debug!(
                correlation_id = %envelope.correlation_id,
                "Queueing uncorrelated frame while waiting for {}",
                correlation_id
            );
            self.pending.push_back(envelope);
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        tracing::debug!("Closing connection to {}", self.endpoint);
        self.stream.shutdown().await?;
        Ok(())
    }
}

fn parse_endpoint(endpoint: &str) -> Result<&str, TransportError> {
    let address = match endpoint.split_once("://") {
        Some(("tcp", rest)) => rest,
        Some(_) => return Err(TransportError::InvalidEndpoint(endpoint.to_string())),
        None => endpoint,
    };
    if address.is_empty() || !address.contains(':') {
        return Err(TransportError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_accepts_tcp_scheme_and_bare_address() {
        assert_eq!(parse_endpoint("tcp://validator:4004").unwrap(), "validator:4004");
        assert_eq!(parse_endpoint("127.0.0.1:4004").unwrap(), "127.0.0.1:4004");
    }

    #[test]
    fn endpoint_rejects_other_schemes() {
        assert!(matches!(
            parse_endpoint("http://rest-api:8008"),
            Err(TransportError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            parse_endpoint("tcp://"),
            Err(TransportError::InvalidEndpoint(_))
        ));
    }
}
