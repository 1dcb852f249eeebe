//! # Subscription Session
//!
//! A [`Session`] owns one validator [`Connection`] for the lifetime of a single
//! subscription and walks it through
//! `Init -> Subscribing -> Subscribed -> Stopping -> Closed`.
//!
//! ## Lifecycle
//!
//! 1. [`Session::subscribe`] sends the subscribe request and waits for its
//!    correlated reply. Only an `OK` status moves the session to `Subscribed`; any
//!    failure closes the connection on the spot.
//! 2. [`Session::stream`] pulls one frame at a time, decodes it as an event batch and
//!    hands it to an [`EventConsumer`] until the consumer stops, the cancellation
//!    token fires, or the connection fails.
//! 3. [`Session::unsubscribe`] sends the unsubscribe request and then releases the
//!    connection whatever the validator answered.
//!
//! [`Session::run`] chains the three steps and is what most callers want.

use crate::{
    config::SessionConfig,
    error::{SessionError, TransportError, UnsubscribeError},
    listener::{EventConsumer, Flow},
    protocol::{
        encode, ClientEventsSubscribeRequest, ClientEventsSubscribeResponse,
        ClientEventsUnsubscribeRequest, ClientEventsUnsubscribeResponse, Envelope, EventList,
        EventSubscription, MessageType, SubscribeStatus, UnsubscribeStatus,
    },
    transport::Connection,
};
use prost::Message;
use std::{fmt, future::Future, time::Duration};
use tokio_util::sync::CancellationToken;

/// Where a [`Session`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Subscribing,
    Subscribed,
    Stopping,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Init => "init",
            SessionState::Subscribing => "subscribing",
            SessionState::Subscribed => "subscribed",
            SessionState::Stopping => "stopping",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Why the event stream ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The consumer returned [`Flow::Stop`].
    ConsumerStopped,
    /// The cancellation token was triggered.
    Cancelled,
}

/// Failure of a single request/response exchange.
enum Exchange {
    Transport(TransportError),
    Timeout(Duration),
}

/// A single subscription over an exclusively owned validator connection.
pub struct Session<C: Connection> {
    /// `None` once the connection has been released.
    connection: Option<C>,
    config: SessionConfig,
    state: SessionState,
    correlation_id: Option<String>,
    last_known_block_ids: Vec<String>,
}

impl<C: Connection> Session<C> {
    pub fn new(connection: C, config: SessionConfig) -> Self {
        Self {
            connection: Some(connection),
            config,
            state: SessionState::Init,
            correlation_id: None,
            last_known_block_ids: Vec::new(),
        }
    }

    /// Asks the validator to replay events committed after the most recent of
    /// `block_ids` it knows about.
    pub fn since_blocks(mut self, block_ids: Vec<String>) -> Self {
        self.last_known_block_ids = block_ids;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The correlation id of the most recently sent request.
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Subscribes, streams into `consumer` until it stops, `cancel` fires or the
    /// connection fails, then unsubscribes and closes.
    ///
    /// A subscribe failure is returned without touching the event stream. When both
    /// the stream and the unsubscribe fail, the stream error is returned and the
    /// unsubscribe error is logged.
    pub async fn run<E>(
        mut self,
        subscriptions: Vec<EventSubscription>,
        mut consumer: E,
        cancel: &CancellationToken,
    ) -> Result<StopReason, SessionError>
    where
        E: EventConsumer,
    {
        self.subscribe(subscriptions).await?;

        let streamed = self.stream(&mut consumer, cancel).await;
        if let Err(e) = &streamed {
            tracing::error!("Event stream terminated: {}", e);
        }

        match (streamed, self.unsubscribe().await) {
            (Ok(reason), Ok(())) => Ok(reason),
            (Ok(_), Err(e)) | (Err(e), Ok(())) => Err(e),
            (Err(e), Err(unsubscribe)) => {
                tracing::warn!("Ignoring teardown failure after stream error: {}", unsubscribe);
                Err(e)
            }
        }
    }

    /// Performs the subscribe handshake.
    ///
    /// On failure the connection is closed and the session is unusable.
    pub async fn subscribe(
        &mut self,
        subscriptions: Vec<EventSubscription>,
    ) -> Result<(), SessionError> {
        self.expect_state(SessionState::Init, "subscribe")?;
        self.state = SessionState::Subscribing;
        tracing::info!("Subscribing to {} event type(s)", subscriptions.len());

        match self.handshake(subscriptions).await {
            Ok(()) => {
                self.state = SessionState::Subscribed;
                tracing::info!("Subscription accepted by validator");
                Ok(())
            }
            Err(e) => {
                tracing::error!("Subscription failed: {}", e);
                self.release().await;
                Err(e)
            }
        }
    }

    async fn handshake(&mut self, subscriptions: Vec<EventSubscription>) -> Result<(), SessionError> {
        let request = ClientEventsSubscribeRequest {
            subscriptions,
            last_known_block_ids: self.last_known_block_ids.clone(),
        };
        let payload = encode(&request).map_err(|source| SessionError::Encoding {
            what: "subscribe request",
            source,
        })?;

        let reply = self
            .exchange(MessageType::ClientEventsSubscribeRequest, payload)
            .await
            .map_err(|e| match e {
                Exchange::Transport(e) => SessionError::Transport(e),
                Exchange::Timeout(timeout) => SessionError::Timeout {
                    what: "subscribe response",
                    timeout,
                },
            })?;
        expect_type(&reply, MessageType::ClientEventsSubscribeResponse)?;

        let response = ClientEventsSubscribeResponse::decode(reply.content.as_slice())
            .map_err(|source| SessionError::Decoding {
                what: "subscribe response",
                source,
            })?;

        match response.status() {
            SubscribeStatus::Ok => Ok(()),
            status => Err(SessionError::Protocol {
                status,
                code: response.status,
                message: response.response_message,
            }),
        }
    }

    /// Delivers event batches to `consumer` until it stops, `cancel` fires, or a
    /// frame cannot be received or understood.
    ///
    /// Frames are read one at a time; the next frame is not requested until the
    /// consumer has returned. Cancellation is honoured while waiting for a frame.
    pub async fn stream<E>(
        &mut self,
        consumer: &mut E,
        cancel: &CancellationToken,
    ) -> Result<StopReason, SessionError>
    where
        E: EventConsumer + ?Sized,
    {
        self.expect_state(SessionState::Subscribed, "stream events")?;
        let idle_limit = self.config.idle_timeout();
        let connection = self
            .connection
            .as_mut()
            .ok_or(SessionError::Transport(TransportError::Closed))?;

        tracing::info!("Listening to events.");
        let mut batches: u64 = 0;

        loop {
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Stream cancelled after {} batch(es)", batches);
                    return Ok(StopReason::Cancelled);
                }
                received = within(idle_limit, connection.receive()) => received,
            };
            let envelope = received.map_err(|timeout| SessionError::Timeout {
                what: "event batch",
                timeout,
            })??;

            expect_type(&envelope, MessageType::ClientEvents)?;
            let batch = EventList::decode(envelope.content.as_slice()).map_err(|source| {
                SessionError::Decoding {
                    what: "event batch",
                    source,
                }
            })?;

            batches += 1;
            tracing::debug!(batch = batches, events = batch.events.len(), "Received event batch");

            if consumer.on_events(batch.events).await == Flow::Stop {
                tracing::info!("Consumer stopped the stream after {} batch(es)", batches);
                return Ok(StopReason::ConsumerStopped);
            }
        }
    }

    /// Sends the unsubscribe request and releases the connection.
    ///
    /// The connection is closed even if the validator rejects the request or never
    /// answers; that failure is still returned.
    pub async fn unsubscribe(&mut self) -> Result<(), SessionError> {
        self.expect_state(SessionState::Subscribed, "unsubscribe")?;
        self.state = SessionState::Stopping;
        tracing::info!("Unsubscribing from events");

        let outcome = self.request_unsubscribe().await;
        self.release().await;

        match outcome {
            Ok(()) => {
                tracing::info!("Unsubscribed");
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Unsubscribe was not confirmed: {}", e);
                Err(SessionError::Unsubscribe(e))
            }
        }
    }

    async fn request_unsubscribe(&mut self) -> Result<(), UnsubscribeError> {
        let payload = encode(&ClientEventsUnsubscribeRequest {})?;

        let reply = self
            .exchange(MessageType::ClientEventsUnsubscribeRequest, payload)
            .await
            .map_err(|e| match e {
                Exchange::Transport(e) => UnsubscribeError::Transport(e),
                Exchange::Timeout(timeout) => UnsubscribeError::Timeout(timeout),
            })?;
        if reply.message_type != i32::from(MessageType::ClientEventsUnsubscribeResponse) {
            return Err(UnsubscribeError::UnexpectedReply(reply.message_type));
        }

        let response = ClientEventsUnsubscribeResponse::decode(reply.content.as_slice())?;
        match response.status() {
            UnsubscribeStatus::Ok => Ok(()),
            status => Err(UnsubscribeError::Rejected(status)),
        }
    }

    /// Ends the session from whatever state it is in: unsubscribes if subscribed,
    /// then makes sure the connection is released.
    pub async fn teardown(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Subscribed => self.unsubscribe().await,
            _ => {
                self.release().await;
                Ok(())
            }
        }
    }

    async fn exchange(
        &mut self,
        message_type: MessageType,
        payload: Vec<u8>,
    ) -> Result<Envelope, Exchange> {
        let limit = self.config.response_timeout();
        let connection = self
            .connection
            .as_mut()
            .ok_or(Exchange::Transport(TransportError::Closed))?;

        let correlation_id = connection
            .send(message_type, payload)
            .await
            .map_err(Exchange::Transport)?;
        tracing::debug!(%correlation_id, "Sent {:?}", message_type);
        self.correlation_id = Some(correlation_id.clone());

        within(limit, connection.receive_correlated(&correlation_id))
            .await
            .map_err(Exchange::Timeout)?
            .map_err(Exchange::Transport)
    }

    async fn release(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            if let Err(e) = connection.close().await {
                tracing::warn!("Failed to close validator connection cleanly: {}", e);
            }
        }
        self.state = SessionState::Closed;
    }

    fn expect_state(
        &self,
        expected: SessionState,
        operation: &'static str,
    ) -> Result<(), SessionError> {
        if self.state != expected {
            return Err(SessionError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }
}

impl<C: Connection> Drop for Session<C> {
    fn drop(&mut self) {
        if self.connection.is_some() {
            tracing::warn!(
                state = %self.state,
                "Session dropped before teardown; connection released without unsubscribing"
            );
        }
    }
}

fn expect_type(envelope: &Envelope, expected: MessageType) -> Result<(), SessionError> {
    if envelope.message_type != i32::from(expected) {
        return Err(SessionError::UnexpectedMessage {
            expected,
            actual: envelope.message_type,
        });
    }
    Ok(())
}

/// Awaits `fut`, giving up after `limit` if one is set.
async fn within<F: Future>(limit: Option<Duration>, fut: F) -> Result<F::Output, Duration> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| limit),
        None => Ok(fut.await),
    }
}
