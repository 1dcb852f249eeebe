//! # Event Consumers
//!
//! The stream loop hands every decoded event batch to an [`EventConsumer`], whose
//! answer decides whether the session keeps streaming or starts its teardown.
//!
//! Two consumers are provided: any `FnMut(Vec<Event>) -> Flow` closure, and a
//! [`ChannelConsumer`] that forwards batches into a tokio channel so another task
//! can process them. A channel consumer stops the stream once its receiver is
//! dropped, which unsubscribes the session.

use crate::protocol::Event;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// What the stream loop should do after a batch has been consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Receives event batches from a subscribed session, in arrival order.
#[async_trait]
pub trait EventConsumer: Send {
    async fn on_events(&mut self, events: Vec<Event>) -> Flow;
}

#[async_trait]
impl<F> EventConsumer for F
where
    F: FnMut(Vec<Event>) -> Flow + Send,
{
    async fn on_events(&mut self, events: Vec<Event>) -> Flow {
        (*self)(events)
    }
}

/// Forwards each batch into a bounded channel.
///
/// Backpressure from a full channel propagates to the stream loop, which does not
/// read the next frame until the batch has been accepted.
#[derive(Debug, Clone)]
pub struct ChannelConsumer {
    tx: mpsc::Sender<Vec<Event>>,
}

impl ChannelConsumer {
    /// Creates a consumer and the receiver its batches are delivered to.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Vec<Event>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventConsumer for ChannelConsumer {
    async fn on_events(&mut self, events: Vec<Event>) -> Flow {
        if self.tx.send(events).await.is_err() {
            tracing::info!("Event receiver dropped; stopping the stream.");
            return Flow::Stop;
        }
        Flow::Continue
    }
}
