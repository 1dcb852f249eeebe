#![allow(dead_code)]

use async_trait::async_trait;
use ledger_events_connector::{
    protocol::{
        encode, ClientEventsSubscribeResponse, ClientEventsUnsubscribeResponse, Envelope, Event,
        EventAttribute, EventList, MessageType, SubscribeStatus, UnsubscribeStatus,
    },
    transport::Connection,
    TransportError,
};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

/// One scripted inbound step, consumed in order by the mock.
pub enum Step {
    /// A reply correlated to the most recent request.
    Reply(MessageType, Vec<u8>),
    /// An unsolicited frame.
    Push(MessageType, Vec<u8>),
    Fail(TransportError),
    /// Never resolves.
    Hang,
}

#[derive(Default)]
struct MockState {
    script: VecDeque<Step>,
    pending: VecDeque<Envelope>,
    sent: Vec<Envelope>,
    closes: usize,
    next_id: u64,
}

/// A scripted [`Connection`] whose traffic can be inspected after the session
/// that owned it is gone.
#[derive(Clone, Default)]
pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    pub fn new(script: Vec<Step>) -> Self {
        let conn = Self::default();
        conn.state.lock().unwrap().script = script.into();
        conn
    }

    pub fn sent(&self) -> Vec<Envelope> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn sent_types(&self) -> Vec<i32> {
        self.sent().iter().map(|e| e.message_type).collect()
    }

    pub fn count_sent(&self, message_type: MessageType) -> usize {
        let wanted = i32::from(message_type);
        self.sent_types().into_iter().filter(|t| *t == wanted).count()
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }

    fn last_id(state: &MockState) -> String {
        state
            .sent
            .last()
            .map(|e| e.correlation_id.clone())
            .unwrap_or_default()
    }

    fn next_step(&self) -> Option<Step> {
        self.state.lock().unwrap().script.pop_front()
    }

    fn envelope(&self, message_type: MessageType, content: Vec<u8>, reply: bool) -> Envelope {
        let mut state = self.state.lock().unwrap();
        let correlation_id = if reply {
            Self::last_id(&state)
        } else {
            state.next_id += 1;
            format!("push-{}", state.next_id)
        };
        Envelope {
            message_type: message_type.into(),
            correlation_id,
            content,
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn send(
        &mut self,
        message_type: MessageType,
        content: Vec<u8>,
    ) -> Result<String, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let correlation_id = format!("req-{}", state.next_id);
        state.sent.push(Envelope {
            message_type: message_type.into(),
            correlation_id: correlation_id.clone(),
            content,
        });
        Ok(correlation_id)
    }

    async fn receive(&mut self) -> Result<Envelope, TransportError> {
        if let Some(envelope) = self.state.lock().unwrap().pending.pop_front() {
            return Ok(envelope);
        }
        match self.next_step() {
            Some(Step::Reply(t, content)) => Ok(self.envelope(t, content, true)),
            Some(Step::Push(t, content)) => Ok(self.envelope(t, content, false)),
            Some(Step::Fail(e)) => Err(e),
            Some(Step::Hang) => std::future::pending().await,
            None => Err(TransportError::Closed),
        }
    }

    async fn receive_correlated(
        &mut self,
        correlation_id: &str,
    ) -> Result<Envelope, TransportError> {
        loop {
            match self.next_step() {
                Some(Step::Reply(t, content)) => {
                    let envelope = self.envelope(t, content, true);
                    assert_eq!(envelope.correlation_id, correlation_id);
                    return Ok(envelope);
                }
                Some(Step::Push(t, content)) => {
                    let envelope = self.envelope(t, content, false);
                    self.state.lock().unwrap().pending.push_back(envelope);
                }
                Some(Step::Fail(e)) => return Err(e),
                Some(Step::Hang) => std::future::pending().await,
                None => return Err(TransportError::Closed),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }
}

pub fn subscribe_reply(status: SubscribeStatus) -> Step {
    let response = ClientEventsSubscribeResponse {
        status: status.into(),
        response_message: String::new(),
    };
    Step::Reply(
        MessageType::ClientEventsSubscribeResponse,
        encode(&response).unwrap(),
    )
}

pub fn unsubscribe_reply(status: UnsubscribeStatus) -> Step {
    let response = ClientEventsUnsubscribeResponse {
        status: status.into(),
    };
    Step::Reply(
        MessageType::ClientEventsUnsubscribeResponse,
        encode(&response).unwrap(),
    )
}

pub fn batch(events: Vec<Event>) -> Step {
    Step::Push(MessageType::ClientEvents, encode(&EventList { events }).unwrap())
}

pub fn event(event_type: &str, data: &[u8]) -> Event {
    Event {
        event_type: event_type.to_string(),
        attributes: Vec::new(),
        data: data.to_vec(),
    }
}

pub fn event_with(event_type: &str, attributes: &[(&str, &str)]) -> Event {
    Event {
        event_type: event_type.to_string(),
        attributes: attributes
            .iter()
            .map(|(k, v)| EventAttribute {
                key: k.to_string(),
                value: v.to_string(),
            })
            .collect(),
        data: Vec::new(),
    }
}
