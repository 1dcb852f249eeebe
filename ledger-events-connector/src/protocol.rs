//! # Validator Wire Messages
//!
//! Protobuf message definitions for the validator's client event protocol. Field
//! numbers and enum values follow the validator's `validator.proto`, `events.proto`
//! and `client_event.proto`, so payloads produced here are byte-compatible with a
//! running validator.
//!
//! The structs are declared with `prost` derives directly rather than generated by a
//! build script; nothing else in the workspace needs `protoc`.

use prost::Message;

/// The envelope every frame on the validator connection is wrapped in.
#[derive(Clone, PartialEq, Message)]
pub struct Envelope {
    #[prost(enumeration = "MessageType", tag = "1")]
    pub message_type: i32,
    /// Opaque id assigned by the sender and echoed on the matching reply.
    #[prost(string, tag = "2")]
    pub correlation_id: String,
    #[prost(bytes = "vec", tag = "3")]
    pub content: Vec<u8>,
}

/// The subset of validator message types used by event clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum MessageType {
    Default = 0,
    ClientEvents = 500,
    ClientEventsSubscribeRequest = 501,
    ClientEventsSubscribeResponse = 502,
    ClientEventsUnsubscribeRequest = 503,
    ClientEventsUnsubscribeResponse = 504,
}

/// A single event emitted by the validator.
#[derive(Clone, PartialEq, Message)]
pub struct Event {
    #[prost(string, tag = "1")]
    pub event_type: String,
    #[prost(message, repeated, tag = "2")]
    pub attributes: Vec<EventAttribute>,
    #[prost(bytes = "vec", tag = "3")]
    pub data: Vec<u8>,
}

/// A key/value pair attached to an [`Event`].
#[derive(Clone, PartialEq, Eq, Hash, Message)]
pub struct EventAttribute {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

/// The content of a `CLIENT_EVENTS` frame.
#[derive(Clone, PartialEq, Message)]
pub struct EventList {
    #[prost(message, repeated, tag = "1")]
    pub events: Vec<Event>,
}

/// A predicate over one attribute of an event.
#[derive(Clone, PartialEq, Eq, Hash, Message)]
pub struct EventFilter {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "2")]
    pub match_string: String,
    #[prost(enumeration = "FilterType", tag = "3")]
    pub filter_type: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum FilterType {
    FilterTypeUnset = 0,
    /// Literal match against any attribute with the filter's key.
    SimpleAny = 1,
    /// Literal match required on every attribute with the filter's key.
    SimpleAll = 2,
    RegexAny = 3,
    RegexAll = 4,
}

/// Interest in one event type, optionally narrowed by filters.
#[derive(Clone, PartialEq, Eq, Hash, Message)]
pub struct EventSubscription {
    #[prost(string, tag = "1")]
    pub event_type: String,
    #[prost(message, repeated, tag = "2")]
    pub filters: Vec<EventFilter>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ClientEventsSubscribeRequest {
    #[prost(message, repeated, tag = "1")]
    pub subscriptions: Vec<EventSubscription>,
    /// Blocks the caller has already seen; the validator replays events committed
    /// after the most recent one it recognises.
    #[prost(string, repeated, tag = "2")]
    pub last_known_block_ids: Vec<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ClientEventsSubscribeResponse {
    #[prost(enumeration = "SubscribeStatus", tag = "1")]
    pub status: i32,
    #[prost(string, tag = "2")]
    pub response_message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum SubscribeStatus {
    StatusUnset = 0,
    Ok = 1,
    InvalidFilter = 2,
    UnknownBlock = 3,
}

#[derive(Clone, PartialEq, Message)]
pub struct ClientEventsUnsubscribeRequest {}

#[derive(Clone, PartialEq, Message)]
pub struct ClientEventsUnsubscribeResponse {
    #[prost(enumeration = "UnsubscribeStatus", tag = "1")]
    pub status: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum UnsubscribeStatus {
    StatusUnset = 0,
    Ok = 1,
    InternalError = 2,
}

/// Serializes `message` into a freshly allocated buffer.
pub fn encode<M: Message>(message: &M) -> Result<Vec<u8>, prost::EncodeError> {
    let mut buf = Vec::with_capacity(message.encoded_len());
    message.encode(&mut buf)?;
    Ok(buf)
}
