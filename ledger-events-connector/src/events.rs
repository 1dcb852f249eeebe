//! Constructors and typed views over the raw protocol event types.

use crate::protocol::{Event, EventFilter, EventSubscription, FilterType};
use std::fmt;
use thiserror::Error;

/// Emitted by the validator once per committed block.
pub const BLOCK_COMMIT: &str = "sawtooth/block-commit";
/// Emitted by the validator for state changes; `data` carries the change list.
pub const STATE_DELTA: &str = "sawtooth/state-delta";
/// Attribute key used to filter state-delta events by address.
pub const ADDRESS_KEY: &str = "address";

impl EventFilter {
    /// Literal match on any attribute named `key`.
    pub fn exact(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::with_type(key, value, FilterType::SimpleAny)
    }

    /// Literal match required on every attribute named `key`.
    pub fn exact_all(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::with_type(key, value, FilterType::SimpleAll)
    }

    /// Matches if any attribute named `key` matches `pattern`.
    pub fn regex_any(key: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::with_type(key, pattern, FilterType::RegexAny)
    }

    /// Matches only if every attribute named `key` matches `pattern`.
    pub fn regex_all(key: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::with_type(key, pattern, FilterType::RegexAll)
    }

    /// Matches state-delta events touching any address under `prefix`.
    pub fn address_prefix(prefix: &str) -> Self {
        Self::regex_any(ADDRESS_KEY, format!("{prefix}.*"))
    }

    fn with_type(key: impl Into<String>, match_string: impl Into<String>, kind: FilterType) -> Self {
        Self {
            key: key.into(),
            match_string: match_string.into(),
            filter_type: kind.into(),
        }
    }
}

impl EventSubscription {
    /// A subscription to every event of `event_type`.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            filters: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: EventFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_filters(mut self, filters: impl IntoIterator<Item = EventFilter>) -> Self {
        self.filters.extend(filters);
        self
    }
}

impl Event {
    /// Returns the value of the first attribute named `key`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.key == key)
            .map(|attr| attr.value.as_str())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [", self.event_type)?;
        for (i, attr) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", attr.key, attr.value)?;
        }
        write!(f, "] ({} bytes of data)", self.data.len())
    }
}

/// Failure to interpret an [`Event`] as a typed view.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventParseError {
    #[error("expected a '{expected}' event, got '{actual}'")]
    WrongType { expected: &'static str, actual: String },
    #[error("event is missing attribute '{0}'")]
    MissingAttribute(&'static str),
    #[error("attribute '{key}' has invalid value '{value}'")]
    InvalidAttribute { key: &'static str, value: String },
}

/// The attributes of a `sawtooth/block-commit` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockCommit {
    pub block_id: String,
    pub block_num: u64,
    pub state_root_hash: String,
    pub previous_block_id: String,
}

impl TryFrom<&Event> for BlockCommit {
    type Error = EventParseError;

    fn try_from(event: &Event) -> Result<Self, Self::Error> {
        if event.event_type != BLOCK_COMMIT {
            return Err(EventParseError::WrongType {
                expected: BLOCK_COMMIT,
                actual: event.event_type.clone(),
            });
        }

        let required = |key: &'static str| {
            event
                .attribute(key)
                .map(str::to_owned)
                .ok_or(EventParseError::MissingAttribute(key))
        };

        let raw_num = required("block_num")?;
        let block_num = raw_num
            .parse()
            .map_err(|_| EventParseError::InvalidAttribute {
                key: "block_num",
                value: raw_num.clone(),
            })?;

        Ok(Self {
            block_id: required("block_id")?,
            block_num,
            state_root_hash: required("state_root_hash")?,
            previous_block_id: required("previous_block_id")?,
        })
    }
}
