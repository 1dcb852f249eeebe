#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::time::Duration;

/// The top-level configuration for the `ledger-events-connector` library.
///
/// Aggregates the validator endpoint, the session's wait limits and transport
/// framing limits. It is resolved once by the embedding application (typically
/// deserialized from a configuration file) and passed down by value; the library
/// itself never reads the environment.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub struct ConnectorConfig {
    #[cfg_attr(feature = "serde", serde(default))]
    pub validator: Validator,
    #[cfg_attr(feature = "serde", serde(default))]
    pub session: SessionConfig,
    #[cfg_attr(feature = "serde", serde(default))]
    pub transport: TransportConfig,
}

/// Where the validator's client endpoint lives.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case", default))]
pub struct Validator {
    /// `tcp://host:port` or plain `host:port`.
    pub url: String,
}

/// Wait limits applied by a subscription session.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case", default))]
pub struct SessionConfig {
    /// How long to wait for the subscribe and unsubscribe replies. `None` waits forever.
    pub response_timeout_ms: Option<u64>,
    /// How long the stream loop may go without an inbound frame. `None` waits forever.
    pub idle_timeout_ms: Option<u64>,
}

/// Framing limits for the TCP transport.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case", default))]
pub struct TransportConfig {
    /// Inbound frames larger than this are rejected as malformed.
    pub max_frame_size: usize,
    pub connect_timeout_ms: Option<u64>,
}

impl SessionConfig {
    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_ms.map(Duration::from_millis)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_ms.map(Duration::from_millis)
    }
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            url: "tcp://localhost:4004".to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: Some(10_000),
            idle_timeout_ms: None,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_frame_size: 16 * 1024 * 1024,
            connect_timeout_ms: Some(5_000),
        }
    }
}
