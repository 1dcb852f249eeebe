use anyhow::{Context, Result};
use ledger_events_connector::{
    config::ConnectorConfig,
    events::{BLOCK_COMMIT, STATE_DELTA},
    protocol::{EventFilter, EventSubscription},
};
use ledger_events_logger::LogConfig;
use serde::{
    de::{self, SeqAccess, Visitor},
    Deserialize, Deserializer,
};
use std::fmt;

const ENV_PREFIX: &str = "LEDGER_EVENTS";

/// Address prefix of the cookiejar transaction family: the first 6 hex
/// characters of SHA-512("cookiejar").
pub const COOKIEJAR_ADDRESS_PREFIX: &str = "a4d219";

/// The top-level configuration for the event client.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ClientConfig {
    #[serde(default)]
    pub connector: ConnectorConfig,
    #[serde(default)]
    pub subscriptions: SubscriptionsConfig,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

/// Which events to subscribe to.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SubscriptionsConfig {
    pub block_commits: bool,
    pub state_deltas: bool,
    /// Narrows state deltas to addresses under this prefix. Empty means all addresses.
    pub address_prefix: String,
    /// Application event types subscribed to without filters.
    #[serde(deserialize_with = "comma_separated")]
    pub event_types: Vec<String>,
    /// Replay events committed after the latest of these blocks the validator knows.
    #[serde(deserialize_with = "comma_separated")]
    pub last_known_block_ids: Vec<String>,
}

impl Default for SubscriptionsConfig {
    fn default() -> Self {
        Self {
            block_commits: true,
            state_deltas: true,
            address_prefix: COOKIEJAR_ADDRESS_PREFIX.to_string(),
            event_types: vec!["cookiejar/bake".to_string(), "cookiejar/eat".to_string()],
            last_known_block_ids: Vec::new(),
        }
    }
}

impl SubscriptionsConfig {
    /// Builds the subscription list in a fixed order: block commits, state deltas,
    /// then application event types as configured.
    pub fn to_subscriptions(&self) -> Vec<EventSubscription> {
        let mut subscriptions = Vec::new();
        if self.block_commits {
            subscriptions.push(EventSubscription::new(BLOCK_COMMIT));
        }
        if self.state_deltas {
            let mut state_delta = EventSubscription::new(STATE_DELTA);
            if !self.address_prefix.is_empty() {
                state_delta = state_delta.with_filter(EventFilter::address_prefix(&self.address_prefix));
            }
            subscriptions.push(state_delta);
        }
        subscriptions.extend(self.event_types.iter().map(EventSubscription::new));
        subscriptions
    }
}

impl ClientConfig {
    /// Applies the legacy `VALIDATOR_URL` override. Empty values are ignored.
    pub fn apply_validator_url(&mut self, url: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.connector.validator.url = url;
        }
    }
}

/// Loads the client configuration from an optional TOML file, layered under
/// `LEDGER_EVENTS__*` environment variables.
///
/// `LEDGER_EVENTS__CONNECTOR__SESSION__RESPONSE_TIMEOUT_MS=2000` sets
/// `connector.session.response-timeout-ms`; list settings take comma-separated values.
pub fn load_config(path: Option<&str>) -> Result<ClientConfig> {
    build_config(path, None)
}

/// Like [`load_config`], but reads overrides from `vars` instead of the process
/// environment.
pub fn load_config_with_env(
    path: Option<&str>,
    vars: config::Map<String, String>,
) -> Result<ClientConfig> {
    build_config(path, Some(vars))
}

fn build_config(
    path: Option<&str>,
    vars: Option<config::Map<String, String>>,
) -> Result<ClientConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::with_name(path));
    }
    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .convert_case(config::Case::Kebab)
            .source(vars),
    );

    let settings: ClientConfig = builder
        .build()
        .context(format!("Failed to build configuration from '{}'", path.unwrap_or("<defaults>")))?
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    Ok(settings)
}

/// Reads a list either as a sequence (TOML arrays) or as a comma-separated string
/// (environment variables).
fn comma_separated<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct CommaSeparated;

    impl<'de> Visitor<'de> for CommaSeparated {
        type Value = Vec<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list of strings or a comma-separated string")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Self::Value, E> {
            Ok(value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect())
        }

        fn visit_seq<A: SeqAccess<'de>>(
            self,
            mut seq: A,
        ) -> std::result::Result<Self::Value, A::Error> {
            let mut items = Vec::new();
            while let Some(item) = seq.next_element::<String>()? {
                items.push(item);
            }
            Ok(items)
        }
    }

    deserializer.deserialize_any(CommaSeparated)
}
