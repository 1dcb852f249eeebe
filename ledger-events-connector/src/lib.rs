//! A Rust client for a ledger validator's event-subscription interface.
//!
//! The crate connects to a validator, registers interest in event types (block
//! commits, state deltas narrowed by address filters, application events), and
//! streams matching events to the caller until it stops or the connection fails,
//! unsubscribing cleanly on the way out.
//!
//! # Key Components
//!
//! *   [`session::Session`]: The subscription state machine. It performs the subscribe
//!     handshake, runs the event stream loop and the unsubscribe sequence.
//! *   [`transport::Connection`]: The contract the session needs from a transport, with
//!     [`transport::TcpConnection`] as the bundled implementation.
//! *   [`listener`]: Event consumers (closures or channels) that receive decoded batches.
//! *   [`protocol`]: The validator's wire messages.
//!
//! # Example
//!
//! ```no_run
//! use ledger_events_connector::{
//!     config::ConnectorConfig,
//!     listener::Flow,
//!     protocol::{Event, EventFilter, EventSubscription},
//!     session::Session,
//!     transport::TcpConnection,
//!     CancellationToken,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConnectorConfig::default();
//! let connection = TcpConnection::connect(&config.validator.url, &config.transport).await?;
//! let subscriptions = vec![
//!     EventSubscription::new("sawtooth/block-commit"),
//!     EventSubscription::new("sawtooth/state-delta")
//!         .with_filter(EventFilter::address_prefix("a4d219")),
//! ];
//!
//! let reason = Session::new(connection, config.session)
//!     .run(
//!         subscriptions,
//!         |events: Vec<Event>| {
//!             events.iter().for_each(|e| println!("{e}"));
//!             Flow::Continue
//!         },
//!         &CancellationToken::new(),
//!     )
//!     .await?;
//! println!("stopped: {reason:?}");
//! # Ok(())
//! # }
//! ```

/// Defines configuration structures for the connector.
pub mod config;
pub mod error;
/// Constructors and typed views over protocol events.
pub mod events;
/// Consumers that receive decoded event batches.
pub mod listener;
pub mod protocol;
/// The subscription state machine.
pub mod session;
pub mod transport;

pub use error::{SessionError, TransportError, UnsubscribeError};
pub use tokio_util::sync::CancellationToken;
