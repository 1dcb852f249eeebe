//! Process-wide `tracing` setup shared by the ledger-events binaries.

mod logging;

pub use logging::{init, LogConfig, LogFormat, LogOutput};
