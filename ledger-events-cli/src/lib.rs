pub mod cli;
pub mod config;

use anyhow::{Context, Result};
use clap::Parser;
use crate::cli::Cli;
use crate::config::{load_config, ClientConfig};
use ledger_events_connector::{
    listener::Flow,
    protocol::Event,
    session::Session,
    transport::TcpConnection,
    CancellationToken,
};
use std::future::Future;
use tokio::signal;

/// The main entry point for the event client.
/// This function handles CLI parsing, configuration, and the subscription session.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config_from_cli(&cli)?;
    config.apply_validator_url(std::env::var("VALIDATOR_URL").ok());
    ledger_events_logger::init(&config.log)?;
    tracing::info!("Configuration loaded: {:#?}", &config);
    listen_to_events(config).await?;

    Ok(())
}

/// Loads the client configuration based on the provided CLI arguments.
fn load_config_from_cli(cli: &Cli) -> Result<ClientConfig> {
    match cli.config.as_deref() {
        Some(config_path) => {
            println!("Loading configuration from '{}'", config_path);
            load_config(Some(config_path))
        }
        None => load_config(None),
    }
}

/// Subscribes and prints events until Ctrl+C, then unsubscribes.
async fn listen_to_events(config: ClientConfig) -> Result<()> {
    let ClientConfig {
        connector,
        subscriptions,
        ..
    } = config;

    let connection = TcpConnection::connect(&connector.validator.url, &connector.transport)
        .await
        .with_context(|| format!("Failed to connect to validator at {}", connector.validator.url))?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let reason = Session::new(connection, connector.session)
        .since_blocks(subscriptions.last_known_block_ids.clone())
        .run(subscriptions.to_subscriptions(), print_events, &cancel)
        .await?;

    tracing::info!("Event stream stopped: {:?}", reason);
    Ok(())
}

fn print_events(events: Vec<Event>) -> Flow {
    println!("Received the following events: ----------");
    for event in &events {
        println!("Event: {}", event);
    }
    Flow::Continue
}

/// Exit status used when a second interrupt abandons the teardown.
const FORCED_EXIT_CODE: i32 = 130;

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    handle_interrupts(signal::ctrl_c, cancel, || {
        std::process::exit(FORCED_EXIT_CODE);
    })
    .await;
}

/// Cancels `cancel` on the first interrupt and calls `force_exit` on the second.
async fn handle_interrupts<F, Fut>(
    mut interrupted: F,
    cancel: CancellationToken,
    force_exit: impl FnOnce(),
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if let Err(err) = interrupted().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal.");
        return;
    }
    tracing::info!(
        "Received Ctrl+C, initiating graceful shutdown. Press Ctrl+C again to exit immediately."
    );
    cancel.cancel();

    match interrupted().await {
        Ok(()) => {
            tracing::warn!("Received a second Ctrl+C, exiting without waiting for the validator.");
            force_exit();
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to listen for shutdown signal.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, time::Duration};
    use tokio::sync::{oneshot, Notify};

    fn scripted_interrupts(
        notify: Arc<Notify>,
    ) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = std::io::Result<()>> + Send>> {
        move || {
            let notify = notify.clone();
            Box::pin(async move {
                notify.notified().await;
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn first_interrupt_cancels_and_second_forces_exit() {
        let notify = Arc::new(Notify::new());
        let cancel = CancellationToken::new();
        let (exited_tx, exited_rx) = oneshot::channel();

        let handler = tokio::spawn(handle_interrupts(
            scripted_interrupts(notify.clone()),
            cancel.clone(),
            move || {
                let _ = exited_tx.send(());
            },
        ));

        notify.notify_one();
        tokio::time::timeout(Duration::from_secs(5), cancel.cancelled())
            .await
            .expect("first interrupt should cancel the session");

        notify.notify_one();
        tokio::time::timeout(Duration::from_secs(5), exited_rx)
            .await
            .expect("second interrupt should force an exit")
            .unwrap();
        handler.await.unwrap();
    }

    #[tokio::test]
    async fn a_single_interrupt_does_not_force_exit() {
        let notify = Arc::new(Notify::new());
        let cancel = CancellationToken::new();
        let (exited_tx, mut exited_rx) = oneshot::channel::<()>();

        let handler = tokio::spawn(handle_interrupts(
            scripted_interrupts(notify.clone()),
            cancel.clone(),
            move || {
                let _ = exited_tx.send(());
            },
        ));

        notify.notify_one();
        cancel.cancelled().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(exited_rx.try_recv().is_err());
        handler.abort();
    }
}
