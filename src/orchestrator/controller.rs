//! Request lifecycle controller.
//!
//! Spawns one task per command and emits settlements for presentation layers.

use crate::engine::ControlTransport;
use crate::model::{Command, ControlEvent};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    /// Send a confirmed command to the plugin.
    Send(Command),
    RefreshSettings,
    Quit,
}

fn spawn_send(
    transport: Arc<dyn ControlTransport>,
    command: Command,
    event_tx: UnboundedSender<ControlEvent>,
) {
    // Requests are never cancelled or ordered; each settles whenever the
    // transport resolves, even if a newer command has been issued since.
    tokio::spawn(async move {
        let result = transport.send(command).await;
        let _ = event_tx.send(ControlEvent::Settled { command, result });
    });
}

fn spawn_settings_fetch(transport: Arc<dyn ControlTransport>, event_tx: UnboundedSender<ControlEvent>) {
    tokio::spawn(async move {
        let result = transport.fetch_settings().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "could not load plugin settings");
        }
        let _ = event_tx.send(ControlEvent::Settings(result));
    });
}

/// Route UI commands to the transport until the UI quits or hangs up.
pub(crate) async fn run_controller(
    transport: Arc<dyn ControlTransport>,
    event_tx: UnboundedSender<ControlEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    tracing::info!(endpoint = %transport.endpoint(), "controller started");
    spawn_settings_fetch(transport.clone(), event_tx.clone());

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            UiCommand::Send(command) => {
                spawn_send(transport.clone(), command, event_tx.clone());
            }
            UiCommand::RefreshSettings => {
                spawn_settings_fetch(transport.clone(), event_tx.clone());
            }
            UiCommand::Quit => break,
        }
    }

    tracing::info!("controller stopped");
    Ok(())
}
