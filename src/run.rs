//! Runtime manager: wires producers to the client and runs the dispatch loop.
//!
//! # Architecture
//!
//! ```text
//!  WsReader task ──WsRead/Disconnected──┐
//!  stdin thread ──StdinRead─────────────┤
//!  timers ──CallLoop/Sweep/Quit─────────┼──▶ event channel ──▶ dispatch ──▶ Client
//!  hooks / commands ──DataQuery/...─────┘                                    │
//!                                                                            ▼
//!  WsWriter task ◀──────────────────────── outbound frame queue ◀────────── transmit
//! ```
//!
//! Everything the client does happens inside [`dispatch`], one event at a
//! time. The writer task owns the socket's write half and drains the
//! outbound queue in order; once the client is dropped the queue closes and
//! the writer sends a close frame.

use std::io::BufRead;

use anyhow::Result;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::client::{Client, ExitReason, Flow, LoopFn};
use crate::config::ClientConfig;
use crate::constants::WRITER_SHUTDOWN_TIMEOUT;
use crate::events::{self, Channel, ClientEvent, EventReceiver, EventSender};
use crate::hooks::{HookCommand, HookTable};
use crate::ws::{self, WsMessage, WsReader, WsWriter};

/// Assembles a client from configuration, hooks and an optional loop function.
///
/// # Example
///
/// ```no_run
/// use isomer_client::{ClientBuilder, ClientConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let mut config = ClientConfig::default();
/// config.options.loop_frequency = Some(1.0);
///
/// let reason = ClientBuilder::new(config)
///     .loop_fn(|| {
///         log::info!("tick");
///         Ok(())
///     })
///     .run()
///     .await?;
/// println!("client stopped: {reason}");
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    config: ClientConfig,
    hooks: HookTable,
    loop_fn: Option<LoopFn>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("hooks", &self.hooks)
            .field("has_loop_fn", &self.loop_fn.is_some())
            .finish()
    }
}

impl ClientBuilder {
    /// Start from a configuration with no hooks and no loop function.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            hooks: HookTable::new(),
            loop_fn: None,
        }
    }

    /// Register one hook command.
    ///
    /// # Errors
    ///
    /// Returns an error if the hook name is invalid.
    pub fn hook(mut self, hook: HookCommand) -> Result<Self> {
        self.hooks.register(hook)?;
        Ok(self)
    }

    /// Replace the hook table.
    #[must_use]
    pub fn hooks(mut self, hooks: HookTable) -> Self {
        self.hooks = hooks;
        self
    }

    /// Set the loop function ticked at `options.loop_frequency`.
    #[must_use]
    pub fn loop_fn<F>(mut self, loop_fn: F) -> Self
    where
        F: FnMut() -> Result<()> + Send + 'static,
    {
        self.loop_fn = Some(Box::new(loop_fn));
        self
    }

    /// Connect, log in and run until the session ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the connection
    /// cannot be established, or an outbound payload fails to serialize.
    pub async fn run(self) -> Result<ExitReason> {
        let Self {
            config,
            hooks,
            loop_fn,
        } = self;
        config.validate()?;

        let url = config.url();
        log::info!("[Runtime] Connecting to {url}");
        let (writer, reader) = ws::connect(&url).await?;

        let (events_tx, mut events_rx) = events::channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(write_frames(writer, outbound_rx));

        // Queue the registration before any inbound frame can arrive
        let _ = events_tx.send(ClientEvent::Registered(Channel::Ws));
        let reader_task = tokio::spawn(read_frames(reader, events_tx.clone()));

        if config.options.suppress_stdin {
            log::debug!("[Runtime] Terminal input suppressed");
        } else {
            spawn_stdin_reader(events_tx.clone())?;
        }

        let mut client = Client::new(config, hooks, loop_fn, events_tx, outbound_tx);
        client.start();

        let result = dispatch(&mut client, &mut events_rx).await;

        reader_task.abort();
        // Dropping the client closes the outbound queue and stops its timers
        drop(client);
        match tokio::time::timeout(WRITER_SHUTDOWN_TIMEOUT, writer_task).await {
            Ok(Ok(())) => log::debug!("[Runtime] Writer flushed and closed"),
            Ok(Err(e)) => log::warn!("[Runtime] Writer task failed: {e}"),
            Err(_) => log::warn!("[Runtime] Writer did not finish within {WRITER_SHUTDOWN_TIMEOUT:?}"),
        }

        if let Ok(reason) = &result {
            log::info!("[Runtime] Session ended: {reason}");
        }
        result
    }
}

/// Feed events to `client` until it asks to exit.
///
/// Ctrl-C ends the loop with [`ExitReason::Interrupted`]. A closed event
/// channel is treated as a lost connection.
///
/// # Errors
///
/// Propagates fatal errors from [`Client::handle_event`].
pub async fn dispatch(client: &mut Client, events: &mut EventReceiver) -> Result<ExitReason> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    log::warn!("[Runtime] Event channel closed");
                    return Ok(ExitReason::Disconnected);
                };
                if let Flow::Exit(reason) = client.handle_event(event)? {
                    return Ok(reason);
                }
            }
            _ = &mut ctrl_c => {
                log::info!("[Runtime] Interrupted");
                return Ok(ExitReason::Interrupted);
            }
        }
    }
}

/// Forward inbound frames until the connection ends.
async fn read_frames(mut reader: WsReader, tx: EventSender) {
    loop {
        let event = match reader.recv().await {
            Some(Ok(WsMessage::Text(text))) => ClientEvent::WsRead(text),
            Some(Ok(WsMessage::Binary(data))) => {
                ClientEvent::WsRead(String::from_utf8_lossy(&data).into_owned())
            }
            Some(Ok(WsMessage::Close { code, reason })) => {
                let _ = tx.send(ClientEvent::Disconnected { code, reason });
                return;
            }
            Some(Err(e)) => {
                let _ = tx.send(ClientEvent::Disconnected {
                    code: 1006,
                    reason: format!("{e:#}"),
                });
                return;
            }
            None => {
                let _ = tx.send(ClientEvent::Disconnected {
                    code: 1006,
                    reason: "stream ended".to_string(),
                });
                return;
            }
        };
        if tx.send(event).is_err() {
            return;
        }
    }
}

/// Drain the outbound queue onto the socket, then close it.
async fn write_frames(mut writer: WsWriter, mut outbound: mpsc::UnboundedReceiver<String>) {
    while let Some(text) = outbound.recv().await {
        if let Err(e) = writer.send_text(&text).await {
            log::error!("[Runtime] {e:#}");
            return;
        }
    }
    if let Err(e) = writer.close().await {
        log::debug!("[Runtime] {e:#}");
    }
}

/// Read terminal lines on a dedicated thread.
///
/// Blocking reads stay off the runtime; the thread ends at end of input or
/// once the event loop is gone.
fn spawn_stdin_reader(tx: EventSender) -> Result<()> {
    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let _ = tx.send(ClientEvent::Registered(Channel::Stdin));
            forward_lines(std::io::stdin().lock(), &tx);
        })?;
    Ok(())
}

/// Send each `\n`-delimited line of `input` as a raw [`ClientEvent::StdinRead`].
fn forward_lines(input: impl BufRead, tx: &EventSender) {
    for line in input.split(b'\n') {
        match line {
            Ok(line) => {
                if tx.send(ClientEvent::StdinRead(Bytes::from(line))).is_err() {
                    return;
                }
            }
            Err(e) => {
                log::warn!("[Runtime] Terminal read failed: {e}");
                return;
            }
        }
    }
    log::debug!("[Runtime] End of terminal input");
}
