//! The client component.
//!
//! [`Client`] owns all session state and handles one [`ClientEvent`] at a
//! time. It never touches the socket or the terminal directly: outbound
//! frames go into an unbounded channel drained by the transport writer, and
//! follow-up work (queries fired by commands, delayed quits, loop ticks) is
//! scheduled by sending events back into its own event channel.
//!
//! # Event handling
//!
//! | Event | Effect |
//! |-------|--------|
//! | `Registered(ws)` | Primer frame + login, once per session |
//! | `WsRead` | Log frame, detect auth failure, resolve pending query, display |
//! | `StdinRead` | Run the command interpreter |
//! | `CallLoop` | Invoke the embedder loop function |
//! | `DataQuery` | Send an object-manager search with the next request id |
//! | `Transmit` | Send an arbitrary payload |
//! | `Sweep` | Expire unanswered queries |
//! | `Disconnected` / `Quit` | Finish the session |

//!
//! Rust guideline compliant 2026-02

use std::io::Write;

use anyhow::{Context, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::commands::{parse_line, Builtin, CommandLine, Line};
use crate::config::ClientConfig;
use crate::constants::{LOOP_FAILURE_QUIT_DELAY, QUIT_DELAY, SWEEP_INTERVAL};
use crate::events::{Channel, ClientEvent, DataQuery, EventSender};
use crate::hooks::HookTable;
use crate::message_log::{preview, MessageLog};
use crate::pending::{PendingRequest, PendingRequests};
use crate::protocol::Envelope;
use crate::session::{Session, SessionState};
use crate::timer::Timer;

/// Embedder callback ticked at the configured loop frequency.
///
/// Returning an error stops the loop and shuts the client down.
pub type LoopFn = Box<dyn FnMut() -> Result<()> + Send>;

/// Sending half of the outbound frame queue.
pub type OutboundSender = mpsc::UnboundedSender<String>;

/// Why the client stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The user quit (`/quit` or a hook-fired quit).
    Quit,
    /// The loop function failed and the delayed shutdown ran.
    LoopFailed,
    /// The server rejected the login.
    AuthFailed,
    /// The transport closed or failed.
    Disconnected,
    /// Interrupted by Ctrl-C.
    Interrupted,
}

impl ExitReason {
    /// Process exit code for this outcome.
    #[must_use]
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Quit | Self::LoopFailed => 0,
            Self::AuthFailed | Self::Disconnected => 1,
            Self::Interrupted => 130,
        }
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quit => write!(f, "quit"),
            Self::LoopFailed => write!(f, "loop function failed"),
            Self::AuthFailed => write!(f, "authentication failed"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Outcome of handling one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep dispatching.
    Continue,
    /// Stop the dispatch loop.
    Exit(ExitReason),
}

/// Interactive client state and event handlers.
pub struct Client {
    config: ClientConfig,
    session: Session,
    messages: MessageLog,
    hooks: HookTable,
    pending: PendingRequests,
    loop_fn: Option<LoopFn>,
    loop_timer: Option<Timer>,
    loop_failed: bool,
    sweep_timer: Option<Timer>,
    quit_timer: Option<Timer>,
    events: EventSender,
    outbound: OutboundSender,
    terminal: Box<dyn Write + Send>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("session", &self.session)
            .field("messages", &self.messages.len())
            .field("hooks", &self.hooks.len())
            .field("pending", &self.pending.len())
            .field("has_loop_fn", &self.loop_fn.is_some())
            .field("quit_scheduled", &self.quit_timer.is_some())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client wired to an event channel and an outbound queue.
    pub fn new(
        config: ClientConfig,
        hooks: HookTable,
        loop_fn: Option<LoopFn>,
        events: EventSender,
        outbound: OutboundSender,
    ) -> Self {
        let session = Session::new(config.url());
        Self {
            config,
            session,
            messages: MessageLog::new(),
            hooks,
            pending: PendingRequests::new(),
            loop_fn,
            loop_timer: None,
            loop_failed: false,
            sweep_timer: None,
            quit_timer: None,
            events,
            outbound,
            terminal: Box::new(std::io::stdout()),
        }
    }

    /// Send terminal output to `out` instead of stdout.
    #[must_use]
    pub fn with_terminal(mut self, out: impl Write + Send + 'static) -> Self {
        self.terminal = Box::new(out);
        self
    }

    /// Arm the periodic timers. Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        match (self.config.options.loop_period(), self.loop_fn.is_some()) {
            (Some(period), true) => {
                log::info!("[Client] Loop function ticking every {period:?}");
                self.loop_timer = Some(Timer::every(
                    "loop",
                    period,
                    self.events.clone(),
                    || ClientEvent::CallLoop,
                ));
            }
            (None, true) => log::warn!("[Client] Loop function given without a frequency; not ticking"),
            (Some(_), false) => log::debug!("[Client] Loop frequency set but no loop function"),
            (None, false) => {}
        }

        self.sweep_timer = Some(Timer::every(
            "sweep",
            SWEEP_INTERVAL,
            self.events.clone(),
            || ClientEvent::Sweep,
        ));
    }

    /// Received frames so far.
    #[must_use]
    pub fn messages(&self) -> &MessageLog {
        &self.messages
    }

    /// Session state and request ids.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Queries still waiting for a reply.
    #[must_use]
    pub fn pending(&self) -> &PendingRequests {
        &self.pending
    }

    /// Returns `true` while the loop timer is active.
    #[must_use]
    pub fn loop_running(&self) -> bool {
        self.loop_timer.is_some()
    }

    /// Handle one event.
    ///
    /// # Errors
    ///
    /// Returns an error only for fatal conditions (an outbound payload that
    /// cannot be serialized). Everything else is logged and handled.
    pub fn handle_event(&mut self, event: ClientEvent) -> Result<Flow> {
        match event {
            ClientEvent::Registered(channel) => self.on_registered(channel),
            ClientEvent::WsRead(frame) => Ok(self.on_frame(frame)),
            ClientEvent::StdinRead(line) => self.on_line(&line),
            ClientEvent::CallLoop => {
                self.on_loop_tick();
                Ok(Flow::Continue)
            }
            ClientEvent::DataQuery(query) => {
                self.on_data_query(query)?;
                Ok(Flow::Continue)
            }
            ClientEvent::Transmit(payload) => {
                self.transmit(&payload)?;
                Ok(Flow::Continue)
            }
            ClientEvent::Sweep => {
                self.on_sweep();
                Ok(Flow::Continue)
            }
            ClientEvent::Disconnected { code, reason } => {
                log::error!("[Client] Connection to {} lost ({code}: {reason})", self.session.url());
                self.session.transition(SessionState::Closed);
                Ok(Flow::Exit(ExitReason::Disconnected))
            }
            ClientEvent::Quit => {
                log::info!("[Client] Quitting");
                self.session.transition(SessionState::Closed);
                let reason = if self.loop_failed {
                    ExitReason::LoopFailed
                } else {
                    ExitReason::Quit
                };
                Ok(Flow::Exit(reason))
            }
        }
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    fn on_registered(&mut self, channel: Channel) -> Result<Flow> {
        if channel != Channel::Ws {
            log::info!("[Client] {channel} registered");
            return Ok(Flow::Continue);
        }
        if self.session.login_sent() {
            log::warn!("[Client] Transport registered again; login already sent, not repeating");
            return Ok(Flow::Continue);
        }

        self.session.transition(SessionState::ConnectedUnauth);
        self.send_raw(String::new());
        self.transmit(&Envelope::login(
            &self.config.username,
            &self.config.password,
        ))?;
        self.session.transition(SessionState::Authenticated);
        log::info!(
            "[Client] Connected to {}, logged in as {}",
            self.session.url(),
            self.config.username
        );
        Ok(Flow::Continue)
    }

    /// Serialize `payload` and queue it on the transport.
    fn transmit<T: Serialize>(&self, payload: &T) -> Result<()> {
        let text = serde_json::to_string(payload).context("Failed to serialize outbound payload")?;
        self.send_raw(text);
        Ok(())
    }

    fn send_raw(&self, text: String) {
        log::debug!("[Client] -> {}", preview(&text, self.config.options.preview_length));
        if self.outbound.send(text).is_err() {
            log::warn!("[Client] Transport writer is gone; frame dropped");
        }
    }

    fn fire(&self, event: ClientEvent) {
        if self.events.send(event).is_err() {
            log::debug!("[Client] Event loop stopped; event dropped");
        }
    }

    fn schedule_quit(&mut self, delay: std::time::Duration, why: &str) {
        if self.quit_timer.is_some() {
            log::info!("[Client] {why}; shutdown already scheduled");
            return;
        }
        log::info!("[Client] {why}; exiting in {}s", delay.as_secs_f32());
        self.quit_timer = Some(Timer::after("quit", delay, self.events.clone(), ClientEvent::Quit));
    }

    // ------------------------------------------------------------------
    // Inbound frames
    // ------------------------------------------------------------------

    fn on_frame(&mut self, frame: String) -> Flow {
        let position = self.messages.push(frame.as_str());

        let value: Value = match serde_json::from_str(&frame) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("[Client] Message #{position} is not valid JSON: {e}");
                return Flow::Continue;
            }
        };

        if let Ok(envelope) = Envelope::<Value>::deserialize(&value) {
            if envelope.is_auth_failure() {
                log::error!(
                    "[Client] Login as {} rejected by {}; check credentials and URL",
                    self.config.username,
                    self.session.url()
                );
                self.session.transition(SessionState::Failed);
                self.session.transition(SessionState::Closed);
                return Flow::Exit(ExitReason::AuthFailed);
            }

            if let Some(request) = envelope.request_id().and_then(|req| self.pending.resolve(req)) {
                log::info!(
                    "[Client] Reply to request {} ({}) after {:?}",
                    request.req,
                    request.schema,
                    now().saturating_duration_since(request.issued_at)
                );
            }
        }

        self.display(&format!(
            "#{position} {}",
            preview(&frame, self.config.options.preview_length)
        ));
        Flow::Continue
    }

    /// Show `text` on the terminal unless stdout is suppressed.
    fn display(&mut self, text: &str) {
        if self.config.options.suppress_stdout {
            log::debug!("[Client] {text}");
        } else if let Err(e) = writeln!(self.terminal, "{text}") {
            log::warn!("[Client] Terminal write failed: {e}");
        }
    }

    // ------------------------------------------------------------------
    // Command interpreter
    // ------------------------------------------------------------------

    fn on_line(&mut self, raw: &Bytes) -> Result<Flow> {
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line.trim(),
            Err(e) => {
                log::warn!("[Client] Ignoring input that is not UTF-8: {e}");
                return Ok(Flow::Continue);
            }
        };

        match parse_line(line) {
            Line::Empty => log::info!("[Client] Type /help for a list of commands"),
            Line::Text(_) => log::info!("[Client] Commands start with '/'; type /help for a list"),
            Line::Command(cmd) => self.run_command(&cmd)?,
        }
        Ok(Flow::Continue)
    }

    /// Run built-in and hook for `cmd`; a name that is both runs both.
    fn run_command(&mut self, cmd: &CommandLine) -> Result<()> {
        let builtin = Builtin::from_name(&cmd.name);
        if let Some(builtin) = builtin {
            self.run_builtin(builtin, cmd)?;
        }

        match self.hooks.get(&cmd.name) {
            Some(hook) => match hook.build(&cmd.args) {
                Ok(event) => {
                    log::debug!("[Client] Hook /{} fired", hook.name());
                    self.fire(event);
                }
                Err(e) => log::warn!("[Client] Hook /{} failed: {e:#}", hook.name()),
            },
            None if builtin.is_none() => log::debug!("[Client] Unknown command /{}", cmd.name),
            None => {}
        }
        Ok(())
    }

    fn run_builtin(&mut self, builtin: Builtin, cmd: &CommandLine) -> Result<()> {
        match builtin {
            Builtin::Send => {
                let raw = cmd.tail();
                match serde_json::from_str::<Value>(&raw) {
                    Ok(_) => self.send_raw(raw),
                    Err(e) => log::warn!("[Client] /send needs valid JSON ({e}); nothing sent"),
                }
            }
            Builtin::History => match self.history_entry(&cmd.args) {
                Ok(entry) => self.display(&entry),
                Err(e) => log::error!("[Client] /history: {e:#}"),
            },
            Builtin::Test => self.fire(ClientEvent::DataQuery(DataQuery::new(
                "user",
                json!({ "name": "riot" }),
            ))),
            Builtin::Quit => self.schedule_quit(QUIT_DELAY, "Quit requested"),
            Builtin::Help => {
                let help = self.help_text();
                self.display(&help);
            }
        }
        Ok(())
    }

    /// Text of the logged frame selected by `/history` arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the position is missing, not an integer, or
    /// outside the log.
    pub fn history_entry(&self, args: &[String]) -> Result<String> {
        let position = args
            .first()
            .context("usage: /history <position> [-p]")?;
        let position: i64 = position
            .parse()
            .with_context(|| format!("invalid position {position:?}"))?;
        let pretty = args.iter().skip(1).any(|arg| arg == "-p");

        let frame = self.messages.lookup(position)?;
        if pretty {
            if let Ok(value) = serde_json::from_str::<Value>(frame) {
                return serde_json::to_string_pretty(&value).context("Failed to format message");
            }
        }
        Ok(frame.to_string())
    }

    /// Usage lines for built-ins and registered hooks.
    #[must_use]
    pub fn help_text(&self) -> String {
        let mut lines: Vec<String> = Builtin::ALL.iter().map(|b| b.usage().to_string()).collect();
        if !self.hooks.is_empty() {
            lines.push("Hooks:".to_string());
            lines.extend(
                self.hooks
                    .iter()
                    .map(|hook| format!("/{:<18} ({})", hook.name(), hook.arity())),
            );
        }
        lines.join("\n")
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    fn on_data_query(&mut self, query: DataQuery) -> Result<()> {
        let req = self.session.take_request_id();
        self.transmit(&Envelope::search(&query.schema, query.filter.clone(), req))?;
        log::debug!("[Client] Request {req}: search {}", query.schema);
        self.pending.insert(PendingRequest {
            req,
            schema: query.schema,
            filter: query.filter,
            issued_at: now(),
        });
        Ok(())
    }

    fn on_sweep(&mut self) {
        let timeout = self.config.options.request_timeout();
        for request in self.pending.expire(now(), timeout) {
            log::warn!(
                "[Client] Request {} ({} {}) got no reply within {timeout:?}",
                request.req,
                request.schema,
                request.filter
            );
        }
    }

    // ------------------------------------------------------------------
    // Loop function
    // ------------------------------------------------------------------

    fn on_loop_tick(&mut self) {
        if self.loop_timer.is_none() {
            log::debug!("[Client] Ignoring loop tick, loop is stopped");
            return;
        }
        let Some(loop_fn) = self.loop_fn.as_mut() else {
            return;
        };

        if let Err(e) = loop_fn() {
            log::error!("[Client] Loop function failed: {e:#}");
            if let Some(timer) = self.loop_timer.take() {
                timer.cancel();
            }
            self.loop_failed = true;
            self.schedule_quit(LOOP_FAILURE_QUIT_DELAY, "Loop stopped");
        }
    }
}

/// Current time on the tokio clock (pausable in tests).
fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{self, EventReceiver};
    use crate::hooks::{Arity, HookCommand};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc::UnboundedReceiver;

    /// Terminal stand-in that keeps everything written to it.
    #[derive(Clone, Default)]
    struct Screen(Arc<Mutex<Vec<u8>>>);

    impl Write for Screen {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct Harness {
        client: Client,
        events: EventReceiver,
        outbound: UnboundedReceiver<String>,
        screen: Screen,
    }

    impl Harness {
        fn new() -> Self {
            Self::with(ClientConfig::default(), HookTable::new(), None)
        }

        fn with(config: ClientConfig, hooks: HookTable, loop_fn: Option<LoopFn>) -> Self {
            let (events_tx, events) = events::channel();
            let (outbound_tx, outbound) = mpsc::unbounded_channel();
            let screen = Screen::default();
            let client = Client::new(config, hooks, loop_fn, events_tx, outbound_tx)
                .with_terminal(screen.clone());
            Self {
                client,
                events,
                outbound,
                screen,
            }
        }

        fn screen(&self) -> String {
            String::from_utf8(self.screen.0.lock().unwrap().clone()).unwrap()
        }

        fn handle(&mut self, event: ClientEvent) -> Flow {
            self.client.handle_event(event).unwrap()
        }

        fn type_line(&mut self, line: &str) -> Flow {
            self.handle(ClientEvent::StdinRead(Bytes::copy_from_slice(line.as_bytes())))
        }

        fn receive(&mut self, frame: &str) -> Flow {
            self.handle(ClientEvent::WsRead(frame.to_string()))
        }

        /// Hand queued internal events back to the client.
        fn pump(&mut self) {
            while let Ok(event) = self.events.try_recv() {
                self.handle(event);
            }
        }

        fn sent(&mut self) -> Vec<String> {
            let mut frames = Vec::new();
            while let Ok(frame) = self.outbound.try_recv() {
                frames.push(frame);
            }
            frames
        }
    }

    fn alice() -> ClientConfig {
        ClientConfig {
            username: "alice".to_string(),
            password: "pw".to_string(),
            ..ClientConfig::default()
        }
    }

    #[test]
    fn test_registered_ws_sends_primer_then_login() {
        let mut h = Harness::with(alice(), HookTable::new(), None);
        assert_eq!(h.handle(ClientEvent::Registered(Channel::Ws)), Flow::Continue);

        let sent = h.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], "");
        assert_eq!(
            sent[1],
            r#"{"component":"auth","action":"login","data":{"username":"alice","password":"pw"}}"#
        );
        assert_eq!(h.client.session().state(), SessionState::Authenticated);
    }

    #[test]
    fn test_registered_other_channel_is_ignored() {
        let mut h = Harness::new();
        h.handle(ClientEvent::Registered(Channel::Stdin));
        assert!(h.sent().is_empty());
        assert_eq!(h.client.session().state(), SessionState::Unconnected);
    }

    #[test]
    fn test_second_registration_does_not_repeat_login() {
        let mut h = Harness::with(alice(), HookTable::new(), None);
        h.handle(ClientEvent::Registered(Channel::Ws));
        assert_eq!(h.sent().len(), 2);

        h.handle(ClientEvent::Registered(Channel::Ws));
        assert!(h.sent().is_empty());
    }

    #[test]
    fn test_frames_are_logged_in_arrival_order() {
        let mut h = Harness::new();
        for frame in ["A", "{\"component\":\"x\",\"action\":\"y\"}", "not json {"] {
            assert_eq!(h.receive(frame), Flow::Continue);
            assert_eq!(h.client.messages().last(), Some(frame));
        }
        assert_eq!(h.client.messages().len(), 3);
    }

    #[test]
    fn test_auth_failure_exits_with_frame_logged() {
        let mut h = Harness::with(alice(), HookTable::new(), None);
        h.handle(ClientEvent::Registered(Channel::Ws));

        let flow = h.receive(r#"{"component":"isomer.auth","action":"fail"}"#);
        assert_eq!(flow, Flow::Exit(ExitReason::AuthFailed));
        assert_eq!(h.client.messages().len(), 1);
        assert_eq!(h.client.session().state(), SessionState::Closed);
        assert_ne!(ExitReason::AuthFailed.exit_code(), 0);
    }

    #[test]
    fn test_history_is_zero_based() {
        let mut h = Harness::new();
        for frame in ["A", "B", "C"] {
            h.receive(frame);
        }
        assert_eq!(h.client.history_entry(&["1".to_string()]).unwrap(), "B");
        assert_eq!(h.client.history_entry(&["-1".to_string()]).unwrap(), "C");

        // Errors keep the session going
        assert!(h.client.history_entry(&["3".to_string()]).is_err());
        assert!(h.client.history_entry(&["x".to_string()]).is_err());
        assert!(h.client.history_entry(&[]).is_err());
        assert_eq!(h.type_line("/history 7"), Flow::Continue);
    }

    #[test]
    fn test_history_pretty_flag() {
        let mut h = Harness::new();
        h.receive(r#"{"component":"a","action":"b"}"#);
        let pretty = h
            .client
            .history_entry(&["0".to_string(), "-p".to_string()])
            .unwrap();
        assert!(pretty.contains('\n'));
        assert!(pretty.contains("\"component\": \"a\""));
    }

    #[test]
    fn test_send_writes_raw_text() {
        let mut h = Harness::new();
        let raw = r#"{"component": "x",   "action": "y", "data": {}}"#;
        h.type_line(&format!("/send {raw}"));
        assert_eq!(h.sent(), vec![raw.to_string()]);

        h.type_line(r#"/S [1,2]"#);
        assert_eq!(h.sent(), vec!["[1,2]".to_string()]);
    }

    #[test]
    fn test_send_invalid_json_is_not_sent() {
        let mut h = Harness::new();
        assert_eq!(h.type_line("/send {broken"), Flow::Continue);
        assert!(h.sent().is_empty());
    }

    #[test]
    fn test_non_command_lines_send_nothing() {
        let mut h = Harness::new();
        for line in ["", "   ", "hello", "send {}", "\n"] {
            assert_eq!(h.type_line(line), Flow::Continue);
        }
        h.pump();
        assert!(h.sent().is_empty());
    }

    #[test]
    fn test_invalid_utf8_input_is_ignored() {
        let mut h = Harness::new();
        let flow = h.handle(ClientEvent::StdinRead(Bytes::from_static(&[b'/', 0xff, 0xfe])));
        assert_eq!(flow, Flow::Continue);
        assert!(h.sent().is_empty());
    }

    #[test]
    fn test_test_command_issues_typed_query() {
        let mut h = Harness::new();
        h.type_line("/test");
        // The query is fired as an event, not written directly
        assert!(h.sent().is_empty());
        h.pump();

        let sent = h.sent();
        assert_eq!(sent.len(), 1);
        let value: Value = serde_json::from_str(&sent[0]).unwrap();
        assert_eq!(
            value,
            json!({
                "component": "isomer.events.objectmanager",
                "action": "search",
                "data": {"schema": "user", "search": {"name": "riot"}, "req": 0}
            })
        );
        assert_eq!(h.client.pending().len(), 1);
    }

    #[test]
    fn test_request_ids_increase() {
        let mut h = Harness::new();
        for _ in 0..3 {
            h.handle(ClientEvent::DataQuery(DataQuery::new("user", json!({}))));
        }
        let reqs: Vec<u64> = h
            .sent()
            .iter()
            .map(|frame| serde_json::from_str::<Value>(frame).unwrap()["data"]["req"].as_u64().unwrap())
            .collect();
        assert_eq!(reqs, vec![0, 1, 2]);
    }

    #[test]
    fn test_reply_resolves_pending_request() {
        let mut h = Harness::new();
        h.handle(ClientEvent::DataQuery(DataQuery::new("user", json!({}))));
        assert_eq!(h.client.pending().len(), 1);

        h.receive(r#"{"component":"isomer.events.objectmanager","action":"search","data":{"req":0,"list":[]}}"#);
        assert!(h.client.pending().is_empty());
        assert_eq!(h.client.messages().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_expires_unanswered_requests() {
        let mut h = Harness::new();
        h.handle(ClientEvent::DataQuery(DataQuery::new("user", json!({}))));

        h.handle(ClientEvent::Sweep);
        assert_eq!(h.client.pending().len(), 1);

        tokio::time::advance(std::time::Duration::from_secs(31)).await;
        h.handle(ClientEvent::Sweep);
        assert!(h.client.pending().is_empty());
    }

    #[test]
    fn test_hook_fires_event() {
        let mut hooks = HookTable::new();
        hooks
            .register(HookCommand::new("find", Arity::Exact(2), |args| {
                Ok(ClientEvent::DataQuery(DataQuery::new(
                    args[0].clone(),
                    json!({ "name": args[1] }),
                )))
            }))
            .unwrap();
        let mut h = Harness::with(ClientConfig::default(), hooks, None);

        h.type_line("/FIND location home");
        h.pump();
        let sent = h.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains(r#""schema":"location""#));
        assert!(sent[0].contains(r#""search":{"name":"home"}"#));

        // Wrong arity: nothing fires
        h.type_line("/find location");
        h.pump();
        assert!(h.sent().is_empty());
    }

    #[test]
    fn test_hook_colliding_with_builtin_both_fire() {
        let mut hooks = HookTable::new();
        hooks
            .register(HookCommand::new("send", Arity::Any, |_| {
                Ok(ClientEvent::Transmit(json!({"hooked": true})))
            }))
            .unwrap();
        let mut h = Harness::with(ClientConfig::default(), hooks, None);

        h.type_line("/send [1]");
        h.pump();
        assert_eq!(h.sent(), vec!["[1]".to_string(), r#"{"hooked":true}"#.to_string()]);
    }

    #[test]
    fn test_unknown_command_is_ignored() {
        let mut h = Harness::new();
        assert_eq!(h.type_line("/frobnicate now"), Flow::Continue);
        h.pump();
        assert!(h.sent().is_empty());
    }

    #[test]
    fn test_help_lists_hooks() {
        let mut hooks = HookTable::new();
        hooks
            .register(HookCommand::new("bye", Arity::Exact(0), |_| Ok(ClientEvent::Quit)))
            .unwrap();
        let h = Harness::with(ClientConfig::default(), hooks, None);
        let help = h.client.help_text();
        assert!(help.contains("/history"));
        assert!(help.contains("/bye"));
        assert!(help.contains("0 args"));
    }

    #[test]
    fn test_command_output_goes_to_terminal() {
        let mut h = Harness::new();
        h.receive(r#"{"component":"a","action":"b"}"#);
        h.type_line("/history 0");
        h.type_line("/help");

        // Once as the arrival preview, once from /history
        let screen = h.screen();
        assert_eq!(screen.matches(r#"{"component":"a","action":"b"}"#).count(), 2);
        assert!(screen.contains("/help              show this list"));
    }

    #[test]
    fn test_suppressed_stdout_hides_command_output() {
        let mut config = ClientConfig::default();
        config.options.suppress_stdout = true;
        let mut h = Harness::with(config, HookTable::new(), None);
        h.receive(r#"{"component":"a","action":"b"}"#);
        h.type_line("/history 0");
        h.type_line("/help");

        assert_eq!(h.screen(), "");
        assert_eq!(h.client.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_start_skips_loop_with_unrepresentable_period() {
        for hz in [1e-300, 1e300] {
            let mut config = ClientConfig::default();
            config.options.loop_frequency = Some(hz);
            let loop_fn: LoopFn = Box::new(|| Ok(()));
            let mut h = Harness::with(config, HookTable::new(), Some(loop_fn));
            h.client.start();
            assert!(!h.client.loop_running(), "{hz} Hz");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_is_delayed() {
        let mut h = Harness::new();
        let start = tokio::time::Instant::now();
        assert_eq!(h.type_line("/quit"), Flow::Continue);

        let event = h.events.recv().await.unwrap();
        assert!(matches!(event, ClientEvent::Quit));
        assert!(start.elapsed() >= QUIT_DELAY);
        assert_eq!(h.handle(event), Flow::Exit(ExitReason::Quit));
        assert_eq!(h.client.session().state(), SessionState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_failure_stops_timer_and_quits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let loop_fn: LoopFn = Box::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 2 {
                anyhow::bail!("third call fails");
            }
            Ok(())
        });
        let mut config = ClientConfig::default();
        config.options.loop_frequency = Some(10.0);
        let mut h = Harness::with(config, HookTable::new(), Some(loop_fn));
        h.client.start();
        let start = tokio::time::Instant::now();

        let reason = loop {
            let event = h.events.recv().await.unwrap();
            if let Flow::Exit(reason) = h.handle(event) {
                break reason;
            }
        };

        assert_eq!(reason, ExitReason::LoopFailed);
        assert_eq!(reason.exit_code(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!h.client.loop_running());
        let elapsed = start.elapsed();
        assert!(elapsed >= std::time::Duration::from_millis(2300));
        assert!(elapsed < std::time::Duration::from_millis(2400));
    }

    #[test]
    fn test_disconnect_exits() {
        let mut h = Harness::new();
        let flow = h.handle(ClientEvent::Disconnected {
            code: 1006,
            reason: "stream ended".to_string(),
        });
        assert_eq!(flow, Flow::Exit(ExitReason::Disconnected));
        assert_eq!(h.client.session().state(), SessionState::Closed);
    }
}
