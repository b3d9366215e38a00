//! Unified event channel for the client dispatch loop.
//!
//! All producers (WebSocket reader, stdin reader, timers, hooks) send
//! events through a single `mpsc::UnboundedSender<ClientEvent>`. The
//! dispatch loop receives on the matching receiver and hands each event to
//! [`Client::handle_event`](crate::client::Client::handle_event).

use bytes::Bytes;
use serde_json::Value;
use tokio::sync::mpsc;

/// Logical channel a producer is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// WebSocket transport.
    Ws,
    /// Terminal line source.
    Stdin,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ws => write!(f, "ws"),
            Self::Stdin => write!(f, "stdin"),
        }
    }
}

/// Typed search against the server's object manager.
#[derive(Debug, Clone, PartialEq)]
pub struct DataQuery {
    /// Schema of the searched objects.
    pub schema: String,
    /// Filter object.
    pub filter: Value,
}

impl DataQuery {
    /// Create a query for `schema` objects matching `filter`.
    #[must_use]
    pub fn new(schema: impl Into<String>, filter: Value) -> Self {
        Self {
            schema: schema.into(),
            filter,
        }
    }
}

/// Event delivered to the client dispatch loop.
#[derive(Debug)]
pub enum ClientEvent {
    /// A producer finished setting up its channel.
    Registered(Channel),

    /// Text frame received from the WebSocket.
    WsRead(String),

    /// One raw line from the terminal (delimiter stripped).
    StdinRead(Bytes),

    /// Periodic tick for the embedder loop function.
    CallLoop,

    /// Issue an object-manager search.
    DataQuery(DataQuery),

    /// Send an arbitrary JSON payload through the transmit helper.
    Transmit(Value),

    /// Housekeeping tick that expires unanswered requests.
    Sweep,

    /// Transport closed or failed.
    Disconnected {
        /// WebSocket close code (1006 when the stream ended abruptly).
        code: u16,
        /// Close reason or error text.
        reason: String,
    },

    /// Terminate the client.
    Quit,
}

/// Sending half of the event channel.
pub type EventSender = mpsc::UnboundedSender<ClientEvent>;

/// Receiving half of the event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<ClientEvent>;

/// Create a new event channel.
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
