//! Isomer Client - interactive WebSocket shell for Isomer/HFOS servers.
//!
//! The client connects to a server's WebSocket endpoint, logs in, and lets
//! the user drive the session from the terminal with slash commands:
//! sending raw JSON, recalling received messages, issuing object searches,
//! and running embedder-registered hook commands. An optional embedder loop
//! function can be ticked at a fixed frequency.
//!
//! # Architecture
//!
//! The crate follows a single-consumer event loop:
//!
//! - **Transport** ([`ws`]) - WebSocket reader/writer halves
//! - **Events** ([`events`]) - One channel carrying every input to the client
//! - **Client** ([`client`]) - Owns session state, handles one event at a time
//! - **Runtime** ([`run`]) - Spawns producers and runs the dispatch loop
//!
//! # Modules
//!
//! - [`commands`] - Terminal line parsing and built-in commands
//! - [`hooks`] - Embedder-registered commands
//! - [`protocol`] - `{component, action, data}` envelopes
//! - [`config`] - Layered configuration

pub mod client;
pub mod commands;
pub mod config;
pub mod constants;
pub mod events;
pub mod hooks;
pub mod message_log;
pub mod pending;
pub mod protocol;
pub mod run;
pub mod session;
pub mod timer;
pub mod ws;

// Re-export commonly used types
pub use client::{Client, ExitReason, LoopFn};
pub use config::{ClientConfig, ClientOptions, Protocol};
pub use events::{ClientEvent, DataQuery};
pub use hooks::{Arity, HookCommand, HookTable};
pub use protocol::Envelope;
pub use run::ClientBuilder;
