//! Application-wide constants for isomer-client.
//!
//! Centralizes protocol strings, defaults and timer durations so the
//! client, config and runtime agree on them.
//!
//! # Categories
//!
//! - **Connection**: URL defaults
//! - **Protocol**: Envelope component/action names
//! - **Timers**: Quit delays and housekeeping intervals
//! - **Display**: Frame preview settings

use std::time::Duration;

// ============================================================================
// Connection
// ============================================================================

/// Default host when none is configured.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8055;

/// Default URL path segment of the WebSocket endpoint.
pub const DEFAULT_PATH: &str = "websocket";

/// Username that never triggers the interactive password prompt.
///
/// Compared as an exact string; other anonymous-looking names still prompt.
pub const ANONYMOUS_USER: &str = "anonymous";

// ============================================================================
// Protocol
// ============================================================================

/// Component addressed by the login envelope.
pub const AUTH_COMPONENT: &str = "auth";

/// Action of the login envelope.
pub const LOGIN_ACTION: &str = "login";

/// Component of inbound authentication replies.
pub const AUTH_REPLY_COMPONENT: &str = "isomer.auth";

/// Action signalling a rejected login.
pub const AUTH_FAIL_ACTION: &str = "fail";

/// Component that serves object searches.
pub const OBJECT_MANAGER_COMPONENT: &str = "isomer.events.objectmanager";

/// Action of an object search.
pub const SEARCH_ACTION: &str = "search";

// ============================================================================
// Timers
// ============================================================================

/// Delay between `/quit` and the actual shutdown.
///
/// Lets in-flight output flush; events arriving in the window are still handled.
pub const QUIT_DELAY: Duration = Duration::from_secs(3);

/// Delay between a failing loop function and shutdown.
pub const LOOP_FAILURE_QUIT_DELAY: Duration = Duration::from_secs(2);

/// Interval of the pending-request sweep.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Default lifetime of an unanswered data query.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Grace period for the writer task to flush and close on shutdown.
pub const WRITER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// ============================================================================
// Display
// ============================================================================

/// Default number of characters shown when previewing a frame.
pub const DEFAULT_PREVIEW_LENGTH: usize = 100;

/// Marker appended to truncated previews.
pub const ELLIPSIS: &str = "...";
