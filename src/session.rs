//! Session state for one client run.
//!
//! Tracks the authentication state machine and hands out request ids.
//!
//! ```text
//! Unconnected ─registered(ws)─▶ ConnectedUnauth ─login sent─▶ Authenticated
//! Authenticated ─auth.fail─▶ Failed ─▶ Closed
//! any ─quit / disconnect─▶ Closed
//! ```

/// Authentication state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport not registered yet.
    Unconnected,
    /// Transport up, login not sent yet.
    ConnectedUnauth,
    /// Login sent; success is implied until a failure frame arrives.
    Authenticated,
    /// Server rejected the login.
    Failed,
    /// Session is over.
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unconnected => write!(f, "unconnected"),
            Self::ConnectedUnauth => write!(f, "connected-unauth"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::Failed => write!(f, "failed"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Per-run session data.
#[derive(Debug)]
pub struct Session {
    url: String,
    state: SessionState,
    next_request_id: u64,
}

impl Session {
    /// Create an unconnected session for `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: SessionState::Unconnected,
            next_request_id: 0,
        }
    }

    /// Server URL of this session.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move to `next`, logging the transition.
    pub fn transition(&mut self, next: SessionState) {
        if self.state != next {
            log::debug!("[Session] {} -> {}", self.state, next);
            self.state = next;
        }
    }

    /// Returns `true` once the login has been sent (or the session ended).
    #[must_use]
    pub fn login_sent(&self) -> bool {
        matches!(
            self.state,
            SessionState::Authenticated | SessionState::Failed | SessionState::Closed
        )
    }

    /// Take the next request id. Ids start at 0 and never repeat.
    pub fn take_request_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }
}
