//! Correlation of data queries with their replies.
//!
//! Each issued query is recorded under its request id. A reply whose
//! `data.req` matches resolves the entry; entries that stay unanswered
//! longer than the request timeout are expired by the periodic sweep.
//! Replies are displayed through the normal inbound path either way.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde_json::Value;

/// A query awaiting its reply.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    /// Request id sent in `data.req`.
    pub req: u64,
    /// Schema that was searched.
    pub schema: String,
    /// Filter that was sent.
    pub filter: Value,
    /// When the request was transmitted.
    pub issued_at: Instant,
}

/// Outstanding requests keyed by id.
#[derive(Debug, Default)]
pub struct PendingRequests {
    entries: BTreeMap<u64, PendingRequest>,
}

impl PendingRequests {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transmitted request.
    pub fn insert(&mut self, request: PendingRequest) {
        self.entries.insert(request.req, request);
    }

    /// Remove and return the request answered by `req`.
    pub fn resolve(&mut self, req: u64) -> Option<PendingRequest> {
        self.entries.remove(&req)
    }

    /// Remove every request issued more than `timeout` before `now`.
    pub fn expire(&mut self, now: Instant, timeout: Duration) -> Vec<PendingRequest> {
        let expired: Vec<u64> = self
            .entries
            .values()
            .filter(|r| now.saturating_duration_since(r.issued_at) > timeout)
            .map(|r| r.req)
            .collect();

        expired
            .into_iter()
            .filter_map(|req| self.entries.remove(&req))
            .collect()
    }

    /// Number of outstanding requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
