//! In-memory log of received frames.
//!
//! Frames are stored verbatim in arrival order and addressed by zero-based
//! position. The log only grows; it is bounded by process memory.

use anyhow::{bail, Result};

use crate::constants::ELLIPSIS;

/// Append-only sequence of raw inbound frames.
#[derive(Debug, Default, Clone)]
pub struct MessageLog {
    frames: Vec<String>,
}

impl MessageLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame and return its position.
    pub fn push(&mut self, frame: impl Into<String>) -> usize {
        self.frames.push(frame.into());
        self.frames.len() - 1
    }

    /// Number of stored frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Check if no frame has been received yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame at a zero-based position.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.frames.get(index).map(String::as_str)
    }

    /// Most recently received frame.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.frames.last().map(String::as_str)
    }

    /// Resolve a user-supplied position.
    ///
    /// Non-negative positions count from the start, negative ones from the
    /// end (`-1` is the latest frame).
    ///
    /// # Errors
    ///
    /// Returns an error if the position is outside the log.
    pub fn lookup(&self, position: i64) -> Result<&str> {
        let len = self.frames.len();
        let index = if position < 0 {
            usize::try_from(position.unsigned_abs())
                .ok()
                .and_then(|back| len.checked_sub(back))
        } else {
            usize::try_from(position).ok().filter(|&i| i < len)
        };

        match index.and_then(|i| self.get(i)) {
            Some(frame) => Ok(frame),
            None => bail!("no message at position {position} (log holds {len})"),
        }
    }

    /// Iterate frames in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.frames.iter().map(String::as_str)
    }
}

/// Shorten `text` to at most `limit` characters, marking the cut.
///
/// Counts `char`s rather than bytes so multi-byte text is never split.
#[must_use]
pub fn preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}
