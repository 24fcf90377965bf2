//! Update payloads and the offset cursor.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One inbound update from the Bot API.
///
/// Only `update_id` is interpreted. Every other field is kept verbatim in
/// `body` so the object forwarded downstream is the one Telegram sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,

    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl Update {
    /// Creates an update with an empty body.
    pub fn new(update_id: i64) -> Self {
        Self {
            update_id,
            body: Map::new(),
        }
    }

    /// Adds a body field, builder style.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.body.insert(key.into(), value);
        self
    }
}

/// Returns the highest `update_id` in a batch, or `None` for an empty batch.
///
/// Batches are not guaranteed to be sorted, so the whole slice is scanned.
pub fn max_update_id(updates: &[Update]) -> Option<i64> {
    updates.iter().map(|u| u.update_id).max()
}

/// The `getUpdates` offset watermark.
///
/// Starts unset, meaning "from the beginning of the server's retention
/// window". Once set it never moves backwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Cursor(Option<i64>);

impl Cursor {
    pub const UNSET: Cursor = Cursor(None);

    /// A cursor positioned at `offset`.
    pub fn at(offset: i64) -> Self {
        Self(Some(offset))
    }

    /// The offset to send with the next fetch, if any.
    pub fn offset(self) -> Option<i64> {
        self.0
    }

    pub fn is_unset(self) -> bool {
        self.0.is_none()
    }

    /// Computes the cursor after a batch whose highest id is `max_id`.
    ///
    /// Moves to `max_id + 1` when the cursor is unset or `max_id` is at or
    /// past it; otherwise (empty batch, or only redelivered ids below the
    /// cursor) stays put.
    pub fn advance(self, max_id: Option<i64>) -> Self {
        match (self.0, max_id) {
            (None, Some(max)) => Self(Some(max.saturating_add(1))),
            (Some(current), Some(max)) if max >= current => Self(Some(max.saturating_add(1))),
            _ => self,
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(offset) => write!(f, "{offset}"),
            None => f.write_str("unset"),
        }
    }
}
