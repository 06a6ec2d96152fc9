//! Queue item: one buffered unit of offline work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::ItemId;
use super::kind::ItemKind;

/// A record in the persisted queue.
///
/// Design:
/// - `id`, `kind`, `payload` and `enqueued_at` never change after creation.
/// - `retry_count` only moves up, and only through the queue manager.
/// - Field names follow the persisted layout (`type`, `data`, `timestamp`, `retryCount`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: ItemId,

    #[serde(rename = "type")]
    pub kind: ItemKind,

    /// Opaque to the queue; interpreted by the dispatcher per `kind`.
    #[serde(rename = "data")]
    pub payload: serde_json::Value,

    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub enqueued_at: DateTime<Utc>,

    #[serde(rename = "retryCount", default)]
    pub retry_count: u32,

    /// Message of the most recent failed attempt (if any).
    #[serde(rename = "lastError", default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl QueueItem {
    pub fn new(
        id: ItemId,
        kind: impl Into<ItemKind>,
        payload: serde_json::Value,
        enqueued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind: kind.into(),
            payload,
            enqueued_at,
            retry_count: 0,
            last_error: None,
        }
    }

    /// Has this item reached the retry ceiling?
    pub fn is_exhausted(&self, max_retries: u32) -> bool {
        self.retry_count >= max_retries
    }

    /// Has this item failed at least once?
    pub fn is_retrying(&self) -> bool {
        self.retry_count > 0
    }

    /// Record a failed attempt.
    pub fn record_failure(&mut self, error: String) {
        self.retry_count = self.retry_count.saturating_add(1);
        self.last_error = Some(error);
    }

    /// Record a failure that can never succeed: jump straight to the ceiling.
    ///
    /// Never lowers `retry_count`.
    pub fn park(&mut self, max_retries: u32, error: String) {
        self.retry_count = self.retry_count.max(max_retries);
        self.last_error = Some(error);
    }
}
