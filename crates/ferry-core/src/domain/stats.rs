use serde::{Deserialize, Serialize};

use super::item::QueueItem;

/// Derived, read-only counters over the current queue contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Everything still in the queue.
    pub pending: usize,
    /// Items that failed at least once.
    pub retrying: usize,
    /// Items at or over the retry ceiling (no longer attempted).
    pub exhausted: usize,
}

impl QueueStats {
    pub fn from_items(items: &[QueueItem], max_retries: u32) -> Self {
        let mut stats = QueueStats {
            pending: items.len(),
            ..Default::default()
        };
        for item in items {
            if item.is_retrying() {
                stats.retrying += 1;
            }
            if item.is_exhausted(max_retries) {
                stats.exhausted += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ItemId, SyncKind};
    use chrono::Utc;

    #[test]
    fn counts_pending_retrying_and_exhausted() {
        let mut items: Vec<QueueItem> = (0..4)
            .map(|i| {
                QueueItem::new(
                    ItemId::from(format!("GENERIC_SYNC_{i}")),
                    SyncKind::Generic,
                    serde_json::Value::Null,
                    Utc::now(),
                )
            })
            .collect();
        items[1].retry_count = 1;
        items[2].retry_count = 3;

        let stats = QueueStats::from_items(&items, 3);
        assert_eq!(
            stats,
            QueueStats {
                pending: 4,
                retrying: 2,
                exhausted: 1
            }
        );
    }
}
