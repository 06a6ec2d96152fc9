//! PersistedQueue - キュー全体を 1 key に保存
//!
//! The whole list lives under a single key as a JSON array, oldest first.
//! There is no per-item storage and no partial update: every write replaces
//! the list.
//!
//! # 読み込みの方針
//! - key が無い → 空リスト
//! - JSON として壊れている → 警告を出して空リスト（元の内容は `<key>.corrupt` に退避）
//! - I/O エラー → [`read`](PersistedQueue::read) は空リスト、
//!   [`load`](PersistedQueue::load) はエラーを返す（上書きで消さないため）
//!
//! 他のプロセスと共有するストアでは、load → write の間 [`lock`](PersistedQueue::lock)
//! を持つこと。

use std::sync::Arc;

use tracing::{error, warn};

use crate::domain::{QueueItem, StorageError};
use crate::ports::{KeyValueStore, StoreLock};

pub const DEFAULT_STORAGE_KEY: &str = "sync_queue";

pub struct PersistedQueue {
    kv: Arc<dyn KeyValueStore>,
    key: String,
}

impl PersistedQueue {
    pub fn new(kv: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current contents. Never fails; any problem reads as an empty queue.
    pub async fn read(&self) -> Vec<QueueItem> {
        match self.load().await {
            Ok(items) => items,
            Err(e) => {
                error!(key = %self.key, error = %e, "failed to read sync queue");
                Vec::new()
            }
        }
    }

    /// Current contents for a read-modify-write.
    ///
    /// Unlike [`read`](Self::read), a storage failure is returned so the caller
    /// does not overwrite a list it could not see.
    pub async fn load(&self) -> Result<Vec<QueueItem>, StorageError> {
        let Some(raw) = self.kv.get(&self.key).await? else {
            return Ok(Vec::new());
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Vec<QueueItem>>(&raw) {
            Ok(items) => Ok(items),
            Err(e) => {
                warn!(key = %self.key, error = %e, "sync queue is unreadable; starting empty");
                self.quarantine(&raw).await;
                Ok(Vec::new())
            }
        }
    }

    /// Exclusive hold on the queue key until the returned lock is dropped.
    pub async fn lock(&self) -> Result<StoreLock, StorageError> {
        self.kv.lock(&self.key).await
    }

    /// Replace the whole list.
    pub async fn write(&self, items: &[QueueItem]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(items)?;
        self.kv.set(&self.key, &raw).await
    }

    /// Remove the key. Clearing an absent queue is fine.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.kv.remove(&self.key).await
    }

    async fn quarantine(&self, raw: &str) {
        let backup = format!("{}.corrupt", self.key);
        if let Err(e) = self.kv.set(&backup, raw).await {
            warn!(key = %backup, error = %e, "failed to keep a copy of the unreadable queue");
        }
    }
}
