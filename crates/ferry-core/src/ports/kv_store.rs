//! KeyValueStore port - 永続 key-value ストレージ
//!
//! The queue only needs get/set/remove of text values by key. Whatever the
//! platform offers (a file, a preferences store, SQLite) is wrapped behind this.
//!
//! # 実装
//! - **MemoryStore**: テスト・開発用
//! - **FileStore**: key ごとに 1 ファイル、プロセス間ロックあり
//!
//! # ロック
//! 同じストレージを複数のプロセスが共有できる実装は [`KeyValueStore::lock`] を
//! 実装する。キューは「読む → 変更 → 書く」の間ずっとこのロックを持つ。

use std::any::Any;

use async_trait::async_trait;

use crate::domain::StorageError;

/// Exclusive hold on a key across a read-modify-write.
///
/// Dropping it releases the lock.
pub struct StoreLock {
    _held: Option<Box<dyn Any + Send + Sync>>,
}

impl StoreLock {
    /// For stores that only one process ever touches.
    pub fn unshared() -> Self {
        Self { _held: None }
    }

    /// Keep `held` alive until the lock is dropped.
    pub fn holding(held: impl Any + Send + Sync) -> Self {
        Self {
            _held: Some(Box::new(held)),
        }
    }
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// `Ok(None)` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value under `key` in a single write.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Wait until no other writer, in this process or another, holds `key`.
    ///
    /// The default does nothing: in-process writers are already serialized by
    /// the queue.
    async fn lock(&self, _key: &str) -> Result<StoreLock, StorageError> {
        Ok(StoreLock::unshared())
    }
}
