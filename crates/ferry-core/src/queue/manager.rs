//! QueueManager - キューの公開 API
//!
//! # 設計原則
//! - 失敗は呼び出し側に返さない: enqueue / drain / clear はログを出して続行する
//! - drain は同時に 1 つだけ（2 つ目は即座に [`DrainReport::AlreadyRunning`]）
//! - 書き込みはすべて「最新を読む → id で変更 → 全体を書く」。drain 中に
//!   enqueue された項目が上書きで消えることはない
//! - 通知は書き込みロックを持ったまま行うので、listener は古い状態を後から受け取らない

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::bus::{Listener, Subscription, SubscriptionBus};
use super::persisted::PersistedQueue;
use super::retry::{AfterFailure, RetryPolicy};
use crate::dispatch::SyncDispatcher;
use crate::domain::{
    DispatchError, ItemId, QueueItem, QueueStats, StorageError, SyncKind, SyncPayload,
};
use crate::ports::{Clock, Connectivity, IdGenerator};

/// What a call to [`QueueManager::drain`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainReport {
    /// Another drain was in flight; nothing was read, sent or written.
    AlreadyRunning,
    /// Not connected (or connectivity unknown); nothing was read, sent or written.
    Offline,
    Completed(DrainSummary),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    /// Items handed to the dispatcher.
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Exhausted items, and items removed by someone else mid-drain.
    pub skipped: usize,
}

/// What [`QueueManager::submit`] did with a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Delivered immediately.
    Sent,
    /// Buffered for a later drain.
    Queued(ItemId),
    /// Could not be sent and could not be stored. Already logged.
    Lost,
}

/// Clears the drain flag however the drain ends.
struct DrainGuard<'a>(&'a AtomicBool);

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Durable FIFO of outbound records, drained to the backend when online.
///
/// Build one with [`FerryBuilder`](crate::app::FerryBuilder).
pub struct QueueManager {
    store: PersistedQueue,
    connectivity: Arc<dyn Connectivity>,
    dispatcher: SyncDispatcher,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    draining: AtomicBool,
    write_lock: Mutex<()>,
    bus: SubscriptionBus,
}

impl QueueManager {
    pub(crate) fn from_parts(
        store: PersistedQueue,
        connectivity: Arc<dyn Connectivity>,
        dispatcher: SyncDispatcher,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            connectivity,
            dispatcher,
            ids,
            clock,
            policy,
            draining: AtomicBool::new(false),
            write_lock: Mutex::new(()),
            bus: SubscriptionBus::new(),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn storage_key(&self) -> &str {
        self.store.key()
    }

    pub fn connectivity(&self) -> Arc<dyn Connectivity> {
        Arc::clone(&self.connectivity)
    }

    /// Is a drain in flight right now?
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Append a record to the tail of the queue.
    ///
    /// Returns the new id, or `None` when it could not be stored (logged).
    pub async fn enqueue(&self, kind: SyncKind, payload: Value) -> Option<ItemId> {
        let item = QueueItem::new(self.ids.generate(kind), kind, payload, self.clock.now());
        self.append(kind, item).await
    }

    /// [`enqueue`](Self::enqueue) a typed record; the kind comes from its type.
    pub async fn enqueue_payload<T: SyncPayload>(&self, payload: &T) -> Option<ItemId> {
        match serde_json::to_value(payload) {
            Ok(value) => self.enqueue(T::KIND, value).await,
            Err(e) => {
                error!(kind = %T::KIND, error = %e, "failed to serialize payload");
                None
            }
        }
    }

    /// Send now if online, otherwise (or if sending fails) queue it.
    pub async fn submit(&self, kind: SyncKind, payload: Value) -> SubmitOutcome {
        if self.is_online().await {
            match self.dispatcher.send(kind, &payload).await {
                Ok(()) => {
                    info!(%kind, "submitted without queueing");
                    return SubmitOutcome::Sent;
                }
                Err(e) => warn!(%kind, error = %e, "direct submission failed; queueing"),
            }
        }

        match self.enqueue(kind, payload).await {
            Some(id) => SubmitOutcome::Queued(id),
            None => SubmitOutcome::Lost,
        }
    }

    /// Current contents, oldest first. Never fails.
    pub async fn list(&self) -> Vec<QueueItem> {
        self.store.read().await
    }

    pub async fn stats(&self) -> QueueStats {
        QueueStats::from_items(&self.list().await, self.policy.max_retries)
    }

    /// Drop everything. Clearing an empty queue is fine.
    pub async fn clear(&self) {
        let _guard = self.write_lock.lock().await;
        let result = match self.store.lock().await {
            Ok(_held) => self.store.clear().await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                info!("sync queue cleared");
                self.bus.notify(&[]);
            }
            Err(e) => error!(error = %e, "failed to clear sync queue"),
        }
    }

    /// Remove items at the retry ceiling; returns how many went.
    pub async fn clear_exhausted(&self) -> usize {
        let max = self.policy.max_retries;
        let result = self
            .mutate(|items| {
                let before = items.len();
                items.retain(|item| !item.is_exhausted(max));
                before - items.len()
            })
            .await;

        match result {
            Ok(removed) => {
                info!(removed, "exhausted items cleared");
                removed
            }
            Err(e) => {
                error!(error = %e, "failed to clear exhausted items");
                0
            }
        }
    }

    /// Listen for changes. `listener` is called right away with the current
    /// list and then after every change.
    pub async fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&[QueueItem]) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        let _guard = self.write_lock.lock().await;
        let subscription = self.bus.register(Arc::clone(&listener));
        let items = self.store.read().await;
        listener(&items);
        subscription
    }

    /// Try to send every eligible item, oldest first.
    ///
    /// Success removes the item; failure bumps its retry count. One item's
    /// failure never stops the others. Items enqueued meanwhile wait for the
    /// next drain.
    pub async fn drain(&self) -> DrainReport {
        let Some(_running) = DrainGuard::acquire(&self.draining) else {
            debug!("drain already running");
            return DrainReport::AlreadyRunning;
        };

        if !self.is_online().await {
            debug!("offline; drain skipped");
            return DrainReport::Offline;
        }

        let snapshot = self.store.read().await;
        info!(items = snapshot.len(), "drain started");

        let mut summary = DrainSummary::default();
        for item in &snapshot {
            if !self.policy.should_attempt(item) {
                debug!(item_id = %item.id, retry_count = item.retry_count, "exhausted; skipped");
                summary.skipped += 1;
                continue;
            }
            if !self.still_queued(&item.id).await {
                debug!(item_id = %item.id, "removed during drain; skipped");
                summary.skipped += 1;
                continue;
            }

            summary.attempted += 1;
            match self.dispatcher.dispatch(item).await {
                Ok(()) => {
                    summary.succeeded += 1;
                    self.remove(item).await;
                }
                Err(e) => {
                    summary.failed += 1;
                    self.record_failure(item, e).await;
                }
            }
        }

        self.notify_current().await;
        info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "drain finished"
        );
        DrainReport::Completed(summary)
    }

    async fn is_online(&self) -> bool {
        match self.connectivity.is_connected().await {
            Ok(online) => online,
            Err(e) => {
                warn!(error = %e, "treating as offline");
                false
            }
        }
    }

    async fn still_queued(&self, id: &ItemId) -> bool {
        self.store.read().await.iter().any(|i| &i.id == id)
    }

    async fn append(&self, kind: SyncKind, mut item: QueueItem) -> Option<ItemId> {
        let result = self
            .mutate(|items| {
                while items.iter().any(|i| i.id == item.id) {
                    item.id = self.ids.generate(kind);
                }
                let id = item.id.clone();
                items.push(item);
                id
            })
            .await;

        match result {
            Ok(id) => {
                info!(item_id = %id, %kind, "queued");
                Some(id)
            }
            Err(e) => {
                error!(%kind, error = %e, "failed to queue item");
                None
            }
        }
    }

    async fn remove(&self, item: &QueueItem) {
        match self.mutate(|items| items.retain(|i| i.id != item.id)).await {
            Ok(()) => info!(item_id = %item.id, kind = %item.kind, "synced"),
            Err(e) => error!(
                item_id = %item.id,
                error = %e,
                "synced but could not be removed; it will be sent again"
            ),
        }
    }

    async fn record_failure(&self, item: &QueueItem, err: DispatchError) {
        let result = self
            .mutate(|items| {
                let pos = items.iter().position(|i| i.id == item.id)?;
                let after = self.policy.apply_failure(&mut items[pos], &err);
                let retry_count = items[pos].retry_count;
                if after == AfterFailure::Evict {
                    items.remove(pos);
                }
                Some((after, retry_count))
            })
            .await;

        let (after, retry_count) = match result {
            Ok(Some(outcome)) => outcome,
            Ok(None) => {
                debug!(item_id = %item.id, error = %err, "failed, but already removed");
                return;
            }
            Err(e) => {
                error!(item_id = %item.id, error = %e, "failed to record sync failure");
                return;
            }
        };

        match after {
            AfterFailure::Retry => warn!(
                item_id = %item.id, kind = %item.kind, retry_count, error = %err,
                "sync failed; will retry"
            ),
            AfterFailure::Exhausted => warn!(
                item_id = %item.id, kind = %item.kind, retry_count, error = %err,
                "sync failed; retry limit reached"
            ),
            AfterFailure::Evict => warn!(
                item_id = %item.id, kind = %item.kind, retry_count, error = %err,
                "sync failed; retry limit reached, item dropped"
            ),
        }
    }

    /// Read-modify-write against the latest stored list.
    ///
    /// Writes and notifies only if `f` changed something. A list that cannot
    /// be read is never overwritten. The store lock keeps writers in other
    /// processes out until the write lands.
    async fn mutate<T>(&self, f: impl FnOnce(&mut Vec<QueueItem>) -> T) -> Result<T, StorageError> {
        let _guard = self.write_lock.lock().await;
        let _held = self.store.lock().await?;
        let mut items = self.store.load().await?;
        let before = items.clone();
        let out = f(&mut items);
        if items != before {
            self.store.write(&items).await?;
            self.bus.notify(&items);
        }
        Ok(out)
    }

    async fn notify_current(&self) {
        let _guard = self.write_lock.lock().await;
        let items = self.store.read().await;
        self.bus.notify(&items);
    }
}
