//! AutoSync - 接続状態に応じた自動 drain
//!
//! # 動作
//! - 起動時にオンラインなら 1 回 drain
//! - offline → online に変わるたびに 1 回 drain（online → online では何もしない）
//! - `retry_interval` があれば、オンラインの間は一定間隔でも drain
//! - 状態（online / syncing / キューの件数）は [`SyncStatus`] として watch で配信

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::domain::QueueStats;
use crate::queue::{DrainReport, QueueManager};

/// Snapshot for status displays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStatus {
    pub online: bool,
    /// A drain started by AutoSync is in flight.
    pub syncing: bool,
    pub stats: QueueStats,
}

/// Background task handle.
/// - `shutdown_and_join()` で停止を待てる
/// - handle を drop しても止まらない（request_shutdown を呼ぶこと）
pub struct AutoSync {
    shutdown_tx: watch::Sender<bool>,
    status_rx: watch::Receiver<SyncStatus>,
    join: JoinHandle<()>,
}

impl AutoSync {
    pub fn spawn(manager: Arc<QueueManager>, retry_interval: Option<Duration>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (status_tx, status_rx) = watch::channel(SyncStatus::default());

        let join = tokio::spawn(async move {
            sync_loop(manager, Arc::new(status_tx), shutdown_rx, retry_interval).await;
        });

        Self {
            shutdown_tx,
            status_rx,
            join,
        }
    }

    pub fn status(&self) -> watch::Receiver<SyncStatus> {
        self.status_rx.clone()
    }

    /// Stop reacting to connectivity. A drain already in flight finishes.
    pub fn request_shutdown(&self) {
        // ignore send error: the loop may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}

async fn sync_loop(
    manager: Arc<QueueManager>,
    status_tx: Arc<watch::Sender<SyncStatus>>,
    mut shutdown_rx: watch::Receiver<bool>,
    retry_interval: Option<Duration>,
) {
    let max_retries = manager.policy().max_retries;
    let _queue_sub = {
        let status_tx = Arc::clone(&status_tx);
        manager
            .subscribe(move |items| {
                let stats = QueueStats::from_items(items, max_retries);
                status_tx.send_if_modified(|status| {
                    let changed = status.stats != stats;
                    status.stats = stats;
                    changed
                });
            })
            .await
    };

    let mut online_rx = manager.connectivity().subscribe();
    let mut was_online = *online_rx.borrow_and_update();
    set_online(&status_tx, was_online);
    info!(online = was_online, "auto sync started");

    if was_online {
        sync_once(&manager, &status_tx).await;
    }

    let mut ticker = retry_interval.map(|period| {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            _ = shutdown_rx.changed() => {
                // 次のループで判定
                continue;
            }
            changed = online_rx.changed() => {
                if changed.is_err() {
                    debug!("connectivity source closed");
                    break;
                }
                let online = *online_rx.borrow_and_update();
                set_online(&status_tx, online);
                if online && !was_online {
                    info!("connectivity restored");
                    was_online = true;
                    sync_once(&manager, &status_tx).await;
                } else if !online && was_online {
                    info!("connectivity lost");
                    was_online = false;
                }
            }
            _ = tick(&mut ticker), if was_online => {
                debug!("periodic sync");
                sync_once(&manager, &status_tx).await;
            }
        }
    }

    info!("auto sync stopped");
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn set_online(status_tx: &watch::Sender<SyncStatus>, online: bool) {
    status_tx.send_if_modified(|status| {
        let changed = status.online != online;
        status.online = online;
        changed
    });
}

async fn sync_once(manager: &QueueManager, status_tx: &watch::Sender<SyncStatus>) {
    status_tx.send_modify(|status| status.syncing = true);
    let report = manager.drain().await;
    status_tx.send_modify(|status| status.syncing = false);

    if let DrainReport::Completed(summary) = report {
        debug!(?summary, "auto sync drain finished");
    } else {
        debug!(?report, "auto sync drain did not run");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::FerryBuilder;
    use crate::domain::{SubmitError, SyncKind};
    use crate::impls::{ManualConnectivity, MemoryStore};
    use crate::test_support::ScriptedSubmitter;
    use serde_json::json;

    fn setup(online: bool) -> (Arc<QueueManager>, Arc<ManualConnectivity>, Arc<ScriptedSubmitter>) {
        let net = Arc::new(ManualConnectivity::new(online));
        let submitter = Arc::new(ScriptedSubmitter::ok());
        let manager = FerryBuilder::new()
            .store(Arc::new(MemoryStore::new()))
            .submitter(submitter.clone())
            .connectivity(net.clone())
            .build()
            .unwrap();
        (Arc::new(manager), net, submitter)
    }

    async fn wait_for(
        rx: &mut watch::Receiver<SyncStatus>,
        f: impl FnMut(&SyncStatus) -> bool,
    ) -> SyncStatus {
        let status = tokio::time::timeout(Duration::from_secs(120), rx.wait_for(f))
            .await
            .expect("status never reached")
            .unwrap();
        *status
    }

    #[tokio::test]
    async fn drains_on_start_when_online() {
        let (manager, _net, submitter) = setup(true);
        manager.enqueue(SyncKind::Generic, json!({"n": 1})).await;

        let auto = AutoSync::spawn(manager.clone(), None);
        let mut status = auto.status();
        let done = wait_for(&mut status, |s| s.online && !s.syncing && s.stats.pending == 0).await;

        assert!(done.online);
        assert!(manager.list().await.is_empty());
        assert_eq!(submitter.calls().len(), 1);
        auto.shutdown_and_join().await;
    }

    #[tokio::test]
    async fn drains_when_connectivity_comes_back() {
        let (manager, net, submitter) = setup(false);
        manager.enqueue(SyncKind::Generic, json!({"n": 1})).await;
        manager.enqueue(SyncKind::Generic, json!({"n": 2})).await;

        let auto = AutoSync::spawn(manager.clone(), None);
        let mut status = auto.status();
        let offline = wait_for(&mut status, |s| s.stats.pending == 2).await;
        assert!(!offline.online);
        assert!(submitter.calls().is_empty());

        net.set_online(true);
        wait_for(&mut status, |s| s.online && s.stats.pending == 0).await;

        assert_eq!(submitter.calls().len(), 2);
        auto.shutdown_and_join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_retry_while_online() {
        let net = Arc::new(ManualConnectivity::new(true));
        let submitter =
            Arc::new(ScriptedSubmitter::failing_when(|_, _| Some(SubmitError::Timeout)));
        let manager = Arc::new(
            FerryBuilder::new()
                .store(Arc::new(MemoryStore::new()))
                .submitter(submitter.clone())
                .connectivity(net)
                .build()
                .unwrap(),
        );
        manager.enqueue(SyncKind::Generic, json!({"n": 1})).await;

        let auto = AutoSync::spawn(manager.clone(), Some(Duration::from_secs(30)));
        let mut status = auto.status();
        wait_for(&mut status, |s| s.stats.exhausted == 1).await;

        // start + two periodic ticks reach the ceiling of 3
        assert_eq!(submitter.calls().len(), 3);
        auto.shutdown_and_join().await;
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let (manager, net, submitter) = setup(false);
        let auto = AutoSync::spawn(manager.clone(), None);
        let mut status = auto.status();
        wait_for(&mut status, |s| !s.online).await;

        auto.shutdown_and_join().await;
        manager.enqueue(SyncKind::Generic, json!({"n": 1})).await;
        net.set_online(true);
        tokio::task::yield_now().await;

        assert!(submitter.calls().is_empty());
        assert_eq!(manager.list().await.len(), 1);
    }
}
