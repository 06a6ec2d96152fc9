//! HttpProbe - URL への到達性でオンライン判定
//!
//! Any HTTP response (even 404 or 500) means the network path works; only a
//! transport failure counts as offline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::ConnectivityError;
use crate::ports::Connectivity;

pub struct HttpProbe {
    url: String,
    client: reqwest::Client,
    tx: watch::Sender<bool>,
}

impl HttpProbe {
    /// Starts in the offline state until the first probe.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ConnectivityError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConnectivityError(format!("failed to build HTTP client: {e}")))?;
        let (tx, _rx) = watch::channel(false);
        Ok(Self {
            url: url.into(),
            client,
            tx,
        })
    }

    /// Probe once and publish the result.
    pub async fn probe(&self) -> bool {
        let online = match self.client.head(&self.url).send().await {
            Ok(_) => true,
            Err(e) => {
                debug!(url = %self.url, error = %e, "probe failed");
                false
            }
        };
        self.publish(online);
        online
    }

    fn publish(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            if online {
                info!(url = %self.url, "backend reachable");
            } else {
                warn!(url = %self.url, "backend unreachable");
            }
        }
    }

    /// Probe every `interval` in the background. The first probe runs immediately.
    pub fn spawn(self: &Arc<Self>, interval: Duration) -> ProbeHandle {
        let probe = Arc::clone(self);
        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                probe.probe().await;
            }
        });
        ProbeHandle { join }
    }
}

#[async_trait]
impl Connectivity for HttpProbe {
    async fn is_connected(&self) -> Result<bool, ConnectivityError> {
        Ok(self.probe().await)
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Stops the background probe when dropped.
pub struct ProbeHandle {
    join: JoinHandle<()>,
}

impl Drop for ProbeHandle {
    fn drop(&mut self) {
        self.join.abort();
    }
}
