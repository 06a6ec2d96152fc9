//! ManualConnectivity - 外部から設定するオンライン状態
//!
//! For callers that already own a platform network signal, and for tests.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::ConnectivityError;
use crate::ports::Connectivity;

pub struct ManualConnectivity {
    tx: watch::Sender<bool>,
}

impl ManualConnectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx }
    }

    /// Publish a new state. Subscribers are only woken on an actual change.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }
}

#[async_trait]
impl Connectivity for ManualConnectivity {
    async fn is_connected(&self) -> Result<bool, ConnectivityError> {
        Ok(self.is_online())
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
