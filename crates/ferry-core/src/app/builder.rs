//! FerryBuilder - QueueManager の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - store / submitter / connectivity は必須
//! - 足りないものは build() でまとめて [`BuildError::Missing`] として返す
//! - clock / id generator / retry policy / storage key は既定値あり

use std::sync::Arc;

use crate::config::FerryConfig;
use crate::dispatch::SyncDispatcher;
use crate::ports::{
    Clock, Connectivity, IdGenerator, KeyValueStore, RemoteSubmitter, SystemClock, UlidGenerator,
};
use crate::queue::{DEFAULT_STORAGE_KEY, PersistedQueue, QueueManager, RetryPolicy};

/// # 使用例
/// ```ignore
/// let manager = FerryBuilder::from_config(&config)
///     .store(Arc::new(FileStore::open(dir).await?))
///     .submitter(Arc::new(HttpSubmitter::new(&config.remote.base_url, timeout)?))
///     .connectivity(probe)
///     .build()?;
/// ```
pub struct FerryBuilder {
    store: Option<Arc<dyn KeyValueStore>>,
    submitter: Option<Arc<dyn RemoteSubmitter>>,
    connectivity: Option<Arc<dyn Connectivity>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    policy: RetryPolicy,
    storage_key: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing components: {0:?}. Provide them before calling build().")]
    Missing(Vec<&'static str>),
}

impl FerryBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            submitter: None,
            connectivity: None,
            clock: None,
            ids: None,
            policy: RetryPolicy::default(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }

    /// Start from the retry policy and storage key of a loaded config.
    pub fn from_config(config: &FerryConfig) -> Self {
        Self::new()
            .retry_policy(config.retry.clone())
            .storage_key(config.storage_key.clone())
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn submitter(mut self, submitter: Arc<dyn RemoteSubmitter>) -> Self {
        self.submitter = Some(submitter);
        self
    }

    pub fn connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn build(self) -> Result<QueueManager, BuildError> {
        let mut missing = Vec::new();
        if self.store.is_none() {
            missing.push("store");
        }
        if self.submitter.is_none() {
            missing.push("submitter");
        }
        if self.connectivity.is_none() {
            missing.push("connectivity");
        }
        let (Some(store), Some(submitter), Some(connectivity)) =
            (self.store, self.submitter, self.connectivity)
        else {
            return Err(BuildError::Missing(missing));
        };

        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let ids: Arc<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Arc::new(UlidGenerator::new(Arc::clone(&clock))),
        };

        Ok(QueueManager::from_parts(
            PersistedQueue::new(store, self.storage_key),
            connectivity,
            SyncDispatcher::new(submitter),
            ids,
            clock,
            self.policy,
        ))
    }
}

impl Default for FerryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SyncKind;
    use crate::impls::{ManualConnectivity, MemoryStore};
    use crate::ports::FixedClock;
    use crate::queue::ExhaustedPolicy;
    use crate::test_support::ScriptedSubmitter;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn build_reports_every_missing_component() {
        let err = FerryBuilder::new()
            .store(Arc::new(MemoryStore::new()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(
            err,
            BuildError::Missing(ref missing) if missing == &vec!["submitter", "connectivity"]
        ));
    }

    #[tokio::test]
    async fn build_uses_configured_key_clock_and_policy() {
        let config = FerryConfig::from_toml_str(
            "storage_key = \"outbox\"\n[retry]\nmax_retries = 5\non_exhausted = \"evict\"",
        )
        .unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let kv = Arc::new(MemoryStore::new());

        let manager = FerryBuilder::from_config(&config)
            .store(kv.clone())
            .submitter(Arc::new(ScriptedSubmitter::ok()))
            .connectivity(Arc::new(ManualConnectivity::new(false)))
            .clock(Arc::new(FixedClock::new(at)))
            .build()
            .unwrap();

        assert_eq!(manager.storage_key(), "outbox");
        assert_eq!(manager.policy().max_retries, 5);
        assert_eq!(manager.policy().on_exhausted, ExhaustedPolicy::Evict);

        manager.enqueue(SyncKind::Generic, json!({})).await.unwrap();
        assert_eq!(manager.list().await[0].enqueued_at, at);
        assert!(kv.get("outbox").await.unwrap().is_some());
    }
}
