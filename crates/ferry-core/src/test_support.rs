//! Test doubles shared by the in-crate tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Semaphore, mpsc, watch};

use crate::domain::{ConnectivityError, StorageError, SubmitError, SyncKind};
use crate::impls::MemoryStore;
use crate::ports::{Connectivity, KeyValueStore, RemoteSubmitter};

type FailRule = Box<dyn Fn(SyncKind, &Value) -> Option<SubmitError> + Send + Sync>;

/// Records every submission and fails the ones the rule picks.
pub(crate) struct ScriptedSubmitter {
    calls: Mutex<Vec<(SyncKind, Value)>>,
    fail: FailRule,
    gate: Option<(mpsc::UnboundedSender<Value>, Arc<Semaphore>)>,
}

/// Holds gated submissions until released.
pub(crate) struct Gate {
    started: mpsc::UnboundedReceiver<Value>,
    permits: Arc<Semaphore>,
}

impl Gate {
    /// Wait until a submission is in flight; returns its payload.
    pub(crate) async fn wait_started(&mut self) -> Value {
        self.started.recv().await.unwrap()
    }

    /// Let `n` submissions (current or future) complete.
    pub(crate) fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }
}

impl ScriptedSubmitter {
    pub(crate) fn ok() -> Self {
        Self::failing_when(|_, _| None)
    }

    pub(crate) fn failing_when(
        rule: impl Fn(SyncKind, &Value) -> Option<SubmitError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: Box::new(rule),
            gate: None,
        }
    }

    /// Every submission blocks until the returned gate releases it.
    pub(crate) fn gated(
        rule: impl Fn(SyncKind, &Value) -> Option<SubmitError> + Send + Sync + 'static,
    ) -> (Self, Gate) {
        let (tx, rx) = mpsc::unbounded_channel();
        let permits = Arc::new(Semaphore::new(0));
        let mut submitter = Self::failing_when(rule);
        submitter.gate = Some((tx, permits.clone()));
        (
            submitter,
            Gate {
                started: rx,
                permits,
            },
        )
    }

    pub(crate) fn calls(&self) -> Vec<(SyncKind, Value)> {
        self.calls.lock().unwrap().clone()
    }

    async fn record(&self, kind: SyncKind, payload: &Value) -> Result<(), SubmitError> {
        self.calls.lock().unwrap().push((kind, payload.clone()));
        if let Some((started, permits)) = &self.gate {
            let _ = started.send(payload.clone());
            permits
                .acquire()
                .await
                .map_err(|e| SubmitError::Other(e.to_string()))?
                .forget();
        }
        match (self.fail)(kind, payload) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteSubmitter for ScriptedSubmitter {
    async fn submit_quiz_result(&self, payload: &Value) -> Result<(), SubmitError> {
        self.record(SyncKind::QuizResult, payload).await
    }

    async fn submit_game_result(&self, payload: &Value) -> Result<(), SubmitError> {
        self.record(SyncKind::GameResult, payload).await
    }

    async fn submit_generic(&self, payload: &Value) -> Result<(), SubmitError> {
        self.record(SyncKind::Generic, payload).await
    }
}

/// A store whose every operation fails.
#[derive(Default)]
pub(crate) struct FailingStore;

impl FailingStore {
    pub(crate) fn new() -> Self {
        Self
    }
}

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Backend("disk unavailable".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Backend("disk unavailable".to_string()))
    }

    async fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Backend("disk unavailable".to_string()))
    }
}

/// A working store that counts accesses.
#[derive(Default)]
pub(crate) struct CountingStore {
    inner: MemoryStore,
    gets: AtomicUsize,
    sets: AtomicUsize,
}

impl CountingStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// `(gets, sets)` so far.
    pub(crate) fn accesses(&self) -> (usize, usize) {
        (self.gets.load(Ordering::SeqCst), self.sets.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl KeyValueStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key).await
    }
}

/// The platform cannot tell whether we are online.
pub(crate) struct BrokenConnectivity {
    tx: watch::Sender<bool>,
}

impl BrokenConnectivity {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }
}

#[async_trait]
impl Connectivity for BrokenConnectivity {
    async fn is_connected(&self) -> Result<bool, ConnectivityError> {
        Err(ConnectivityError("no network service".to_string()))
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
