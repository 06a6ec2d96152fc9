//! ferry-core
//!
//! Durable offline outbox: records produced while disconnected are kept on
//! local storage and delivered to the backend once connectivity returns.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, kind, item, payload, stats, errors）
//! - **ports**: 抽象化レイヤー（KeyValueStore, RemoteSubmitter, Connectivity, Clock, IdGenerator）
//! - **queue**: 永続キュー（PersistedQueue, QueueManager, RetryPolicy, SubscriptionBus）
//! - **dispatch**: kind ごとの送信先への振り分け
//! - **app**: 構築と自動同期（FerryBuilder, AutoSync）
//! - **impls**: 実装（MemoryStore, FileStore, HttpSubmitter, ManualConnectivity, HttpProbe）
//! - **config**: `ferry.toml`

pub mod app;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod queue;

#[cfg(test)]
pub(crate) mod test_support;

pub use app::{AutoSync, BuildError, FerryBuilder, SyncStatus};
pub use config::{ConfigError, FerryConfig};
pub use dispatch::SyncDispatcher;
pub use domain::{
    GameResult, ItemId, ItemKind, QueueItem, QueueStats, QuizResult, SyncKind, SyncPayload,
};
pub use queue::{
    DrainReport, DrainSummary, ExhaustedPolicy, QueueManager, RetryPolicy, SubmitOutcome,
    Subscription, UnknownKindPolicy,
};
