//! App - アプリケーション層
//!
//! ports と queue を組み合わせて、すぐ使える形にまとめます。
//!
//! # 主要コンポーネント
//! - **FerryBuilder**: QueueManager の構築とワイヤリング
//! - **AutoSync**: 接続回復時の自動 drain

pub mod auto_sync;
pub mod builder;

pub use self::auto_sync::{AutoSync, SyncStatus};
pub use self::builder::{BuildError, FerryBuilder};
