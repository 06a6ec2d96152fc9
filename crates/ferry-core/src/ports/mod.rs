//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」。外部システム（ストレージ、
//! ネットワーク状態、バックエンド API）へのインターフェースを定義します。

pub mod clock;
pub mod connectivity;
pub mod id_generator;
pub mod kv_store;
pub mod submitter;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::connectivity::Connectivity;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::kv_store::{KeyValueStore, StoreLock};
pub use self::submitter::RemoteSubmitter;
