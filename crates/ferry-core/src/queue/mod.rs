//! Queue - 永続キューとその操作
//!
//! - **persisted**: 1 key に JSON 配列として保存
//! - **manager**: enqueue / drain / clear など公開 API
//! - **retry**: 再試行の上限と上限到達後の扱い
//! - **bus**: 変更通知

pub mod bus;
pub mod manager;
pub mod persisted;
pub mod retry;

pub use self::bus::{Subscription, SubscriptionBus};
pub use self::manager::{DrainReport, DrainSummary, QueueManager, SubmitOutcome};
pub use self::persisted::{DEFAULT_STORAGE_KEY, PersistedQueue};
pub use self::retry::{AfterFailure, ExhaustedPolicy, RetryPolicy, UnknownKindPolicy};
