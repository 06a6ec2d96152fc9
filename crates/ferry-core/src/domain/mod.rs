//! Domain model (ids, kinds, queue items, errors, stats).

pub mod errors;
pub mod ids;
pub mod item;
pub mod kind;
pub mod payload;
pub mod stats;

pub use self::errors::{ConnectivityError, DispatchError, StorageError, SubmitError};
pub use self::ids::ItemId;
pub use self::item::QueueItem;
pub use self::kind::{ItemKind, ParseKindError, SyncKind};
pub use self::payload::{GameResult, QuizResult, SyncPayload};
pub use self::stats::QueueStats;
