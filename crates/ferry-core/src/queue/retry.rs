//! Retry policy: decides whether an item is attempted and what a failure does to it.

use serde::{Deserialize, Serialize};

use crate::domain::{DispatchError, QueueItem};

/// What happens to an item once its retry count reaches the ceiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustedPolicy {
    /// Leave it in the queue, never attempt it again. It stays visible in
    /// `list()`/stats until `clear_exhausted()` or `clear()`.
    #[default]
    Keep,

    /// Remove it as soon as a failure takes it to the ceiling.
    Evict,
}

/// What an unknown-kind failure costs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownKindPolicy {
    /// Jump straight to the ceiling: retrying can never succeed.
    #[default]
    Park,

    /// Count it like any transient failure.
    ConsumeRetry,
}

/// Outcome of applying a failure to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterFailure {
    /// Still below the ceiling; the next drain tries again.
    Retry,
    /// At the ceiling and kept.
    Exhausted,
    /// At the ceiling and must be removed.
    Evict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Failed attempts after which an item is no longer tried.
    pub max_retries: u32,

    pub on_exhausted: ExhaustedPolicy,

    pub on_unknown_kind: UnknownKindPolicy,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn with_exhausted(mut self, policy: ExhaustedPolicy) -> Self {
        self.on_exhausted = policy;
        self
    }

    pub fn with_unknown_kind(mut self, policy: UnknownKindPolicy) -> Self {
        self.on_unknown_kind = policy;
        self
    }

    /// Is this item eligible for a dispatch attempt?
    pub fn should_attempt(&self, item: &QueueItem) -> bool {
        !item.is_exhausted(self.max_retries)
    }

    /// Apply a failed dispatch to `item` and say what to do with it.
    ///
    /// `retry_count` only ever goes up.
    pub fn apply_failure(&self, item: &mut QueueItem, error: &DispatchError) -> AfterFailure {
        let message = error.to_string();
        if error.is_permanent() && self.on_unknown_kind == UnknownKindPolicy::Park {
            item.park(self.max_retries, message);
        } else {
            item.record_failure(message);
        }

        if !item.is_exhausted(self.max_retries) {
            AfterFailure::Retry
        } else {
            match self.on_exhausted {
                ExhaustedPolicy::Keep => AfterFailure::Exhausted,
                ExhaustedPolicy::Evict => AfterFailure::Evict,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: Self::DEFAULT_MAX_RETRIES,
            on_exhausted: ExhaustedPolicy::Keep,
            on_unknown_kind: UnknownKindPolicy::Park,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ItemId, SubmitError, SyncKind};
    use chrono::Utc;
    use rstest::rstest;

    fn item_with(retry_count: u32) -> QueueItem {
        let mut item = QueueItem::new(
            ItemId::from("GENERIC_SYNC_1"),
            SyncKind::Generic,
            serde_json::Value::Null,
            Utc::now(),
        );
        item.retry_count = retry_count;
        item
    }

    fn transient() -> DispatchError {
        DispatchError::Remote(SubmitError::Timeout)
    }

    fn unknown() -> DispatchError {
        DispatchError::UnknownKind("SUBMIT_HOMEWORK".to_string())
    }

    #[test]
    fn default_policy_matches_ceiling_of_three() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.on_exhausted, ExhaustedPolicy::Keep);
        assert_eq!(policy.on_unknown_kind, UnknownKindPolicy::Park);
    }

    #[rstest]
    #[case(0, true)]
    #[case(2, true)]
    #[case(3, false)]
    #[case(7, false)]
    fn attempts_only_below_ceiling(#[case] retry_count: u32, #[case] expected: bool) {
        assert_eq!(RetryPolicy::default().should_attempt(&item_with(retry_count)), expected);
    }

    #[rstest]
    #[case(0, ExhaustedPolicy::Keep, 1, AfterFailure::Retry)]
    #[case(2, ExhaustedPolicy::Keep, 3, AfterFailure::Exhausted)]
    #[case(2, ExhaustedPolicy::Evict, 3, AfterFailure::Evict)]
    #[case(1, ExhaustedPolicy::Evict, 2, AfterFailure::Retry)]
    fn transient_failure_counts_one_retry(
        #[case] start: u32,
        #[case] exhausted: ExhaustedPolicy,
        #[case] expected_count: u32,
        #[case] expected: AfterFailure,
    ) {
        let policy = RetryPolicy::default().with_exhausted(exhausted);
        let mut item = item_with(start);
        assert_eq!(policy.apply_failure(&mut item, &transient()), expected);
        assert_eq!(item.retry_count, expected_count);
        assert_eq!(item.last_error.as_deref(), Some("request timed out"));
    }

    #[test]
    fn unknown_kind_is_parked_at_ceiling() {
        let policy = RetryPolicy::default();
        let mut item = item_with(0);
        assert_eq!(policy.apply_failure(&mut item, &unknown()), AfterFailure::Exhausted);
        assert_eq!(item.retry_count, 3);
    }

    #[test]
    fn unknown_kind_can_consume_a_single_retry() {
        let policy = RetryPolicy::default().with_unknown_kind(UnknownKindPolicy::ConsumeRetry);
        let mut item = item_with(0);
        assert_eq!(policy.apply_failure(&mut item, &unknown()), AfterFailure::Retry);
        assert_eq!(item.retry_count, 1);
    }

    #[test]
    fn policy_deserializes_with_defaults() {
        let policy: RetryPolicy = toml::from_str("on_exhausted = \"evict\"").unwrap();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.on_exhausted, ExhaustedPolicy::Evict);
    }
}
