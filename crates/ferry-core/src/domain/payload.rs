//! SyncPayload - 型付き payload
//!
//! Producers that know what they are submitting can enqueue a typed record
//! instead of a raw `serde_json::Value`; the kind comes from the type.
//!
//! # Trait Bounds
//! - `Serialize`: queue に保存するため
//! - `Send + Sync + 'static`: 非同期タスクをまたいで渡すため

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::kind::SyncKind;

pub trait SyncPayload: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Where records of this type are submitted.
    const KIND: SyncKind;
}

/// Result of a finished quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub quiz_id: String,
    /// Number of correct answers.
    pub score: u32,
    pub total_questions: u32,
    /// Completion time, epoch milliseconds.
    pub timestamp: i64,
}

impl SyncPayload for QuizResult {
    const KIND: SyncKind = SyncKind::QuizResult;
}

/// Result of a finished game round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    pub game_id: String,
    pub score: u32,
    /// Completion time, epoch milliseconds.
    pub timestamp: i64,
}

impl SyncPayload for GameResult {
    const KIND: SyncKind = SyncKind::GameResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_result_uses_camel_case() {
        let result = QuizResult {
            quiz_id: "fractions-1".to_string(),
            score: 7,
            total_questions: 10,
            timestamp: 1_700_000_000_000,
        };
        let v = serde_json::to_value(&result).unwrap();
        assert_eq!(v["quizId"], "fractions-1");
        assert_eq!(v["totalQuestions"], 10);
        assert_eq!(QuizResult::KIND, SyncKind::QuizResult);
    }
}
