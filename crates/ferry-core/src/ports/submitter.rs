//! RemoteSubmitter port - バックエンドへの送信
//!
//! One call per submission target. Request/response schemas belong to the
//! backend; the payload is passed through as JSON.

use async_trait::async_trait;

use crate::domain::SubmitError;

#[async_trait]
pub trait RemoteSubmitter: Send + Sync {
    async fn submit_quiz_result(&self, payload: &serde_json::Value) -> Result<(), SubmitError>;

    async fn submit_game_result(&self, payload: &serde_json::Value) -> Result<(), SubmitError>;

    async fn submit_generic(&self, payload: &serde_json::Value) -> Result<(), SubmitError>;
}
