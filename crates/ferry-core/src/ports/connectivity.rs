//! Connectivity port - オンライン状態の観測
//!
//! # 実装
//! - **ManualConnectivity**: 外部から状態を設定（テスト、プラットフォーム連携）
//! - **HttpProbe**: URL を定期的に叩いて到達性を判定

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::ConnectivityError;

#[async_trait]
pub trait Connectivity: Send + Sync {
    /// On-demand fetch of the current state.
    async fn is_connected(&self) -> Result<bool, ConnectivityError>;

    /// Stream of states. The receiver sees the current value immediately;
    /// dropping it is the unsubscribe.
    fn subscribe(&self) -> watch::Receiver<bool>;
}
