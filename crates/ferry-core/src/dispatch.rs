use std::sync::Arc;

use tracing::debug;

use crate::domain::{DispatchError, ItemKind, QueueItem, SyncKind};
use crate::ports::RemoteSubmitter;

/// Routes a queue item to the submit operation for its kind.
///
/// Design:
/// - The set of kinds is closed, so routing is a `match` and not a registry.
///   Adding a kind is a compile error here until it is routed.
/// - Tags this build does not know fail with [`DispatchError::UnknownKind`]
///   without touching the network.
pub struct SyncDispatcher {
    submitter: Arc<dyn RemoteSubmitter>,
}

impl SyncDispatcher {
    pub fn new(submitter: Arc<dyn RemoteSubmitter>) -> Self {
        Self { submitter }
    }

    pub async fn dispatch(&self, item: &QueueItem) -> Result<(), DispatchError> {
        let kind = match &item.kind {
            ItemKind::Known(kind) => *kind,
            ItemKind::Unknown(tag) => return Err(DispatchError::UnknownKind(tag.clone())),
        };
        self.send(kind, &item.payload).await
    }

    /// Submit a payload of a known kind directly.
    pub async fn send(&self, kind: SyncKind, payload: &serde_json::Value) -> Result<(), DispatchError> {
        debug!(%kind, "dispatching");
        match kind {
            SyncKind::QuizResult => self.submitter.submit_quiz_result(payload).await?,
            SyncKind::GameResult => self.submitter.submit_game_result(payload).await?,
            SyncKind::Generic => self.submitter.submit_generic(payload).await?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ItemId, SubmitError};
    use crate::test_support::ScriptedSubmitter;
    use chrono::Utc;
    use rstest::rstest;
    use serde_json::json;

    fn item(kind: ItemKind) -> QueueItem {
        QueueItem::new(ItemId::from("ID_1"), kind, json!({"score": 1}), Utc::now())
    }

    #[rstest]
    #[case(SyncKind::QuizResult)]
    #[case(SyncKind::GameResult)]
    #[case(SyncKind::Generic)]
    #[tokio::test]
    async fn each_kind_goes_to_its_own_operation(#[case] kind: SyncKind) {
        let submitter = Arc::new(ScriptedSubmitter::ok());
        let dispatcher = SyncDispatcher::new(submitter.clone());

        dispatcher.dispatch(&item(kind.into())).await.unwrap();

        assert_eq!(submitter.calls(), vec![(kind, json!({"score": 1}))]);
    }

    #[tokio::test]
    async fn unknown_kind_fails_without_submitting() {
        let submitter = Arc::new(ScriptedSubmitter::ok());
        let dispatcher = SyncDispatcher::new(submitter.clone());

        let err = dispatcher
            .dispatch(&item(ItemKind::Unknown("SUBMIT_HOMEWORK".to_string())))
            .await
            .unwrap_err();

        assert_eq!(err, DispatchError::UnknownKind("SUBMIT_HOMEWORK".to_string()));
        assert!(submitter.calls().is_empty());
    }

    #[tokio::test]
    async fn remote_failure_is_passed_through() {
        let submitter = Arc::new(ScriptedSubmitter::failing_when(|_, _| Some(SubmitError::Timeout)));
        let dispatcher = SyncDispatcher::new(submitter);

        let err = dispatcher.dispatch(&item(SyncKind::Generic.into())).await.unwrap_err();
        assert_eq!(err, DispatchError::Remote(SubmitError::Timeout));
    }
}
