// Webhook message pruning - keeps a channel down to the single most recent
// webhook-posted message.
//
// The pruner tracks the last webhook message per channel (an explicit map
// owned by the component, not a process global) and deletes the previously
// tracked message whenever a new one arrives. Pruning must never crash
// message ingestion: a "message already gone" failure is swallowed silently,
// anything else is logged and swallowed.

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

// ============================================================================
// PORT
// ============================================================================

#[derive(Debug, Error)]
pub enum DeleteError {
    /// The message was already deleted. Idempotent - not worth logging.
    #[error("message not found")]
    NotFound,

    #[error("delete failed: {0}")]
    Other(String),
}

/// Delete capability over the chat platform, implemented by the infra layer.
#[async_trait]
pub trait MessageDeleter: Send + Sync {
    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), DeleteError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Per-channel tracker of the most recent webhook message.
#[derive(Default)]
pub struct WebhookPruner {
    last_by_channel: DashMap<u64, u64>,
}

impl WebhookPruner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an incoming webhook message and prune the previously tracked
    /// one, if any. The tracked id is updated even when the delete fails, so
    /// a stale duplicate at worst survives until the next message.
    pub async fn observe(&self, channel_id: u64, message_id: u64, deleter: &dyn MessageDeleter) {
        // Swap first so the map never holds a lock across the delete await.
        let previous = self.last_by_channel.insert(channel_id, message_id);

        let Some(previous) = previous else {
            return;
        };
        if previous == message_id {
            return;
        }

        match deleter.delete_message(channel_id, previous).await {
            Ok(()) | Err(DeleteError::NotFound) => {}
            Err(DeleteError::Other(reason)) => {
                tracing::warn!(channel_id, message_id = previous, %reason, "failed to prune webhook message");
            }
        }
    }

    /// The currently tracked message for a channel, if any.
    #[allow(dead_code)]
    pub fn tracked(&self, channel_id: u64) -> Option<u64> {
        self.last_by_channel.get(&channel_id).map(|entry| *entry)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records deletions; optionally fails every call with a given error.
    struct RecordingDeleter {
        deleted: Mutex<Vec<(u64, u64)>>,
        fail_with: Option<fn() -> DeleteError>,
    }

    impl RecordingDeleter {
        fn new() -> Self {
            Self {
                deleted: Mutex::new(Vec::new()),
                fail_with: None,
            }
        }

        fn failing(fail_with: fn() -> DeleteError) -> Self {
            Self {
                deleted: Mutex::new(Vec::new()),
                fail_with: Some(fail_with),
            }
        }
    }

    #[async_trait]
    impl MessageDeleter for RecordingDeleter {
        async fn delete_message(
            &self,
            channel_id: u64,
            message_id: u64,
        ) -> Result<(), DeleteError> {
            self.deleted.lock().unwrap().push((channel_id, message_id));
            match &self.fail_with {
                Some(make) => Err(make()),
                None => Ok(()),
            }
        }
    }

    #[tokio::test]
    async fn keeps_only_the_latest_message() {
        let pruner = WebhookPruner::new();
        let deleter = RecordingDeleter::new();

        pruner.observe(10, 1, &deleter).await;
        pruner.observe(10, 2, &deleter).await;
        pruner.observe(10, 3, &deleter).await;

        // Messages 1 and 2 were pruned in order; 3 is tracked.
        assert_eq!(*deleter.deleted.lock().unwrap(), vec![(10, 1), (10, 2)]);
        assert_eq!(pruner.tracked(10), Some(3));
    }

    #[tokio::test]
    async fn first_message_in_a_channel_deletes_nothing() {
        let pruner = WebhookPruner::new();
        let deleter = RecordingDeleter::new();

        pruner.observe(10, 1, &deleter).await;

        assert!(deleter.deleted.lock().unwrap().is_empty());
        assert_eq!(pruner.tracked(10), Some(1));
    }

    #[tokio::test]
    async fn repeated_delivery_of_the_same_message_is_a_no_op() {
        let pruner = WebhookPruner::new();
        let deleter = RecordingDeleter::new();

        pruner.observe(10, 1, &deleter).await;
        pruner.observe(10, 1, &deleter).await;

        assert!(deleter.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn channels_are_tracked_independently() {
        let pruner = WebhookPruner::new();
        let deleter = RecordingDeleter::new();

        pruner.observe(10, 1, &deleter).await;
        pruner.observe(20, 2, &deleter).await;
        pruner.observe(10, 3, &deleter).await;

        assert_eq!(*deleter.deleted.lock().unwrap(), vec![(10, 1)]);
        assert_eq!(pruner.tracked(10), Some(3));
        assert_eq!(pruner.tracked(20), Some(2));
    }

    #[tokio::test]
    async fn delete_failures_still_advance_the_tracked_message() {
        let pruner = WebhookPruner::new();
        let deleter =
            RecordingDeleter::failing(|| DeleteError::Other("permission denied".to_string()));

        pruner.observe(10, 1, &deleter).await;
        pruner.observe(10, 2, &deleter).await;
        pruner.observe(10, 3, &deleter).await;

        // Both deletes were attempted and failed, but tracking moved on.
        assert_eq!(deleter.deleted.lock().unwrap().len(), 2);
        assert_eq!(pruner.tracked(10), Some(3));
    }

    #[tokio::test]
    async fn already_gone_messages_are_swallowed() {
        let pruner = WebhookPruner::new();
        let deleter = RecordingDeleter::failing(|| DeleteError::NotFound);

        pruner.observe(10, 1, &deleter).await;
        pruner.observe(10, 2, &deleter).await;

        assert_eq!(pruner.tracked(10), Some(2));
    }
}
