// Serenity-backed implementation of the pruner's delete port.

use crate::core::pruning::{DeleteError, MessageDeleter};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Deletes messages through the Discord REST API, mapping the platform's
/// unknown-message response to [`DeleteError::NotFound`].
pub struct SerenityMessageDeleter {
    http: Arc<serenity::Http>,
}

impl SerenityMessageDeleter {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl MessageDeleter for SerenityMessageDeleter {
    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), DeleteError> {
        let result = self
            .http
            .delete_message(
                serenity::ChannelId::new(channel_id),
                serenity::MessageId::new(message_id),
                None,
            )
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response)))
                if response.status_code == 404 =>
            {
                Err(DeleteError::NotFound)
            }
            Err(err) => Err(DeleteError::Other(err.to_string())),
        }
    }
}
