// Serenity-backed implementation of the giveaway's reaction-read port.

use crate::core::giveaway::{GiveawayError, Participant, ReactionTally};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Reads the users who reacted with the giveaway emoji on one message,
/// paging through the REST API 100 users at a time.
pub struct SerenityReactionTally {
    http: Arc<serenity::Http>,
    channel_id: serenity::ChannelId,
    message_id: serenity::MessageId,
    emoji: serenity::ReactionType,
}

impl SerenityReactionTally {
    pub fn new(
        http: Arc<serenity::Http>,
        channel_id: serenity::ChannelId,
        message_id: serenity::MessageId,
        emoji: serenity::ReactionType,
    ) -> Self {
        Self {
            http,
            channel_id,
            message_id,
            emoji,
        }
    }
}

#[async_trait]
impl ReactionTally for SerenityReactionTally {
    async fn entrants(&self) -> Result<Vec<Participant>, GiveawayError> {
        const PAGE_SIZE: u8 = 100;

        let mut entrants = Vec::new();
        let mut after: Option<u64> = None;

        loop {
            let page = self
                .http
                .get_reaction_users(
                    self.channel_id,
                    self.message_id,
                    &self.emoji,
                    PAGE_SIZE,
                    after,
                )
                .await
                .map_err(|err| GiveawayError::TallyError(err.to_string()))?;

            let page_len = page.len();
            for user in &page {
                entrants.push(Participant {
                    user_id: user.id.get(),
                    is_bot: user.bot,
                });
            }

            if page_len < PAGE_SIZE as usize {
                break;
            }
            after = page.last().map(|user| user.id.get());
        }

        Ok(entrants)
    }
}
