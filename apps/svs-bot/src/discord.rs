//! Discord implementation of [`Platform`].

use std::sync::Arc;

use async_trait::async_trait;
use serenity::all::{
    Cache, ChannelId, CreateAttachment, CreateMessage, EditMessage, GuildId, Http, MessageId,
    ReactionType, UserId as DiscordUserId,
};
use tracing::{debug, warn};

use crate::announcement::Announcement;
use crate::error::Error;
use crate::models::{Status, UserId};
use crate::platform::Platform;
use crate::utils::embeds;

/// Reaction used for each status on an announcement, in display order.
pub const STATUS_EMOJIS: [(Status, &str); 3] = [
    (Status::Yes, "\u{2705}"),
    (Status::Maybe, "\u{2754}"),
    (Status::No, "\u{274C}"),
];

pub fn emoji_for(status: Status) -> ReactionType {
    let emoji = STATUS_EMOJIS
        .iter()
        .find(|(s, _)| *s == status)
        .map_or("\u{274C}", |(_, e)| *e);
    ReactionType::Unicode(emoji.to_string())
}

/// The status an announcement reaction stands for, if any.
pub fn status_for(reaction: &ReactionType) -> Option<Status> {
    match reaction {
        ReactionType::Unicode(emoji) => STATUS_EMOJIS
            .iter()
            .find(|(_, e)| *e == emoji.as_str())
            .map(|(s, _)| *s),
        _ => None,
    }
}

pub struct DiscordPlatform {
    http: Arc<Http>,
    cache: Arc<Cache>,
    guild_id: Option<GuildId>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>, guild_id: Option<GuildId>) -> Self {
        Self {
            http,
            cache,
            guild_id,
        }
    }

    pub fn http(&self) -> &Http {
        &self.http
    }

    /// Lookups that should hit the gateway cache before REST.
    fn cache_http(&self) -> (&Arc<Cache>, &Http) {
        (&self.cache, &self.http)
    }
}

#[async_trait]
impl Platform for DiscordPlatform {
    async fn post_announcement(
        &self,
        channel: u64,
        announcement: &Announcement,
    ) -> Result<u64, Error> {
        let message = ChannelId::new(channel)
            .send_message(
                self.http(),
                CreateMessage::new().embed(embeds::announcement_embed(announcement)),
            )
            .await?;

        for (status, _) in STATUS_EMOJIS {
            message.react(self.http(), emoji_for(status)).await?;
        }
        Ok(message.id.get())
    }

    async fn update_announcement(
        &self,
        channel: u64,
        message: u64,
        announcement: &Announcement,
    ) -> Result<(), Error> {
        ChannelId::new(channel)
            .edit_message(
                self.http(),
                MessageId::new(message),
                EditMessage::new().embed(embeds::announcement_embed(announcement)),
            )
            .await?;
        Ok(())
    }

    async fn retire_announcement(&self, channel: u64, message: u64, note: &str) -> Result<(), Error> {
        let channel = ChannelId::new(channel);
        let message = MessageId::new(message);

        channel.delete_reactions(self.http(), message).await?;
        channel
            .edit_message(self.http(), message, EditMessage::new().content(note))
            .await?;
        Ok(())
    }

    async fn display_name(&self, user: UserId) -> Option<String> {
        let user = DiscordUserId::new(user);
        match self.guild_id {
            Some(guild) => match guild.member(self.cache_http(), user).await {
                Ok(member) => Some(member.display_name().to_string()),
                Err(e) => {
                    debug!(user = %user, error = %e, "User is not a guild member");
                    None
                }
            },
            None => match user.to_user(self.cache_http()).await {
                Ok(u) => Some(u.global_name.unwrap_or(u.name)),
                Err(e) => {
                    warn!(user = %user, error = %e, "Failed to look up user");
                    None
                }
            },
        }
    }

    async fn send_direct(&self, user: UserId, content: &str) -> Result<(), Error> {
        DiscordUserId::new(user)
            .direct_message(self.http(), CreateMessage::new().content(content))
            .await?;
        Ok(())
    }

    async fn send_file(
        &self,
        user: UserId,
        content: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<(), Error> {
        let message = CreateMessage::new()
            .content(content)
            .add_file(CreateAttachment::bytes(data, filename));
        DiscordUserId::new(user)
            .direct_message(self.http(), message)
            .await?;
        Ok(())
    }
}
