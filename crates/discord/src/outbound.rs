//! [`ChatTransport`] over serenity's HTTP client.

use std::sync::Arc;

use {
    async_trait::async_trait,
    serenity::{
        all::{CreateAttachment, CreateMessage, EditMessage},
        http::Http,
    },
    tracing::debug,
};

use {
    aula_channels::{ChatTransport, DirectoryState, Embed, Error, Result},
    aula_common::{ChannelId, MessageRef, UserId},
};

use crate::convert::{self, build_embed, truncate};

/// Outbound message sender for Discord.
pub struct DiscordTransport {
    http: Arc<Http>,
    directory: Arc<DirectoryState>,
}

impl DiscordTransport {
    pub fn new(http: Arc<Http>, directory: Arc<DirectoryState>) -> Self {
        Self { http, directory }
    }

    async fn post(&self, channel: &ChannelId, builder: CreateMessage) -> Result<MessageRef> {
        let target = convert::channel_id(channel)?;
        let sent = target
            .send_message(&*self.http, builder)
            .await
            .map_err(|e| Error::external(format!("send to {channel}"), e))?;
        debug!(channel_id = %channel, message_id = %sent.id, "discord message sent");
        Ok(convert::message_ref(sent.channel_id, sent.id))
    }
}

#[async_trait]
impl ChatTransport for DiscordTransport {
    async fn send_message(&self, channel: &ChannelId, text: &str) -> Result<MessageRef> {
        if text.trim().is_empty() {
            return Err(Error::invalid_input("empty message"));
        }
        self.post(channel, CreateMessage::new().content(truncate(text)))
            .await
    }

    async fn send_embed(&self, channel: &ChannelId, embed: &Embed) -> Result<MessageRef> {
        self.post(channel, CreateMessage::new().embed(build_embed(embed)))
            .await
    }

    async fn send_file(
        &self,
        channel: &ChannelId,
        text: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<MessageRef> {
        let builder = CreateMessage::new()
            .content(truncate(text))
            .add_file(CreateAttachment::bytes(bytes, file_name));
        self.post(channel, builder).await
    }

    async fn add_reaction(&self, message: &MessageRef, emoji: &str) -> Result<()> {
        let channel = convert::channel_id(&message.channel_id)?;
        let message_id = convert::message_id(&message.message_id)?;
        self.http
            .create_reaction(channel, message_id, &convert::reaction_type(emoji))
            .await
            .map_err(|e| Error::external(format!("react {emoji} on {}", message.message_id), e))
    }

    async fn edit_message(&self, message: &MessageRef, text: &str) -> Result<()> {
        let channel = convert::channel_id(&message.channel_id)?;
        let message_id = convert::message_id(&message.message_id)?;
        channel
            .edit_message(
                &*self.http,
                message_id,
                EditMessage::new().content(truncate(text)),
            )
            .await
            .map_err(|e| Error::external(format!("edit {}", message.message_id), e))?;
        Ok(())
    }

    async fn delete_message(&self, message: &MessageRef) -> Result<()> {
        let channel = convert::channel_id(&message.channel_id)?;
        let message_id = convert::message_id(&message.message_id)?;
        channel
            .delete_message(&*self.http, message_id)
            .await
            .map_err(|e| Error::external(format!("delete {}", message.message_id), e))
    }

    async fn dm_channel(&self, user: &UserId) -> Result<ChannelId> {
        if let Some(channel) = self.directory.cached_dm_channel(user) {
            return Ok(channel);
        }
        let private = convert::user_id(user)?
            .create_dm_channel(&*self.http)
            .await
            .map_err(|e| Error::external(format!("open dm with {user}"), e))?;
        let channel = ChannelId::from(private.id.get());
        self.directory.cache_dm_channel(user.clone(), channel.clone());
        Ok(channel)
    }
}
