//! Discord event handler for serenity.
//!
//! Translates gateway events into [`InboundEvent`]s and keeps the member
//! directory current. Events produced by the bot itself are dropped here.

use std::sync::{Arc, OnceLock};

use {
    serenity::{
        all::{
            Context, EventHandler, GatewayIntents, Guild, GuildId, Message, Presence, Reaction,
            Ready,
        },
        async_trait,
    },
    tokio::sync::mpsc,
    tracing::{debug, info, warn},
};

use {
    aula_channels::{Attachment, DirectoryState, InboundEvent, InboundMessage, ReactionEvent},
    aula_common::{ChannelId, UserId},
};

use crate::convert;

/// Handler for Discord gateway events.
pub struct DiscordHandler {
    pub directory: Arc<DirectoryState>,
    pub events: mpsc::Sender<InboundEvent>,
    /// Only this guild's presences are tracked when set.
    pub guild_id: Option<GuildId>,
    bot_user_id: OnceLock<u64>,
}

impl DiscordHandler {
    pub fn new(
        directory: Arc<DirectoryState>,
        events: mpsc::Sender<InboundEvent>,
        guild_id: Option<GuildId>,
    ) -> Self {
        Self {
            directory,
            events,
            guild_id,
            bot_user_id: OnceLock::new(),
        }
    }

    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
            | GatewayIntents::GUILD_MESSAGE_REACTIONS
            | GatewayIntents::DIRECT_MESSAGE_REACTIONS
            | GatewayIntents::GUILD_MEMBERS
            | GatewayIntents::GUILD_PRESENCES
    }

    fn is_bot(&self, user: u64) -> bool {
        self.bot_user_id.get().is_some_and(|id| *id == user)
    }

    fn tracks(&self, guild: Option<GuildId>) -> bool {
        match (self.guild_id, guild) {
            (Some(wanted), Some(got)) => wanted == got,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }

    async fn forward(&self, event: InboundEvent) {
        if self.events.send(event).await.is_err() {
            warn!("event loop is gone, dropping discord event");
        }
    }
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        let _ = self.bot_user_id.set(ready.user.id.get());
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord bot ready"
        );
    }

    async fn guild_create(&self, _ctx: Context, guild: Guild, _is_new: Option<bool>) {
        if !self.tracks(Some(guild.id)) {
            return;
        }
        for (id, member) in &guild.members {
            self.directory
                .set_display_name(UserId::from(id.get()), member.display_name());
        }
        for presence in guild.presences.values() {
            self.directory
                .apply_presence(&convert::presence_update(presence));
        }
        info!(
            guild_id = %guild.id,
            members = guild.members.len(),
            presences = guild.presences.len(),
            "guild directory loaded"
        );
    }

    async fn presence_update(&self, _ctx: Context, presence: Presence) {
        if !self.tracks(presence.guild_id) || self.is_bot(presence.user.id.get()) {
            return;
        }
        let update = convert::presence_update(&presence);
        debug!(user = %update.user, status = ?update.status, devices = ?update.devices, "presence update");
        self.directory.apply_presence(&update);
        self.forward(InboundEvent::Presence(update)).await;
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        // Skip bot messages to prevent loops
        if msg.author.bot || self.is_bot(msg.author.id.get()) {
            return;
        }

        let author = UserId::from(msg.author.id.get());
        let is_private = msg.guild_id.is_none();
        if is_private {
            self.directory
                .cache_dm_channel(author.clone(), ChannelId::from(msg.channel_id.get()));
        } else if let Some(member) = &msg.member
            && let Some(nick) = &member.nick
        {
            self.directory.set_display_name(author.clone(), nick.clone());
        }

        let attachments = msg
            .attachments
            .iter()
            .map(|a| Attachment {
                file_name: a.filename.clone(),
                url: a.url.clone(),
            })
            .collect();
        self.forward(InboundEvent::Message(InboundMessage {
            message: convert::message_ref(msg.channel_id, msg.id),
            author,
            text: msg.content,
            is_private,
            attachments,
        }))
        .await;
    }

    async fn reaction_add(&self, _ctx: Context, reaction: Reaction) {
        let Some(actor) = reaction.user_id else {
            return;
        };
        if self.is_bot(actor.get()) {
            return;
        }
        let Some(emoji) = convert::reaction_emoji(&reaction.emoji) else {
            debug!(message_id = %reaction.message_id, "ignoring unsupported reaction");
            return;
        };
        self.forward(InboundEvent::Reaction(ReactionEvent {
            emoji,
            actor: UserId::from(actor.get()),
            message: convert::message_ref(reaction.channel_id, reaction.message_id),
        }))
        .await;
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn handler(guild: Option<u64>) -> DiscordHandler {
        let (tx, _rx) = mpsc::channel(1);
        DiscordHandler::new(
            Arc::new(DirectoryState::new()),
            tx,
            guild.map(GuildId::new),
        )
    }

    #[test]
    fn guild_filter() {
        let any = handler(None);
        assert!(any.tracks(None));
        assert!(any.tracks(Some(GuildId::new(7))));

        let one = handler(Some(7));
        assert!(one.tracks(Some(GuildId::new(7))));
        assert!(!one.tracks(Some(GuildId::new(8))));
        assert!(!one.tracks(None));
    }

    #[test]
    fn own_events_are_recognised_after_ready() {
        let h = handler(None);
        assert!(!h.is_bot(42));
        h.bot_user_id.set(42).unwrap();
        assert!(h.is_bot(42));
        assert!(!h.is_bot(43));
    }
}
