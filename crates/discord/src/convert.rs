//! Conversions between serenity models and the transport-neutral types.

use {
    aula_channels::{Device, Embed, Error, OnlineStatus, PresenceUpdate, Result},
    aula_common::{ChannelId, MessageId, MessageRef, UserId},
    serenity::{
        all::{
            ClientStatus, CreateEmbed, CreateEmbedFooter, OnlineStatus as DiscordStatus,
            ReactionType,
        },
        model::id,
    },
};

/// Discord's maximum message content length in characters.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Cut `text` to the message length limit on a char boundary.
pub fn truncate(text: &str) -> &str {
    match text.char_indices().nth(MAX_MESSAGE_LEN) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

fn snowflake(raw: u64, what: &str) -> Result<u64> {
    if raw == 0 {
        return Err(Error::invalid_input(format!("{what} id cannot be zero")));
    }
    Ok(raw)
}

pub fn channel_id(channel: &ChannelId) -> Result<id::ChannelId> {
    Ok(id::ChannelId::new(snowflake(channel.as_u64()?, "channel")?))
}

pub fn message_id(message: &MessageId) -> Result<id::MessageId> {
    Ok(id::MessageId::new(snowflake(message.as_u64()?, "message")?))
}

pub fn user_id(user: &UserId) -> Result<id::UserId> {
    Ok(id::UserId::new(snowflake(user.as_u64()?, "user")?))
}

pub fn message_ref(channel: id::ChannelId, message: id::MessageId) -> MessageRef {
    MessageRef::new(
        ChannelId::from(channel.get()),
        MessageId::from(message.get()),
    )
}

/// Reaction emoji as text: the unicode itself, or `<:name:id>` for custom
/// emoji.
pub fn reaction_emoji(reaction: &ReactionType) -> Option<String> {
    match reaction {
        ReactionType::Unicode(emoji) => Some(emoji.clone()),
        ReactionType::Custom { animated, id, name } => {
            let name = name.as_deref().unwrap_or("_");
            let prefix = if *animated { "a" } else { "" };
            Some(format!("<{prefix}:{name}:{id}>"))
        },
        _ => None,
    }
}

/// Inverse of [`reaction_emoji`]. Anything that is not a custom emoji
/// literal is sent as unicode.
pub fn reaction_type(emoji: &str) -> ReactionType {
    let custom = emoji
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))
        .and_then(|inner| {
            let (animated, inner) = match inner.strip_prefix("a:") {
                Some(rest) => (true, rest),
                None => (false, inner.strip_prefix(':')?),
            };
            let (name, raw_id) = inner.rsplit_once(':')?;
            let raw_id: u64 = raw_id.parse().ok().filter(|v| *v != 0)?;
            Some(ReactionType::Custom {
                animated,
                id: id::EmojiId::new(raw_id),
                name: Some(name.to_string()),
            })
        });
    custom.unwrap_or_else(|| ReactionType::Unicode(emoji.to_string()))
}

pub fn online_status(status: DiscordStatus) -> OnlineStatus {
    match status {
        DiscordStatus::Online => OnlineStatus::Online,
        DiscordStatus::Idle => OnlineStatus::Idle,
        DiscordStatus::DoNotDisturb => OnlineStatus::DoNotDisturb,
        _ => OnlineStatus::Offline,
    }
}

/// Device classes with a live session.
pub fn devices(client_status: Option<&ClientStatus>) -> Vec<Device> {
    let Some(status) = client_status else {
        return Vec::new();
    };
    live_devices([
        (Device::Desktop, status.desktop),
        (Device::Mobile, status.mobile),
        (Device::Web, status.web),
    ])
}

fn live_devices(sessions: [(Device, Option<DiscordStatus>); 3]) -> Vec<Device> {
    sessions
        .into_iter()
        .filter(|(_, status)| status.is_some_and(|s| online_status(s) != OnlineStatus::Offline))
        .map(|(device, _)| device)
        .collect()
}

pub fn presence_update(presence: &serenity::all::Presence) -> PresenceUpdate {
    PresenceUpdate {
        user: UserId::from(presence.user.id.get()),
        status: online_status(presence.status),
        devices: devices(presence.client_status.as_ref()),
    }
}

pub fn build_embed(embed: &Embed) -> CreateEmbed {
    let mut builder = CreateEmbed::new().title(&embed.title);
    if let Some(description) = &embed.description {
        builder = builder.description(description);
    }
    if let Some(url) = &embed.url {
        builder = builder.url(url);
    }
    if let Some(color) = embed.color {
        builder = builder.color(color);
    }
    for field in &embed.fields {
        builder = builder.field(&field.name, &field.value, field.inline);
    }
    if let Some(footer) = &embed.footer {
        builder = builder.footer(CreateEmbedFooter::new(footer));
    }
    builder
}
