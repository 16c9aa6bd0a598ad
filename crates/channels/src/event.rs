//! Inbound events as delivered by a chat adapter.
//!
//! Adapters drop events authored by the bot itself before they get here.

use {
    aula_common::{MessageRef, UserId},
    serde::{Deserialize, Serialize},
};

use crate::directory::{Device, OnlineStatus};

/// A file attached to an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub message: MessageRef,
    pub author: UserId,
    pub text: String,
    /// Sent in a direct-message channel.
    pub is_private: bool,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// A reaction added to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub emoji: String,
    pub actor: UserId,
    pub message: MessageRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    pub user: UserId,
    pub status: OnlineStatus,
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundEvent {
    Message(InboundMessage),
    Reaction(ReactionEvent),
    Presence(PresenceUpdate),
}

impl InboundEvent {
    /// The user that produced the event.
    pub fn actor(&self) -> &UserId {
        match self {
            Self::Message(m) => &m.author,
            Self::Reaction(r) => &r.actor,
            Self::Presence(p) => &p.user,
        }
    }
}
