//! Recording transport for tests and offline simulation.

use std::{
    collections::HashSet,
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use {
    async_trait::async_trait,
    aula_common::{ChannelId, MessageId, MessageRef, UserId},
    tokio::sync::watch,
    tracing::debug,
};

use crate::{
    Error, Result,
    transport::{ChatTransport, Embed},
};

/// Every outbound call the transport has seen, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundCall {
    Message {
        message: MessageRef,
        text: String,
    },
    Embed {
        message: MessageRef,
        embed: Embed,
    },
    File {
        message: MessageRef,
        text: String,
        file_name: String,
        bytes: Vec<u8>,
    },
    Reaction {
        message: MessageRef,
        emoji: String,
    },
    Edit {
        message: MessageRef,
        text: String,
    },
    Delete {
        message: MessageRef,
    },
}

impl OutboundCall {
    /// Channel the call was addressed to.
    pub fn channel(&self) -> &ChannelId {
        match self {
            Self::Message { message, .. }
            | Self::Embed { message, .. }
            | Self::File { message, .. }
            | Self::Reaction { message, .. }
            | Self::Edit { message, .. }
            | Self::Delete { message } => &message.channel_id,
        }
    }

    /// Text body for messages, files, and edits.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Message { text, .. } | Self::File { text, .. } | Self::Edit { text, .. } => {
                Some(text)
            },
            _ => None,
        }
    }
}

/// In-process [`ChatTransport`] that allocates sequential message ids and
/// records every call.
pub struct InMemoryTransport {
    next_id: AtomicU64,
    calls: Mutex<Vec<OutboundCall>>,
    failing: Mutex<HashSet<&'static str>>,
    changed: watch::Sender<usize>,
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTransport {
    pub fn new() -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            next_id: AtomicU64::new(1),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            changed,
        }
    }

    /// Private channel id used for `user`.
    pub fn dm_channel_id(user: &UserId) -> ChannelId {
        ChannelId::new(format!("dm-{user}"))
    }

    /// Make every subsequent call of `operation` fail
    /// (`"send_message"`, `"add_reaction"`, `"edit_message"`, ...).
    pub fn fail(&self, operation: &'static str) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(operation);
    }

    pub fn calls(&self) -> Vec<OutboundCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Calls addressed to `channel`.
    pub fn calls_in(&self, channel: &ChannelId) -> Vec<OutboundCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.channel() == channel)
            .collect()
    }

    /// Emojis added to `message`, in order.
    pub fn reactions_on(&self, message: &MessageRef) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                OutboundCall::Reaction { message: m, emoji } if &m == message => Some(emoji),
                _ => None,
            })
            .collect()
    }

    /// Text of every plain message sent to `channel`.
    pub fn texts_in(&self, channel: &ChannelId) -> Vec<String> {
        self.calls_in(channel)
            .into_iter()
            .filter_map(|call| match call {
                OutboundCall::Message { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Wait until a recorded call satisfies `pred` and return it.
    pub async fn wait_for(&self, pred: impl Fn(&OutboundCall) -> bool) -> OutboundCall {
        let mut rx = self.changed.subscribe();
        loop {
            if let Some(call) = self.calls().into_iter().find(|c| pred(c)) {
                return call;
            }
            if rx.changed().await.is_err() {
                // sender is owned by self
                std::future::pending::<()>().await;
            }
        }
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        let failing = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        if failing.contains(operation) {
            debug!(operation, "simulated transport failure");
            return Err(Error::unavailable(format!("{operation} disabled")));
        }
        Ok(())
    }

    fn allocate(&self, channel: &ChannelId) -> MessageRef {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        MessageRef::new(channel.clone(), MessageId::from(id))
    }

    fn record(&self, call: OutboundCall) {
        let len = {
            let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
            calls.push(call);
            calls.len()
        };
        self.changed.send_replace(len);
    }
}

#[async_trait]
impl ChatTransport for InMemoryTransport {
    async fn send_message(&self, channel: &ChannelId, text: &str) -> Result<MessageRef> {
        self.check("send_message")?;
        let message = self.allocate(channel);
        self.record(OutboundCall::Message {
            message: message.clone(),
            text: text.to_string(),
        });
        Ok(message)
    }

    async fn send_embed(&self, channel: &ChannelId, embed: &Embed) -> Result<MessageRef> {
        self.check("send_embed")?;
        let message = self.allocate(channel);
        self.record(OutboundCall::Embed {
            message: message.clone(),
            embed: embed.clone(),
        });
        Ok(message)
    }

    async fn send_file(
        &self,
        channel: &ChannelId,
        text: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<MessageRef> {
        self.check("send_file")?;
        let message = self.allocate(channel);
        self.record(OutboundCall::File {
            message: message.clone(),
            text: text.to_string(),
            file_name: file_name.to_string(),
            bytes,
        });
        Ok(message)
    }

    async fn add_reaction(&self, message: &MessageRef, emoji: &str) -> Result<()> {
        self.check("add_reaction")?;
        self.record(OutboundCall::Reaction {
            message: message.clone(),
            emoji: emoji.to_string(),
        });
        Ok(())
    }

    async fn edit_message(&self, message: &MessageRef, text: &str) -> Result<()> {
        self.check("edit_message")?;
        self.record(OutboundCall::Edit {
            message: message.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn delete_message(&self, message: &MessageRef) -> Result<()> {
        self.check("delete_message")?;
        self.record(OutboundCall::Delete {
            message: message.clone(),
        });
        Ok(())
    }

    async fn dm_channel(&self, user: &UserId) -> Result<ChannelId> {
        self.check("dm_channel")?;
        Ok(Self::dm_channel_id(user))
    }
}
