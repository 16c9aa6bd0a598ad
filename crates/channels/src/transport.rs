use {
    async_trait::async_trait,
    aula_common::{ChannelId, MessageRef, UserId},
    serde::{Deserialize, Serialize},
};

use crate::Result;

/// One name/value row of an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// Rich message card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub color: Option<u32>,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
}

impl Embed {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    #[must_use]
    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }
}

/// Outbound capability of a chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, channel: &ChannelId, text: &str) -> Result<MessageRef>;

    async fn send_embed(&self, channel: &ChannelId, embed: &Embed) -> Result<MessageRef>;

    /// Upload `bytes` as `file_name` with `text` as the message body.
    async fn send_file(
        &self,
        channel: &ChannelId,
        text: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<MessageRef>;

    async fn add_reaction(&self, message: &MessageRef, emoji: &str) -> Result<()>;

    async fn edit_message(&self, message: &MessageRef, text: &str) -> Result<()>;

    async fn delete_message(&self, message: &MessageRef) -> Result<()>;

    /// Private channel with `user`, opening it if needed.
    async fn dm_channel(&self, user: &UserId) -> Result<ChannelId>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_builder_keeps_field_order() {
        let embed = Embed::new("Actividad")
            .description("Tarea 1")
            .field("Alumno", "Ana", true)
            .field("Entrega", "https://example.com", false);
        assert_eq!(embed.title, "Actividad");
        assert_eq!(embed.fields[0].name, "Alumno");
        assert!(embed.fields[0].inline);
        assert_eq!(embed.fields[1].value, "https://example.com");
    }
}
